/// Registry — append-only, name-addressable storage for properties and units.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::property::Property;
use crate::core::selector::{SelectorError, WeightedSet};
use crate::core::unit::SyntacticUnit;
use crate::schema::symbol::{Predecessor, PropertyId, UnitId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("property not found: {0}")]
    PropertyNotFound(String),
    #[error("ambiguous property name '{name}': {count} matches")]
    AmbiguousProperty { name: String, count: usize },
    #[error("unit not found: {0}")]
    UnitNotFound(String),
    #[error("ambiguous unit name '{name}': {count} matches")]
    AmbiguousUnit { name: String, count: usize },
    #[error("unknown property id: {0}")]
    UnknownProperty(PropertyId),
    #[error("unknown unit id: {0}")]
    UnknownUnit(UnitId),
    #[error("invalid unit weight: {0}")]
    UnitWeight(#[from] SelectorError),
}

/// Two independent append-only collections, plus the index from each
/// property to the units built against it.
///
/// Names are not required to be unique here; name lookups fail with a
/// distinct error when a name matches nothing or more than one entry.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    properties: Vec<Property>,
    units: Vec<SyntacticUnit>,
    /// Back-references: property → its units, weighted by unit weight.
    units_by_property: FxHashMap<PropertyId, WeightedSet<UnitId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a property. The registry assigns its id.
    pub fn add_property(&mut self, mut property: Property) -> PropertyId {
        let id = PropertyId(self.properties.len());
        property.assign_id(id);
        self.properties.push(property);
        id
    }

    /// Register a unit. The registry assigns its id and indexes it under its property.
    pub fn add_unit(&mut self, mut unit: SyntacticUnit) -> Result<UnitId, RegistryError> {
        self.property(unit.property())?;
        if unit.weight() == 0 {
            return Err(SelectorError::ZeroWeight.into());
        }
        let id = UnitId(self.units.len());
        self.units_by_property
            .entry(unit.property())
            .or_default()
            .add(id, unit.weight())?;
        unit.assign_id(id);
        self.units.push(unit);
        Ok(id)
    }

    pub fn property(&self, id: PropertyId) -> Result<&Property, RegistryError> {
        self.properties
            .get(id.0)
            .ok_or(RegistryError::UnknownProperty(id))
    }

    pub fn property_mut(&mut self, id: PropertyId) -> Result<&mut Property, RegistryError> {
        self.properties
            .get_mut(id.0)
            .ok_or(RegistryError::UnknownProperty(id))
    }

    pub fn unit(&self, id: UnitId) -> Result<&SyntacticUnit, RegistryError> {
        self.units.get(id.0).ok_or(RegistryError::UnknownUnit(id))
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Result<&mut SyntacticUnit, RegistryError> {
        self.units.get_mut(id.0).ok_or(RegistryError::UnknownUnit(id))
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn units(&self) -> &[SyntacticUnit] {
        &self.units
    }

    /// The single property named `name`.
    pub fn get_property_by_name(&self, name: &str) -> Result<&Property, RegistryError> {
        let mut matches = self.properties.iter().filter(|p| p.name() == name);
        match (matches.next(), matches.count()) {
            (None, _) => Err(RegistryError::PropertyNotFound(name.to_string())),
            (Some(property), 0) => Ok(property),
            (Some(_), rest) => Err(RegistryError::AmbiguousProperty {
                name: name.to_string(),
                count: rest + 1,
            }),
        }
    }

    /// The single unit named `name`.
    ///
    /// A root unit is named by its text, a parent unit by its property's name.
    pub fn get_unit_by_name(&self, name: &str) -> Result<&SyntacticUnit, RegistryError> {
        let mut matches = self
            .units
            .iter()
            .filter(|u| self.unit_name(u).as_deref() == Some(name));
        match (matches.next(), matches.count()) {
            (None, _) => Err(RegistryError::UnitNotFound(name.to_string())),
            (Some(unit), 0) => Ok(unit),
            (Some(_), rest) => Err(RegistryError::AmbiguousUnit {
                name: name.to_string(),
                count: rest + 1,
            }),
        }
    }

    pub fn contains_property_named(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.name() == name)
    }

    /// Units built against `property`, weighted by unit weight.
    pub fn units_of(&self, property: PropertyId) -> Option<&WeightedSet<UnitId>> {
        self.units_by_property.get(&property)
    }

    /// Parent units built against `property`.
    pub fn parent_units_of(&self, property: PropertyId) -> impl Iterator<Item = &SyntacticUnit> {
        self.units_by_property
            .get(&property)
            .into_iter()
            .flat_map(|index| index.items())
            .filter_map(|id| self.units.get(id.0))
            .filter(|unit| unit.as_parent().is_some())
    }

    /// Name of a property, or its id when it is not registered.
    pub fn property_name(&self, id: PropertyId) -> String {
        self.properties
            .get(id.0)
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    /// Human-readable form of a predecessor marker.
    pub fn describe(&self, predecessor: &Predecessor) -> String {
        match predecessor {
            Predecessor::Any => "any".to_string(),
            Predecessor::Start => "start".to_string(),
            Predecessor::Property(id) => self.property_name(*id),
        }
    }

    fn unit_name(&self, unit: &SyntacticUnit) -> Option<String> {
        match unit.text() {
            Some(text) => Some(text.to_string()),
            None => self.properties.get(unit.property().0).map(|p| p.name().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        let mut reg = Registry::new();
        let vowel = reg.add_property(Property::root("Vowel"));
        let syllable = reg.add_property(Property::parent("Syllable"));
        reg.add_unit(SyntacticUnit::root(vowel, "a", 3)).unwrap();
        reg.add_unit(SyntacticUnit::root(vowel, "e", 1)).unwrap();
        reg.add_unit(SyntacticUnit::parent(syllable, 1)).unwrap();
        reg
    }

    #[test]
    fn ids_follow_insertion_order() {
        let reg = registry();
        assert_eq!(reg.get_property_by_name("Vowel").unwrap().id(), PropertyId(0));
        assert_eq!(reg.get_property_by_name("Syllable").unwrap().id(), PropertyId(1));
        assert_eq!(reg.get_unit_by_name("e").unwrap().id(), UnitId(1));
    }

    #[test]
    fn missing_property_is_not_found() {
        let reg = registry();
        assert_eq!(
            reg.get_property_by_name("Nonexistent").unwrap_err(),
            RegistryError::PropertyNotFound("Nonexistent".to_string())
        );
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let mut reg = registry();
        reg.add_property(Property::root("Vowel"));
        assert_eq!(
            reg.get_property_by_name("Vowel").unwrap_err(),
            RegistryError::AmbiguousProperty {
                name: "Vowel".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn units_named_by_text_or_property() {
        let mut reg = registry();
        assert!(reg.get_unit_by_name("Syllable").unwrap().as_parent().is_some());
        assert!(matches!(
            reg.get_unit_by_name("zz"),
            Err(RegistryError::UnitNotFound(_))
        ));
        reg.add_unit(SyntacticUnit::root(PropertyId(0), "a", 1)).unwrap();
        assert!(matches!(
            reg.get_unit_by_name("a"),
            Err(RegistryError::AmbiguousUnit { count: 2, .. })
        ));
    }

    #[test]
    fn back_reference_index_tracks_units() {
        let reg = registry();
        let vowels = reg.units_of(PropertyId(0)).unwrap();
        assert_eq!(vowels.len(), 2);
        assert_eq!(vowels.total_weight(), 4);
        assert_eq!(reg.parent_units_of(PropertyId(1)).count(), 1);
        assert_eq!(reg.parent_units_of(PropertyId(0)).count(), 0);
    }

    #[test]
    fn unit_for_unknown_property_rejected() {
        let mut reg = registry();
        assert_eq!(
            reg.add_unit(SyntacticUnit::root(PropertyId(99), "x", 1)),
            Err(RegistryError::UnknownProperty(PropertyId(99)))
        );
        assert_eq!(reg.units().len(), 3);
    }

    #[test]
    fn zero_weight_unit_rejected() {
        let mut reg = registry();
        assert_eq!(
            reg.add_unit(SyntacticUnit::root(PropertyId(0), "i", 0)),
            Err(RegistryError::UnitWeight(SelectorError::ZeroWeight))
        );
        assert_eq!(reg.units().len(), 3);
    }

    #[test]
    fn describe_predecessors() {
        let reg = registry();
        assert_eq!(reg.describe(&Predecessor::Any), "any");
        assert_eq!(reg.describe(&Predecessor::Start), "start");
        assert_eq!(reg.describe(&PropertyId(1).into()), "Syllable");
    }
}
