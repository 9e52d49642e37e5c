/// Construction facade — creates, wires, and registers properties and units.

use thiserror::Error;
use tracing::debug;

use crate::core::property::Property;
use crate::core::registry::{Registry, RegistryError};
use crate::core::selector::SelectorError;
use crate::core::unit::{ParentUnit, SyntacticUnit};
use crate::schema::symbol::{Predecessor, PropertyId, UnitId};

/// Unit weight used when a grammar does not specify one.
pub const DEFAULT_UNIT_WEIGHT: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("weight error: {0}")]
    Selector(#[from] SelectorError),
    #[error("{name} property not found in registry on {operation}")]
    PropertyNotFound {
        name: String,
        operation: &'static str,
    },
    #[error("property already defined: {0}")]
    DuplicateProperty(String),
    #[error("no property created before using the last-created shorthand")]
    NoLastCreatedProperty,
    #[error("property '{name}' is not a {expected} property")]
    KindMismatch {
        name: String,
        expected: &'static str,
    },
    #[error("{0} is not a parent unit")]
    NotAParentUnit(UnitId),
}

/// A property named directly by id or looked up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyRef<'a> {
    Id(PropertyId),
    Name(&'a str),
}

impl From<PropertyId> for PropertyRef<'_> {
    fn from(id: PropertyId) -> Self {
        PropertyRef::Id(id)
    }
}

impl<'a> From<&'a str> for PropertyRef<'a> {
    fn from(name: &'a str) -> Self {
        PropertyRef::Name(name)
    }
}

impl<'a> From<&'a String> for PropertyRef<'a> {
    fn from(name: &'a String) -> Self {
        PropertyRef::Name(name.as_str())
    }
}

/// A construction session over a registry.
///
/// Tracks the most recently created property so that a run of unit
/// definitions can omit repeating it.
#[derive(Debug, Default)]
pub struct LanguageBuilder {
    registry: Registry,
    last_created: Option<PropertyId>,
}

impl LanguageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue building on top of an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            last_created: None,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn finish(self) -> Registry {
        self.registry
    }

    pub fn create_root_property(&mut self, name: &str) -> Result<PropertyId, BuildError> {
        self.create_property(Property::root(name))
    }

    pub fn create_parent_property(&mut self, name: &str) -> Result<PropertyId, BuildError> {
        self.create_property(Property::parent(name))
    }

    fn create_property(&mut self, property: Property) -> Result<PropertyId, BuildError> {
        if self.registry.contains_property_named(property.name()) {
            return Err(BuildError::DuplicateProperty(property.name().to_string()));
        }
        let id = self.registry.add_property(property);
        debug!(property = %self.registry.property_name(id), "created property");
        self.last_created = Some(id);
        Ok(id)
    }

    pub fn last_created_property(&self) -> Result<PropertyId, BuildError> {
        self.last_created.ok_or(BuildError::NoLastCreatedProperty)
    }

    pub fn create_root_unit<'a>(
        &mut self,
        text: &str,
        property: impl Into<PropertyRef<'a>>,
        weight: u32,
    ) -> Result<UnitId, BuildError> {
        let id = self.resolve(property.into(), "creating root syntactic unit")?;
        self.expect_kind(id, false)?;
        let unit = self.registry.add_unit(SyntacticUnit::root(id, text, weight))?;
        Ok(unit)
    }

    pub fn create_root_unit_with_last(&mut self, text: &str, weight: u32) -> Result<UnitId, BuildError> {
        let id = self.last_created_property()?;
        self.create_root_unit(text, id, weight)
    }

    pub fn create_parent_unit<'a>(
        &mut self,
        property: impl Into<PropertyRef<'a>>,
        weight: u32,
    ) -> Result<UnitId, BuildError> {
        let id = self.resolve(property.into(), "creating parent syntactic unit")?;
        self.expect_kind(id, true)?;
        let unit = self.registry.add_unit(SyntacticUnit::parent(id, weight))?;
        Ok(unit)
    }

    pub fn create_parent_unit_with_last(&mut self, weight: u32) -> Result<UnitId, BuildError> {
        let id = self.last_created_property()?;
        self.create_parent_unit(id, weight)
    }

    /// Allow `property` to follow `predecessor` with `weight`.
    pub fn add_predecessor<'a>(
        &mut self,
        property: impl Into<PropertyRef<'a>>,
        predecessor: Predecessor,
        weight: u32,
    ) -> Result<(), BuildError> {
        let id = self.resolve(property.into(), "adding a predecessor")?;
        if let Predecessor::Property(pred) = predecessor {
            self.registry.property(pred)?;
        }
        self.registry
            .property_mut(id)?
            .add_predecessor(predecessor, weight)?;
        Ok(())
    }

    /// Declare `part` a mandatory sub-part of the parent property `parent`.
    pub fn add_mandatory<'a, 'b>(
        &mut self,
        parent: impl Into<PropertyRef<'a>>,
        part: impl Into<PropertyRef<'b>>,
    ) -> Result<(), BuildError> {
        let parent = self.resolve(parent.into(), "adding a mandatory part")?;
        let part = self.resolve(part.into(), "adding a mandatory part")?;
        self.expect_kind(parent, true)?;
        self.registry.property_mut(parent)?.add_mandatory(part);
        Ok(())
    }

    /// Add a candidate child property to a parent unit.
    pub fn add_child<'a>(
        &mut self,
        unit: UnitId,
        child: impl Into<PropertyRef<'a>>,
        weight: u32,
    ) -> Result<(), BuildError> {
        let child = self.resolve(child.into(), "adding a child")?;
        let child = self.registry.property(child)?.clone();
        self.parent_unit_mut(unit)?.add_child(&child, weight)?;
        Ok(())
    }

    /// Add a possible child count to a parent unit.
    pub fn add_children_amount(
        &mut self,
        unit: UnitId,
        amount: usize,
        weight: u32,
    ) -> Result<(), BuildError> {
        self.parent_unit_mut(unit)?
            .add_children_amount(amount, weight)?;
        Ok(())
    }

    pub fn set_duplicates_allowed(&mut self, unit: UnitId, allowed: bool) -> Result<(), BuildError> {
        self.parent_unit_mut(unit)?.set_duplicates_allowed(allowed);
        Ok(())
    }

    fn parent_unit_mut(
        &mut self,
        unit: UnitId,
    ) -> Result<&mut ParentUnit, BuildError> {
        self.registry
            .unit_mut(unit)?
            .as_parent_mut()
            .ok_or(BuildError::NotAParentUnit(unit))
    }

    fn resolve(&self, property: PropertyRef<'_>, operation: &'static str) -> Result<PropertyId, BuildError> {
        match property {
            PropertyRef::Id(id) => Ok(self.registry.property(id)?.id()),
            PropertyRef::Name(name) => match self.registry.get_property_by_name(name) {
                Ok(property) => Ok(property.id()),
                Err(RegistryError::PropertyNotFound(_)) => Err(BuildError::PropertyNotFound {
                    name: name.to_string(),
                    operation,
                }),
                Err(e) => Err(e.into()),
            },
        }
    }

    fn expect_kind(&self, id: PropertyId, parent: bool) -> Result<(), BuildError> {
        let property = self.registry.property(id)?;
        if property.is_parent() == parent {
            return Ok(());
        }
        Err(BuildError::KindMismatch {
            name: property.name().to_string(),
            expected: if parent { "parent" } else { "root" },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_property_names_rejected() {
        let mut b = LanguageBuilder::new();
        b.create_root_property("Vowel").unwrap();
        assert_eq!(
            b.create_parent_property("Vowel"),
            Err(BuildError::DuplicateProperty("Vowel".to_string()))
        );
        assert_eq!(b.registry().properties().len(), 1);
    }

    #[test]
    fn last_created_shorthand() {
        let mut b = LanguageBuilder::new();
        assert_eq!(
            b.create_root_unit_with_last("a", DEFAULT_UNIT_WEIGHT),
            Err(BuildError::NoLastCreatedProperty)
        );
        let vowel = b.create_root_property("Vowel").unwrap();
        let a = b.create_root_unit_with_last("a", DEFAULT_UNIT_WEIGHT).unwrap();
        let e = b.create_root_unit_with_last("e", 50).unwrap();
        let reg = b.finish();
        assert_eq!(reg.unit(a).unwrap().property(), vowel);
        assert_eq!(reg.unit(e).unwrap().weight(), 50);
        assert_eq!(reg.units_of(vowel).unwrap().len(), 2);
    }

    #[test]
    fn unknown_property_name_is_not_found() {
        let mut b = LanguageBuilder::new();
        let err = b.create_root_unit("a", "Nonexistent", 1).unwrap_err();
        assert_eq!(
            err,
            BuildError::PropertyNotFound {
                name: "Nonexistent".to_string(),
                operation: "creating root syntactic unit",
            }
        );
        assert!(err.to_string().starts_with("Nonexistent property not found"));
    }

    #[test]
    fn units_must_match_property_kind() {
        let mut b = LanguageBuilder::new();
        b.create_root_property("Vowel").unwrap();
        b.create_parent_property("Syllable").unwrap();
        assert!(matches!(
            b.create_root_unit("a", "Syllable", 1),
            Err(BuildError::KindMismatch { expected: "root", .. })
        ));
        assert!(matches!(
            b.create_parent_unit("Vowel", 1),
            Err(BuildError::KindMismatch { expected: "parent", .. })
        ));
        assert!(matches!(
            b.add_mandatory("Vowel", "Syllable"),
            Err(BuildError::KindMismatch { .. })
        ));
    }

    #[test]
    fn wiring_a_parent_unit() {
        let mut b = LanguageBuilder::new();
        let consonant = b.create_root_property("Consonant").unwrap();
        b.create_root_property("Vowel").unwrap();
        b.create_parent_property("Syllable").unwrap();
        b.add_predecessor("Vowel", Predecessor::Property(consonant), 2)
            .unwrap();
        b.add_mandatory("Syllable", "Vowel").unwrap();
        let unit = b.create_parent_unit_with_last(DEFAULT_UNIT_WEIGHT).unwrap();
        b.add_child(unit, "Consonant", 2).unwrap();
        b.add_child(unit, "Vowel", 1).unwrap();
        b.add_children_amount(unit, 2, 1).unwrap();
        b.set_duplicates_allowed(unit, true).unwrap();

        let reg = b.finish();
        let parent = reg.unit(unit).unwrap().as_parent().unwrap();
        assert_eq!(parent.possible_children().len(), 2);
        assert_eq!(parent.children_by_name().weight_of(&"Vowel".to_string()), Some(1));
        assert_eq!(parent.children_amount().weight_of(&2), Some(1));
        assert!(parent.duplicates_allowed());
        let vowel = reg.get_property_by_name("Vowel").unwrap();
        assert_eq!(vowel.eligibility_weight(&consonant.into()), 2);
        let syllable = reg.get_property_by_name("Syllable").unwrap();
        assert_eq!(syllable.must_contain(), &[vowel.id()]);
    }

    #[test]
    fn children_only_on_parent_units() {
        let mut b = LanguageBuilder::new();
        b.create_root_property("Vowel").unwrap();
        let a = b.create_root_unit("a", "Vowel", 1).unwrap();
        assert_eq!(
            b.add_child(a, "Vowel", 1),
            Err(BuildError::NotAParentUnit(a))
        );
        assert_eq!(
            b.add_children_amount(a, 1, 0),
            Err(BuildError::NotAParentUnit(a))
        );
    }
}
