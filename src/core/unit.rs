/// Syntactic units — generation-time instances bound to properties.

use crate::core::generator::GenerationError;
use crate::core::property::Property;
use crate::core::registry::Registry;
use crate::core::selector::{RandomSource, SelectorError, WeightedSet};
use crate::schema::symbol::{Predecessor, PropertyId, UnitId};

/// The two unit variants.
#[derive(Debug, Clone)]
pub enum UnitKind {
    /// Leaf of the output tree carrying a literal representation.
    Root { text: String },
    /// Composer of child properties.
    Parent(ParentUnit),
}

/// A concrete unit bound to exactly one property.
///
/// The property is referenced by id; many units may share a property.
#[derive(Debug, Clone)]
pub struct SyntacticUnit {
    id: UnitId,
    property: PropertyId,
    weight: u32,
    kind: UnitKind,
}

impl SyntacticUnit {
    pub fn root(property: PropertyId, text: impl Into<String>, weight: u32) -> Self {
        Self {
            id: UnitId(0),
            property,
            weight,
            kind: UnitKind::Root { text: text.into() },
        }
    }

    pub fn parent(property: PropertyId, weight: u32) -> Self {
        Self {
            id: UnitId(0),
            property,
            weight,
            kind: UnitKind::Parent(ParentUnit::new(property)),
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: UnitId) {
        self.id = id;
    }

    pub fn property(&self) -> PropertyId {
        self.property
    }

    /// Generation weight among units sharing the same property.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    /// Literal text of a root unit.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            UnitKind::Root { text } => Some(text),
            UnitKind::Parent(_) => None,
        }
    }

    pub fn as_parent(&self) -> Option<&ParentUnit> {
        match &self.kind {
            UnitKind::Parent(parent) => Some(parent),
            UnitKind::Root { .. } => None,
        }
    }

    pub fn as_parent_mut(&mut self) -> Option<&mut ParentUnit> {
        match &mut self.kind {
            UnitKind::Parent(parent) => Some(parent),
            UnitKind::Root { .. } => None,
        }
    }
}

/// Composition data of a parent unit.
#[derive(Debug, Clone)]
pub struct ParentUnit {
    property: PropertyId,
    possible_children: WeightedSet<PropertyId>,
    children_amount: WeightedSet<usize>,
    /// Same candidates keyed by property name; kept in step with `possible_children`.
    children_by_name: WeightedSet<String>,
    duplicates_allowed: bool,
}

impl ParentUnit {
    fn new(property: PropertyId) -> Self {
        Self {
            property,
            possible_children: WeightedSet::new(),
            children_amount: WeightedSet::new(),
            children_by_name: WeightedSet::new(),
            duplicates_allowed: false,
        }
    }

    pub fn possible_children(&self) -> &WeightedSet<PropertyId> {
        &self.possible_children
    }

    pub fn children_by_name(&self) -> &WeightedSet<String> {
        &self.children_by_name
    }

    pub fn children_amount(&self) -> &WeightedSet<usize> {
        &self.children_amount
    }

    pub fn duplicates_allowed(&self) -> bool {
        self.duplicates_allowed
    }

    pub fn set_duplicates_allowed(&mut self, allowed: bool) {
        self.duplicates_allowed = allowed;
    }

    /// Add a candidate child property with `weight`.
    pub fn add_child(&mut self, child: &Property, weight: u32) -> Result<(), SelectorError> {
        if weight == 0 {
            return Err(SelectorError::ZeroWeight);
        }
        // Guard the name index first so both sets stay in step on overflow.
        if let Some(existing) = self.children_by_name.weight_of(&child.name().to_string()) {
            existing
                .checked_add(weight)
                .ok_or(SelectorError::WeightOverflow)?;
        }
        self.possible_children.add(child.id(), weight)?;
        self.children_by_name.add(child.name().to_string(), weight)
    }

    /// Add a possible child count with `weight`.
    pub fn add_children_amount(&mut self, amount: usize, weight: u32) -> Result<(), SelectorError> {
        self.children_amount.add(amount, weight)
    }

    /// Sample how many children one generation of this unit produces.
    pub fn sample_children_amount<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<usize, SelectorError> {
        self.children_amount.draw(rng).copied()
    }

    /// Choose the next child property that can follow `predecessor`.
    ///
    /// Each candidate's eligibility weight is multiplied by its candidate
    /// weight; candidates scoring 0 are dropped. When duplicates are not
    /// allowed, properties in `already_chosen` are dropped too.
    pub fn next_child_given<R: RandomSource + ?Sized>(
        &self,
        registry: &Registry,
        predecessor: &Predecessor,
        already_chosen: &[PropertyId],
        rng: &mut R,
    ) -> Result<PropertyId, GenerationError> {
        self.draw_child(
            registry,
            std::slice::from_ref(predecessor),
            already_chosen,
            |property| property.eligibility_weight(predecessor),
            rng,
        )
    }

    /// Like [`next_child_given`](Self::next_child_given), but a candidate is
    /// scored by its best eligibility over all open `predecessors`.
    pub fn next_child_given_any_of<R: RandomSource + ?Sized>(
        &self,
        registry: &Registry,
        predecessors: &[Predecessor],
        already_chosen: &[PropertyId],
        rng: &mut R,
    ) -> Result<PropertyId, GenerationError> {
        self.draw_child(
            registry,
            predecessors,
            already_chosen,
            |property| property.max_eligibility_weight(predecessors),
            rng,
        )
    }

    /// First mandatory sub-part of this unit's property, in declaration
    /// order, that can follow at least one of `predecessors`.
    pub fn first_mandatory_child_following(
        &self,
        registry: &Registry,
        predecessors: &[Predecessor],
    ) -> Result<Option<PropertyId>, GenerationError> {
        self.first_mandatory_matching(registry, predecessors, |_| true)
    }

    /// Like [`first_mandatory_child_following`](Self::first_mandatory_child_following),
    /// skipping parts already present in `already_chosen`.
    pub fn first_pending_mandatory_following(
        &self,
        registry: &Registry,
        predecessors: &[Predecessor],
        already_chosen: &[PropertyId],
    ) -> Result<Option<PropertyId>, GenerationError> {
        self.first_mandatory_matching(registry, predecessors, |id| {
            !already_chosen.contains(&id)
        })
    }

    /// Mandatory sub-parts not yet present in `already_chosen`.
    pub fn pending_mandatory(
        &self,
        registry: &Registry,
        already_chosen: &[PropertyId],
    ) -> Result<usize, GenerationError> {
        let owner = registry.property(self.property)?;
        Ok(owner
            .must_contain()
            .iter()
            .filter(|id| !already_chosen.contains(*id))
            .count())
    }

    fn first_mandatory_matching<F>(
        &self,
        registry: &Registry,
        predecessors: &[Predecessor],
        mut keep: F,
    ) -> Result<Option<PropertyId>, GenerationError>
    where
        F: FnMut(PropertyId) -> bool,
    {
        let owner = registry.property(self.property)?;
        for &part in owner.must_contain() {
            if !keep(part) {
                continue;
            }
            if registry.property(part)?.can_follow_any_of(predecessors) {
                return Ok(Some(part));
            }
        }
        Ok(None)
    }

    fn draw_child<R, F>(
        &self,
        registry: &Registry,
        predecessors: &[Predecessor],
        already_chosen: &[PropertyId],
        mut eligibility: F,
        rng: &mut R,
    ) -> Result<PropertyId, GenerationError>
    where
        R: RandomSource + ?Sized,
        F: FnMut(&Property) -> u32,
    {
        let mut admissible = WeightedSet::new();
        for (&child, weight) in self.possible_children.iter() {
            if !self.duplicates_allowed && already_chosen.contains(&child) {
                continue;
            }
            let property = registry.property(child)?;
            let effective = eligibility(property).checked_mul(weight).ok_or_else(|| {
                GenerationError::WeightOverflow {
                    parent: registry.property_name(self.property),
                    child: property.name().to_string(),
                }
            })?;
            if effective > 0 {
                admissible.add(child, effective)?;
            }
        }

        if admissible.is_empty() {
            return Err(GenerationError::NoAdmissibleContinuation {
                parent: registry.property_name(self.property),
                after: predecessors
                    .iter()
                    .map(|p| registry.describe(p))
                    .collect::<Vec<_>>()
                    .join(" or "),
            });
        }
        Ok(*admissible.draw(rng)?)
    }
}
