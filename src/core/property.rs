/// Property graph — named grammar categories and their ordering constraints.

use crate::core::selector::{SelectorError, WeightedSet};
use crate::schema::symbol::{Predecessor, PropertyId};

/// The two property variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// Terminal category; bound only by root units carrying literal text.
    Root,
    /// Composite category.
    Parent {
        /// Properties a unit of this category must eventually contain,
        /// in declaration order.
        must_contain: Vec<PropertyId>,
    },
}

/// A named grammar category.
///
/// Both variants carry a predecessor-weight set: any property can be a
/// candidate child of a parent unit, and candidacy is gated on it.
#[derive(Debug, Clone)]
pub struct Property {
    id: PropertyId,
    name: String,
    follows: WeightedSet<Predecessor>,
    kind: PropertyKind,
}

impl Property {
    /// A new root property. Its id is assigned on registration.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            id: PropertyId(0),
            name: name.into(),
            follows: WeightedSet::new(),
            kind: PropertyKind::Root,
        }
    }

    /// A new parent property. Its id is assigned on registration.
    pub fn parent(name: impl Into<String>) -> Self {
        Self {
            id: PropertyId(0),
            name: name.into(),
            follows: WeightedSet::new(),
            kind: PropertyKind::Parent {
                must_contain: Vec::new(),
            },
        }
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: PropertyId) {
        self.id = id;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn is_parent(&self) -> bool {
        matches!(self.kind, PropertyKind::Parent { .. })
    }

    /// The predecessor-weight set.
    pub fn follows(&self) -> &WeightedSet<Predecessor> {
        &self.follows
    }

    /// Record that this property may come after `predecessor` with `weight`.
    pub fn add_predecessor(
        &mut self,
        predecessor: Predecessor,
        weight: u32,
    ) -> Result<(), SelectorError> {
        self.follows.add(predecessor, weight)
    }

    /// Declare a mandatory sub-part. Returns `false` for root properties,
    /// which cannot have sub-parts. Re-declaring an existing part is a no-op.
    pub fn add_mandatory(&mut self, part: PropertyId) -> bool {
        match &mut self.kind {
            PropertyKind::Parent { must_contain } => {
                if !must_contain.contains(&part) {
                    must_contain.push(part);
                }
                true
            }
            PropertyKind::Root => false,
        }
    }

    /// Mandatory sub-parts in declaration order; empty for root properties.
    pub fn must_contain(&self) -> &[PropertyId] {
        match &self.kind {
            PropertyKind::Parent { must_contain } => must_contain,
            PropertyKind::Root => &[],
        }
    }

    /// Weight with which this property may follow `predecessor`.
    ///
    /// An exact entry wins; otherwise the wildcard's weight applies; 0 if neither.
    pub fn eligibility_weight(&self, predecessor: &Predecessor) -> u32 {
        self.follows
            .weight_of(predecessor)
            .or_else(|| self.follows.weight_of(&Predecessor::Any))
            .unwrap_or(0)
    }

    pub fn can_follow(&self, predecessor: &Predecessor) -> bool {
        self.eligibility_weight(predecessor) > 0
    }

    pub fn can_follow_any_of(&self, predecessors: &[Predecessor]) -> bool {
        predecessors.iter().any(|p| self.can_follow(p))
    }

    /// Highest eligibility weight over `predecessors`, 0 when none match.
    pub fn max_eligibility_weight(&self, predecessors: &[Predecessor]) -> u32 {
        predecessors
            .iter()
            .map(|p| self.eligibility_weight(p))
            .max()
            .unwrap_or(0)
    }
}

/// Properties compare by name: two symbols with the same name are the same symbol.
impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Property {}
