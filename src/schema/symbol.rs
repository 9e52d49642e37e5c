use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for property IDs. Indexes into the registry's property table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId(pub usize);

/// Newtype wrapper for syntactic unit IDs. Indexes into the registry's unit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub usize);

/// What a property may come after in a generated child sequence.
///
/// Predecessor-weight sets are keyed by this marker. `Any` is the wildcard
/// and matches every predecessor, including `Start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predecessor {
    /// Wildcard: matches any predecessor.
    Any,
    /// The beginning of a parent unit's child sequence.
    Start,
    /// A concrete property.
    Property(PropertyId),
}

impl From<PropertyId> for Predecessor {
    fn from(id: PropertyId) -> Self {
        Predecessor::Property(id)
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "property#{}", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}
