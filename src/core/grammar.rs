/// Grammar definitions — RON loading, registry construction, and linting.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::builder::{BuildError, LanguageBuilder, DEFAULT_UNIT_WEIGHT};
use crate::core::registry::Registry;
use crate::schema::symbol::{Predecessor, PropertyId};

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("build error: {0}")]
    Build(#[from] BuildError),
    #[error("property '{property}' references undefined property '{name}'")]
    UnknownReference { property: String, name: String },
}

/// A predecessor as written in a grammar file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredecessorDef {
    Any,
    Start,
    Property(String),
}

/// A property as written in a grammar file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PropertyDef {
    Root {
        name: String,
        #[serde(default)]
        follows: Vec<(PredecessorDef, u32)>,
    },
    Parent {
        name: String,
        #[serde(default)]
        follows: Vec<(PredecessorDef, u32)>,
        #[serde(default)]
        must_contain: Vec<String>,
    },
}

impl PropertyDef {
    pub fn name(&self) -> &str {
        match self {
            PropertyDef::Root { name, .. } | PropertyDef::Parent { name, .. } => name,
        }
    }

    fn follows(&self) -> &[(PredecessorDef, u32)] {
        match self {
            PropertyDef::Root { follows, .. } | PropertyDef::Parent { follows, .. } => follows,
        }
    }
}

fn default_weight() -> u32 {
    DEFAULT_UNIT_WEIGHT
}

/// A syntactic unit as written in a grammar file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UnitDef {
    Root {
        property: String,
        text: String,
        #[serde(default = "default_weight")]
        weight: u32,
    },
    Parent {
        property: String,
        #[serde(default = "default_weight")]
        weight: u32,
        #[serde(default)]
        children: Vec<(String, u32)>,
        #[serde(default)]
        counts: Vec<(usize, u32)>,
        #[serde(default)]
        duplicates: bool,
    },
}

/// A complete grammar: properties first, then the units bound to them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrammarDefinition {
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub units: Vec<UnitDef>,
}

impl GrammarDefinition {
    /// Load a grammar definition from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<GrammarDefinition, GrammarError> {
        let contents = std::fs::read_to_string(path)?;
        let definition = Self::parse_ron(&contents)?;
        info!(
            path = %path.display(),
            properties = definition.properties.len(),
            units = definition.units.len(),
            "loaded grammar"
        );
        Ok(definition)
    }

    /// Parse a grammar definition from a RON string.
    pub fn parse_ron(input: &str) -> Result<GrammarDefinition, GrammarError> {
        Ok(ron::from_str(input)?)
    }

    /// Append another definition's properties and units after this one's.
    pub fn merge(&mut self, other: GrammarDefinition) {
        self.properties.extend(other.properties);
        self.units.extend(other.units);
    }

    /// Build a fresh registry from this definition.
    pub fn build(&self) -> Result<Registry, GrammarError> {
        let mut builder = LanguageBuilder::new();
        self.build_into(&mut builder)?;
        Ok(builder.finish())
    }

    /// Register this definition through `builder`.
    ///
    /// All properties are created before any is wired, so predecessor and
    /// mandatory-part references may point forward.
    pub fn build_into(&self, builder: &mut LanguageBuilder) -> Result<(), GrammarError> {
        for def in &self.properties {
            match def {
                PropertyDef::Root { name, .. } => builder.create_root_property(name)?,
                PropertyDef::Parent { name, .. } => builder.create_parent_property(name)?,
            };
        }

        for def in &self.properties {
            for (pred, weight) in def.follows() {
                let predecessor = match pred {
                    PredecessorDef::Any => Predecessor::Any,
                    PredecessorDef::Start => Predecessor::Start,
                    PredecessorDef::Property(name) => {
                        Predecessor::Property(lookup(builder, def.name(), name)?)
                    }
                };
                builder.add_predecessor(def.name(), predecessor, *weight)?;
            }
            if let PropertyDef::Parent { name, must_contain, .. } = def {
                for part in must_contain {
                    let part = lookup(builder, name, part)?;
                    builder.add_mandatory(name, part)?;
                }
            }
        }

        for def in &self.units {
            match def {
                UnitDef::Root {
                    property,
                    text,
                    weight,
                } => {
                    builder.create_root_unit(text, property, *weight)?;
                }
                UnitDef::Parent {
                    property,
                    weight,
                    children,
                    counts,
                    duplicates,
                } => {
                    let unit = builder.create_parent_unit(property, *weight)?;
                    for (child, child_weight) in children {
                        builder.add_child(unit, child, *child_weight)?;
                    }
                    for (count, count_weight) in counts {
                        builder.add_children_amount(unit, *count, *count_weight)?;
                    }
                    builder.set_duplicates_allowed(unit, *duplicates)?;
                }
            }
        }
        Ok(())
    }
}

fn lookup(builder: &LanguageBuilder, property: &str, name: &str) -> Result<PropertyId, GrammarError> {
    builder
        .registry()
        .get_property_by_name(name)
        .map(|p| p.id())
        .map_err(|_| GrammarError::UnknownReference {
            property: property.to_string(),
            name: name.to_string(),
        })
}

/// Findings from [`lint`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    /// Problems that make generation fail whenever they are reached.
    pub errors: Vec<String>,
    /// Suspicious constructs that may still generate.
    pub warnings: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Check a built registry for constructs that fail or misbehave at generation time.
pub fn lint(registry: &Registry) -> LintReport {
    let mut report = LintReport::default();

    let mut candidates: FxHashSet<PropertyId> = FxHashSet::default();
    let mut contains: FxHashMap<PropertyId, FxHashSet<PropertyId>> = FxHashMap::default();

    for unit in registry.units() {
        let Some(parent) = unit.as_parent() else {
            continue;
        };
        let owner = registry.property_name(unit.property());
        if parent.possible_children().is_empty() {
            report
                .errors
                .push(format!("Parent unit {} of '{}' has no candidate children", unit.id(), owner));
        }
        if parent.children_amount().is_empty() {
            report
                .errors
                .push(format!("Parent unit {} of '{}' has no child counts", unit.id(), owner));
        }
        let edges = contains.entry(unit.property()).or_default();
        for &child in parent.possible_children().items() {
            candidates.insert(child);
            edges.insert(child);
        }
    }

    for property in registry.properties() {
        let has_units = registry
            .units_of(property.id())
            .is_some_and(|units| !units.is_empty());
        if !has_units {
            report
                .errors
                .push(format!("Property '{}' has no units", property.name()));
        }
        if candidates.contains(&property.id()) && property.follows().is_empty() {
            report.errors.push(format!(
                "Property '{}' is a candidate child but can follow nothing",
                property.name()
            ));
        }
        for &part in property.must_contain() {
            contains.entry(property.id()).or_default().insert(part);
            if !candidates.contains(&part) {
                report.warnings.push(format!(
                    "Mandatory part '{}' of '{}' is never a free candidate; only mandatory insertion can produce it",
                    registry.property_name(part),
                    property.name()
                ));
            }
        }
    }

    let mut recursive: Vec<PropertyId> = contains
        .keys()
        .copied()
        .filter(|&start| reaches(&contains, start, start))
        .collect();
    recursive.sort();
    for id in recursive {
        report.warnings.push(format!(
            "Property '{}' can contain itself; recursion is bounded only by child counts and depth limit",
            registry.property_name(id)
        ));
    }

    for warning in &report.warnings {
        warn!("{}", warning);
    }
    report
}

/// Whether `target` is reachable from `from` through at least one edge.
fn reaches(
    edges: &FxHashMap<PropertyId, FxHashSet<PropertyId>>,
    from: PropertyId,
    target: PropertyId,
) -> bool {
    let mut stack: Vec<PropertyId> = edges
        .get(&from)
        .map(|next| next.iter().copied().collect())
        .unwrap_or_default();
    let mut visited = FxHashSet::default();
    while let Some(id) = stack.pop() {
        if id == target {
            return true;
        }
        if visited.insert(id) {
            if let Some(next) = edges.get(&id) {
                stack.extend(next.iter().copied());
            }
        }
    }
    false
}
