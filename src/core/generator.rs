/// Generation — walks the property graph to materialize parent units.
///
/// A parent unit samples a child count, then repeatedly picks an admissible
/// next child property until the count is reached. Each chosen property is
/// resolved to one of its units, recursing into parent units.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::core::registry::{Registry, RegistryError};
use crate::core::selector::{RandomSource, SelectorError};
use crate::core::unit::{ParentUnit, SyntacticUnit, UnitKind};
use crate::schema::symbol::{Predecessor, PropertyId, UnitId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("while building the children of {parent}, no children were found that can go after {after}")]
    NoAdmissibleContinuation { parent: String, after: String },
    #[error("weight overflow combining child {child} of {parent}")]
    WeightOverflow { parent: String, child: String },
    #[error("property '{0}' has no units to resolve to")]
    NoUnitsForProperty(String),
    #[error("generation exceeded the maximum depth of {0}")]
    DepthExceeded(usize),
    #[error("{0} is not a parent unit")]
    NotAParentUnit(UnitId),
    #[error("sampling error: {0}")]
    Selector(#[from] SelectorError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Lifecycle of one open generation of a parent unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    AwaitingCount,
    SelectingChild,
    Done,
    Failed,
}

/// What a strategy asks the generation to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Insert a pending mandatory part if one can follow; otherwise sample freely.
    Mandatory,
    /// Sample the next child from the candidate set.
    Free,
    /// End this generation now.
    Stop,
}

/// Snapshot of an open generation handed to a strategy.
#[derive(Debug, Clone, Copy)]
pub struct StepView<'a> {
    pub unit: UnitId,
    pub position: usize,
    pub target: usize,
    pub chosen: &'a [PropertyId],
    pub pending_mandatory: usize,
    /// Mandatory parts declared by the unit's property, emitted or not.
    pub mandatory_total: usize,
}

/// Decides, step by step, between mandatory insertion and free sampling.
pub trait GenerationStrategy {
    fn next_step(&mut self, view: &StepView<'_>) -> Step;

    /// Predecessors the next child must be able to follow. Defaults to the
    /// last chosen child, or `Start` at the beginning of the sequence.
    fn open_predecessors(&mut self, view: &StepView<'_>) -> Vec<Predecessor> {
        match view.chosen.last() {
            Some(&last) => vec![Predecessor::Property(last)],
            None => vec![Predecessor::Start],
        }
    }
}

/// Always samples freely; mandatory parts are left to chance.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeSampling;

impl GenerationStrategy for FreeSampling {
    fn next_step(&mut self, _view: &StepView<'_>) -> Step {
        Step::Free
    }
}

/// Inserts pending mandatory parts as soon as they can follow.
#[derive(Debug, Clone, Copy, Default)]
pub struct MandatoryFirst;

impl GenerationStrategy for MandatoryFirst {
    fn next_step(&mut self, view: &StepView<'_>) -> Step {
        if view.pending_mandatory > 0 {
            Step::Mandatory
        } else {
            Step::Free
        }
    }
}

/// Like [`MandatoryFirst`], but ends the generation once every mandatory
/// part has been emitted. Units whose property declares no mandatory parts
/// run to their sampled count.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopWhenSatisfied;

impl GenerationStrategy for StopWhenSatisfied {
    fn next_step(&mut self, view: &StepView<'_>) -> Step {
        if view.pending_mandatory > 0 {
            Step::Mandatory
        } else if view.mandatory_total > 0 && view.position > 0 {
            Step::Stop
        } else {
            Step::Free
        }
    }
}

/// Like [`MandatoryFirst`], but the next child may follow any of the last
/// `window` chosen children rather than only the last one.
#[derive(Debug, Clone, Copy)]
pub struct Lookback {
    pub window: usize,
}

impl GenerationStrategy for Lookback {
    fn next_step(&mut self, view: &StepView<'_>) -> Step {
        MandatoryFirst.next_step(view)
    }

    fn open_predecessors(&mut self, view: &StepView<'_>) -> Vec<Predecessor> {
        if view.chosen.is_empty() {
            return vec![Predecessor::Start];
        }
        let from = view.chosen.len().saturating_sub(self.window.max(1));
        view.chosen[from..]
            .iter()
            .map(|&id| Predecessor::Property(id))
            .collect()
    }
}

/// One generation of a parent unit's child property sequence.
#[derive(Debug)]
pub struct OpenGeneration<'r> {
    registry: &'r Registry,
    unit: UnitId,
    parent: &'r ParentUnit,
    mandatory_total: usize,
    state: GenerationState,
    target: usize,
    chosen: Vec<PropertyId>,
}

impl<'r> OpenGeneration<'r> {
    pub fn new(registry: &'r Registry, unit: UnitId) -> Result<Self, GenerationError> {
        let syntactic = registry.unit(unit)?;
        let parent = syntactic
            .as_parent()
            .ok_or(GenerationError::NotAParentUnit(unit))?;
        let mandatory_total = registry.property(syntactic.property())?.must_contain().len();
        Ok(Self {
            registry,
            unit,
            parent,
            mandatory_total,
            state: GenerationState::AwaitingCount,
            target: 0,
            chosen: Vec::new(),
        })
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    /// Sampled child count; 0 until [`sample_count`](Self::sample_count) runs.
    pub fn target(&self) -> usize {
        self.target
    }

    pub fn chosen(&self) -> &[PropertyId] {
        &self.chosen
    }

    /// Predecessors the next child must follow under the default strategy.
    pub fn open_predecessors(&self) -> Vec<Predecessor> {
        match self.chosen.last() {
            Some(&last) => vec![Predecessor::Property(last)],
            None => vec![Predecessor::Start],
        }
    }

    /// Sample the child count. Moves from `AwaitingCount` to `SelectingChild`,
    /// or straight to `Done` when the count is 0.
    pub fn sample_count<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> Result<usize, GenerationError> {
        if self.state != GenerationState::AwaitingCount {
            return Ok(self.target);
        }
        match self.parent.sample_children_amount(rng) {
            Ok(count) => {
                self.target = count;
                self.state = if count == 0 {
                    GenerationState::Done
                } else {
                    GenerationState::SelectingChild
                };
                trace!(unit = %self.unit, count, "sampled child count");
                Ok(count)
            }
            Err(e) => {
                self.state = GenerationState::Failed;
                Err(e.into())
            }
        }
    }

    /// Choose the next child. Returns `None` once the generation is done.
    pub fn step<S, R>(&mut self, strategy: &mut S, rng: &mut R) -> Result<Option<PropertyId>, GenerationError>
    where
        S: GenerationStrategy + ?Sized,
        R: RandomSource + ?Sized,
    {
        if self.state == GenerationState::AwaitingCount {
            self.sample_count(rng)?;
        }
        if self.state != GenerationState::SelectingChild {
            return Ok(None);
        }
        match self.choose(strategy, rng) {
            Ok(Some(child)) => {
                self.chosen.push(child);
                if self.chosen.len() >= self.target {
                    self.state = GenerationState::Done;
                }
                Ok(Some(child))
            }
            Ok(None) => {
                self.state = GenerationState::Done;
                Ok(None)
            }
            Err(e) => {
                self.state = GenerationState::Failed;
                Err(e)
            }
        }
    }

    /// Drive the generation to completion.
    pub fn run<S, R>(mut self, strategy: &mut S, rng: &mut R) -> Result<Vec<PropertyId>, GenerationError>
    where
        S: GenerationStrategy + ?Sized,
        R: RandomSource + ?Sized,
    {
        while self.step(strategy, rng)?.is_some() {}
        Ok(self.chosen)
    }

    fn choose<S, R>(&self, strategy: &mut S, rng: &mut R) -> Result<Option<PropertyId>, GenerationError>
    where
        S: GenerationStrategy + ?Sized,
        R: RandomSource + ?Sized,
    {
        let pending_mandatory = self.parent.pending_mandatory(self.registry, &self.chosen)?;
        let view = StepView {
            unit: self.unit,
            position: self.chosen.len(),
            target: self.target,
            chosen: &self.chosen,
            pending_mandatory,
            mandatory_total: self.mandatory_total,
        };
        let open = strategy.open_predecessors(&view);
        match strategy.next_step(&view) {
            Step::Stop => {
                debug!(unit = %self.unit, position = view.position, "strategy stopped generation");
                Ok(None)
            }
            Step::Mandatory => {
                let forced = self.parent.first_pending_mandatory_following(
                    self.registry,
                    &open,
                    &self.chosen,
                )?;
                match forced {
                    Some(part) => {
                        debug!(
                            unit = %self.unit,
                            child = %self.registry.property_name(part),
                            "inserted mandatory part"
                        );
                        Ok(Some(part))
                    }
                    None => self.sample_free(&open, rng).map(Some),
                }
            }
            Step::Free => self.sample_free(&open, rng).map(Some),
        }
    }

    fn sample_free<R: RandomSource + ?Sized>(
        &self,
        open: &[Predecessor],
        rng: &mut R,
    ) -> Result<PropertyId, GenerationError> {
        let child = match open {
            [single] => self
                .parent
                .next_child_given(self.registry, single, &self.chosen, rng)?,
            _ => self
                .parent
                .next_child_given_any_of(self.registry, open, &self.chosen, rng)?,
        };
        debug!(
            unit = %self.unit,
            child = %self.registry.property_name(child),
            "sampled child"
        );
        Ok(child)
    }
}

/// A materialized output tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Generated {
    /// A root unit's literal text.
    Text {
        unit: UnitId,
        property: PropertyId,
        text: String,
    },
    /// A parent unit and its generated children, in order.
    Composite {
        unit: UnitId,
        property: PropertyId,
        children: Vec<Generated>,
    },
}

impl Generated {
    pub fn unit(&self) -> UnitId {
        match self {
            Generated::Text { unit, .. } | Generated::Composite { unit, .. } => *unit,
        }
    }

    pub fn property(&self) -> PropertyId {
        match self {
            Generated::Text { property, .. } | Generated::Composite { property, .. } => *property,
        }
    }

    /// Direct children; empty for text leaves.
    pub fn children(&self) -> &[Generated] {
        match self {
            Generated::Text { .. } => &[],
            Generated::Composite { children, .. } => children,
        }
    }

    /// Leaf texts in output order.
    pub fn texts(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_texts(&mut out);
        out
    }

    fn collect_texts<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Generated::Text { text, .. } => out.push(text),
            Generated::Composite { children, .. } => {
                for child in children {
                    child.collect_texts(out);
                }
            }
        }
    }

    /// Leaf texts joined with `separator`.
    pub fn render(&self, separator: &str) -> String {
        self.texts().join(separator)
    }
}

/// Generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Deepest allowed nesting of parent units. The outermost parent is at
    /// depth 0; root leaves do not count. Self-referential grammars are
    /// otherwise bounded only by their sampled child counts.
    pub max_depth: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

/// Materializes units from a registry. The registry is read-only here, so
/// independent generations may share it across threads, each with its own
/// random source.
#[derive(Debug, Clone, Copy)]
pub struct Generator<'r> {
    registry: &'r Registry,
    config: GeneratorConfig,
}

impl<'r> Generator<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self::with_config(registry, GeneratorConfig::default())
    }

    pub fn with_config(registry: &'r Registry, config: GeneratorConfig) -> Self {
        Self { registry, config }
    }

    /// Resolve `property` to one of its units and materialize it.
    pub fn generate_property<S, R>(
        &self,
        property: PropertyId,
        strategy: &mut S,
        rng: &mut R,
    ) -> Result<Generated, GenerationError>
    where
        S: GenerationStrategy + ?Sized,
        R: RandomSource + ?Sized,
    {
        let unit = self.resolve_unit(property, rng)?;
        self.expand(unit, 0, strategy, rng)
    }

    /// Materialize a specific unit.
    pub fn generate_unit<S, R>(
        &self,
        unit: UnitId,
        strategy: &mut S,
        rng: &mut R,
    ) -> Result<Generated, GenerationError>
    where
        S: GenerationStrategy + ?Sized,
        R: RandomSource + ?Sized,
    {
        self.expand(unit, 0, strategy, rng)
    }

    /// Weighted pick among the units built against `property`.
    pub fn resolve_unit<R: RandomSource + ?Sized>(
        &self,
        property: PropertyId,
        rng: &mut R,
    ) -> Result<UnitId, GenerationError> {
        let units = self
            .registry
            .units_of(property)
            .filter(|units| !units.is_empty())
            .ok_or_else(|| GenerationError::NoUnitsForProperty(self.registry.property_name(property)))?;
        let unit = *units.draw(rng)?;
        debug!(property = %self.registry.property_name(property), %unit, "resolved unit");
        Ok(unit)
    }

    fn expand<S, R>(
        &self,
        unit_id: UnitId,
        depth: usize,
        strategy: &mut S,
        rng: &mut R,
    ) -> Result<Generated, GenerationError>
    where
        S: GenerationStrategy + ?Sized,
        R: RandomSource + ?Sized,
    {
        let unit: &SyntacticUnit = self.registry.unit(unit_id)?;
        match unit.kind() {
            UnitKind::Root { text } => Ok(Generated::Text {
                unit: unit_id,
                property: unit.property(),
                text: text.clone(),
            }),
            UnitKind::Parent(_) => {
                if depth > self.config.max_depth {
                    return Err(GenerationError::DepthExceeded(self.config.max_depth));
                }
                let sequence = OpenGeneration::new(self.registry, unit_id)?.run(strategy, rng)?;
                let mut children = Vec::with_capacity(sequence.len());
                for child in sequence {
                    let child_unit = self.resolve_unit(child, rng)?;
                    children.push(self.expand(child_unit, depth + 1, strategy, rng)?);
                }
                Ok(Generated::Composite {
                    unit: unit_id,
                    property: unit.property(),
                    children,
                })
            }
        }
    }
}
