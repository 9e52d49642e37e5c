/// Weighted random selection — the sampling primitive under every draw.

use rustc_hash::FxHashMap;
use std::hash::Hash;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("weights must be positive")]
    ZeroWeight,
    #[error("cannot draw from an empty collection")]
    Empty,
    #[error("weight overflow while accumulating")]
    WeightOverflow,
}

/// Source of uniform integers for weighted draws.
///
/// Every `rand::Rng` is a random source, so a seeded `StdRng` can be passed
/// wherever one is expected. Tests may supply their own scripted source.
pub trait RandomSource {
    /// Return a uniformly distributed integer in `[0, upper)`. `upper` is never 0.
    fn next_in_range(&mut self, upper: u64) -> u64;
}

impl<R: rand::Rng + ?Sized> RandomSource for R {
    fn next_in_range(&mut self, upper: u64) -> u64 {
        self.gen_range(0..upper)
    }
}

/// An ordered item → weight mapping supporting weight-proportional draws.
///
/// Insertion order is preserved and drives the cumulative scan, so a draw
/// is fully determined by the random source.
#[derive(Debug, Clone)]
pub struct WeightedSet<T> {
    entries: Vec<(T, u32)>,
    index: FxHashMap<T, usize>,
    total: u64,
}

impl<T> Default for WeightedSet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
            total: 0,
        }
    }
}

impl<T: Eq + Hash + Clone> WeightedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `(item, weight)` pairs. Repeated items accumulate.
    pub fn try_from_pairs<I>(pairs: I) -> Result<Self, SelectorError>
    where
        I: IntoIterator<Item = (T, u32)>,
    {
        let mut set = Self::new();
        for (item, weight) in pairs {
            set.add(item, weight)?;
        }
        Ok(set)
    }

    /// Add `weight` to `item`, inserting it if absent.
    pub fn add(&mut self, item: T, weight: u32) -> Result<(), SelectorError> {
        if weight == 0 {
            return Err(SelectorError::ZeroWeight);
        }
        match self.index.get(&item) {
            Some(&pos) => {
                let slot = &mut self.entries[pos].1;
                *slot = slot.checked_add(weight).ok_or(SelectorError::WeightOverflow)?;
            }
            None => {
                self.index.insert(item.clone(), self.entries.len());
                self.entries.push((item, weight));
            }
        }
        self.total = self
            .total
            .checked_add(u64::from(weight))
            .ok_or(SelectorError::WeightOverflow)?;
        Ok(())
    }

    /// Remove `item`, returning its weight if it was present.
    pub fn remove(&mut self, item: &T) -> Option<u32> {
        let pos = self.index.remove(item)?;
        let (_, weight) = self.entries.remove(pos);
        for (shifted, _) in &self.entries[pos..] {
            if let Some(i) = self.index.get_mut(shifted) {
                *i -= 1;
            }
        }
        self.total -= u64::from(weight);
        Some(weight)
    }

    pub fn weight_of(&self, item: &T) -> Option<u32> {
        self.index.get(item).map(|&pos| self.entries[pos].1)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.index.contains_key(item)
    }

    pub fn total_weight(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, u32)> + '_ {
        self.entries.iter().map(|(item, weight)| (item, *weight))
    }

    pub fn items(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|(item, _)| item)
    }

    /// Sum of weights for items satisfying `predicate`.
    pub fn combined_weight<F>(&self, mut predicate: F) -> u64
    where
        F: FnMut(&T) -> bool,
    {
        self.entries
            .iter()
            .filter(|(item, _)| predicate(item))
            .map(|(_, weight)| u64::from(*weight))
            .sum()
    }

    /// Draw one item with probability `weight / total_weight`.
    ///
    /// Rolls uniformly over `[0, total)` and scans cumulative weights.
    pub fn draw<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Result<&T, SelectorError> {
        if self.total == 0 {
            return Err(SelectorError::Empty);
        }
        let mut roll = rng.next_in_range(self.total);
        trace!(roll, total = self.total, "weighted draw");
        for (item, weight) in &self.entries {
            let weight = u64::from(*weight);
            if roll < weight {
                return Ok(item);
            }
            roll -= weight;
        }
        // Unreachable while `total` equals the sum of entry weights.
        Err(SelectorError::Empty)
    }
}
