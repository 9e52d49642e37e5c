/// The top-level engine: grammar loading, seeding, and reproducible generation.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::generator::{
    GenerationError, GenerationStrategy, Generated, Generator, GeneratorConfig, MandatoryFirst,
};
use crate::core::grammar::{GrammarDefinition, GrammarError};
use crate::core::registry::{Registry, RegistryError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no grammar definitions were provided")]
    NoGrammar,
    #[error("generation failed after {0} retries: {1}")]
    GenerationFailed(u32, GenerationError),
}

/// A loaded grammar plus generation settings. Built via `LanguageEngine::builder()`.
#[derive(Debug)]
pub struct LanguageEngine {
    registry: Registry,
    config: GeneratorConfig,
    separator: String,
    retries: u32,
    seed: u64,
    generation_count: u64,
}

/// Builder for constructing a `LanguageEngine`.
#[derive(Debug, Default)]
pub struct LanguageEngineBuilder {
    grammar_paths: Vec<PathBuf>,
    /// Directly provided definitions (for testing without files).
    definitions: Vec<GrammarDefinition>,
    seed: u64,
    max_depth: Option<usize>,
    separator: String,
    retries: u32,
}

impl LanguageEngine {
    pub fn builder() -> LanguageEngineBuilder {
        LanguageEngineBuilder::default()
    }

    /// Wrap an already-built registry with default settings.
    pub fn from_registry(registry: Registry) -> Self {
        Self {
            registry,
            config: GeneratorConfig::default(),
            separator: String::new(),
            retries: 0,
            seed: 0,
            generation_count: 0,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Generate from the property named `property`, inserting mandatory parts first.
    pub fn generate(&mut self, property: &str) -> Result<Generated, EngineError> {
        self.generate_with(property, &mut MandatoryFirst)
    }

    /// Generate from the property named `property` under a caller-chosen strategy.
    ///
    /// Each call draws from a fresh RNG seeded from the engine seed and the
    /// number of generations so far. Failed attempts are retried with a
    /// shifted seed up to the configured retry count.
    pub fn generate_with<S>(&mut self, property: &str, strategy: &mut S) -> Result<Generated, EngineError>
    where
        S: GenerationStrategy + ?Sized,
    {
        let property = self.registry.get_property_by_name(property)?.id();
        let generator = Generator::with_config(&self.registry, self.config);

        let mut attempt = 0u32;
        loop {
            let mut rng = StdRng::seed_from_u64(
                self.seed
                    .wrapping_add(self.generation_count)
                    .wrapping_add(u64::from(attempt) * 7919), // prime offset per retry
            );
            match generator.generate_property(property, strategy, &mut rng) {
                Ok(generated) => {
                    self.generation_count += 1;
                    return Ok(generated);
                }
                Err(e @ GenerationError::NoAdmissibleContinuation { .. })
                | Err(e @ GenerationError::DepthExceeded(_))
                    if attempt < self.retries =>
                {
                    debug!(attempt, error = %e, "generation attempt failed");
                    attempt += 1;
                }
                Err(e) => {
                    self.generation_count += 1;
                    return Err(if attempt > 0 {
                        EngineError::GenerationFailed(attempt, e)
                    } else {
                        e.into()
                    });
                }
            }
        }
    }

    /// Generate and render with the engine's separator.
    pub fn generate_text(&mut self, property: &str) -> Result<String, EngineError> {
        let generated = self.generate(property)?;
        Ok(generated.render(&self.separator))
    }

    /// Generate `count` rendered variants of `property`.
    pub fn generate_variants(&mut self, property: &str, count: usize) -> Result<Vec<String>, EngineError> {
        let mut results = Vec::with_capacity(count);
        for _ in 0..count {
            results.push(self.generate_text(property)?);
        }
        Ok(results)
    }
}

impl LanguageEngineBuilder {
    /// Load a grammar file, or every `.ron` file under a directory.
    pub fn grammar_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.grammar_paths.push(path.into());
        self
    }

    /// Provide a definition directly (for testing without files).
    pub fn with_definition(mut self, definition: GrammarDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Text placed between leaf texts when rendering.
    pub fn separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    /// Extra attempts, each with a shifted seed, after a failed generation.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn build(self) -> Result<LanguageEngine, EngineError> {
        let mut definition = GrammarDefinition::default();
        let mut sources = 0usize;

        for path in &self.grammar_paths {
            if path.is_dir() {
                load_ron_files_from_dir(path, &mut |file: &Path| {
                    definition.merge(GrammarDefinition::load_from_ron(file)?);
                    sources += 1;
                    Ok(())
                })?;
            } else {
                definition.merge(GrammarDefinition::load_from_ron(path)?);
                sources += 1;
            }
        }
        for extra in self.definitions {
            definition.merge(extra);
            sources += 1;
        }
        if sources == 0 {
            return Err(EngineError::NoGrammar);
        }

        let registry = definition.build()?;
        info!(
            properties = registry.properties().len(),
            units = registry.units().len(),
            seed = self.seed,
            "language engine built"
        );

        let mut config = GeneratorConfig::default();
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }

        Ok(LanguageEngine {
            registry,
            config,
            separator: self.separator,
            retries: self.retries,
            seed: self.seed,
            generation_count: 0,
        })
    }
}

/// Visit every `.ron` file under `dir`, recursively, in path order.
fn load_ron_files_from_dir(
    dir: &Path,
    loader: &mut dyn FnMut(&Path) -> Result<(), EngineError>,
) -> Result<(), EngineError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        paths.push(entry?.path());
    }
    paths.sort();
    for path in paths {
        if path.is_dir() {
            load_ron_files_from_dir(&path, loader)?;
        } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            loader(&path)?;
        }
    }
    Ok(())
}
