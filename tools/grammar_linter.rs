/// Grammar Linter — validates property grammars before generation.
///
/// Usage: grammar_linter <grammar_path>...

use std::path::PathBuf;
use std::process;

use clap::Parser;
use lexigen::core::grammar::{lint, GrammarDefinition};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Check property grammars for unreachable, unresolvable, or recursive constructs.
#[derive(Parser, Debug)]
#[command(name = "grammar_linter", version, about, long_about = None)]
struct Cli {
    /// Grammar files or directories of `.ron` files.
    #[arg(required = true)]
    grammars: Vec<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut definition = GrammarDefinition::default();
    for path in &cli.grammars {
        if path.is_file() {
            load_grammar(path, &mut definition);
        } else if path.is_dir() {
            load_grammars_recursive(path, &mut definition);
        } else {
            eprintln!("ERROR: Path '{}' does not exist", path.display());
            process::exit(1);
        }
    }

    println!(
        "Loaded {} properties and {} units",
        definition.properties.len(),
        definition.units.len()
    );

    let registry = match definition.build() {
        Ok(registry) => registry,
        Err(e) => {
            println!("ERROR: {}", e);
            println!("\nSummary: 1 errors, 0 warnings");
            process::exit(1);
        }
    };

    let report = lint(&registry);

    println!("\n=== Grammar Lint Report ===\n");

    if report.is_clean() {
        println!("All checks passed!");
    }

    for warning in &report.warnings {
        println!("WARNING: {}", warning);
    }

    for error in &report.errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );

    if report.errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_grammar(path: &std::path::Path, definition: &mut GrammarDefinition) {
    match GrammarDefinition::load_from_ron(path) {
        Ok(loaded) => {
            println!("  Loaded: {}", path.display());
            definition.merge(loaded);
        }
        Err(e) => {
            eprintln!("ERROR: Failed to load grammar file {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}

fn load_grammars_recursive(dir: &std::path::Path, definition: &mut GrammarDefinition) {
    let mut paths: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.flatten().map(|entry| entry.path()).collect(),
        Err(e) => {
            eprintln!("ERROR: Cannot read {}: {}", dir.display(), e);
            process::exit(1);
        }
    };
    paths.sort();
    for path in paths {
        if path.is_dir() {
            load_grammars_recursive(&path, definition);
        } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            load_grammar(&path, definition);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
