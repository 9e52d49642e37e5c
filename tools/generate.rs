/// Generate — prints words or sentences produced by a RON grammar.
///
/// Usage: generate <grammar_path>... --property <name> [--count <n>] [--seed <n>]

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use lexigen::core::engine::LanguageEngine;
use lexigen::core::generator::{
    FreeSampling, GenerationStrategy, Lookback, MandatoryFirst, StopWhenSatisfied,
};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Generate sequences from a property grammar.
#[derive(Parser, Debug)]
#[command(name = "generate", version, about, long_about = None)]
struct Cli {
    /// Grammar files or directories of `.ron` files.
    #[arg(required = true)]
    grammars: Vec<PathBuf>,

    /// Property to generate from.
    #[arg(short, long)]
    property: String,

    /// Number of outputs.
    #[arg(short, long, default_value_t = 10)]
    count: usize,

    /// RNG seed.
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Text placed between generated leaves.
    #[arg(long, default_value = "")]
    separator: String,

    /// Deepest allowed nesting of parent units.
    #[arg(long)]
    max_depth: Option<usize>,

    /// Extra attempts after a failed generation.
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// How mandatory parts are handled.
    #[arg(long, value_enum, default_value_t = StrategyArg::MandatoryFirst)]
    strategy: StrategyArg,

    /// Recent children a new child may follow under `--strategy lookback`.
    #[arg(long, default_value_t = 2)]
    window: usize,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Free,
    MandatoryFirst,
    StopWhenSatisfied,
    Lookback,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut builder = LanguageEngine::builder()
        .seed(cli.seed)
        .separator(&cli.separator)
        .retries(cli.retries);
    for path in &cli.grammars {
        builder = builder.grammar_path(path);
    }
    if let Some(max_depth) = cli.max_depth {
        builder = builder.max_depth(max_depth);
    }

    let mut engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: Failed to load grammar: {}", e);
            process::exit(1);
        }
    };

    let mut strategy: Box<dyn GenerationStrategy> = match cli.strategy {
        StrategyArg::Free => Box::new(FreeSampling),
        StrategyArg::MandatoryFirst => Box::new(MandatoryFirst),
        StrategyArg::StopWhenSatisfied => Box::new(StopWhenSatisfied),
        StrategyArg::Lookback => Box::new(Lookback { window: cli.window }),
    };

    let mut failures = 0;
    for _ in 0..cli.count {
        match engine.generate_with(&cli.property, strategy.as_mut()) {
            Ok(generated) => println!("{}", generated.render(engine.separator())),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        eprintln!("\n{} of {} generations failed", failures, cli.count);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
