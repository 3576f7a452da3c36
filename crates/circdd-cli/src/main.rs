#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::atomic::Ordering::Relaxed;
use std::time::Instant;

use circdd::{
    gradual_unify_orders, unify_orders, BuilderConfig, ModelBuilder, ReorderPolicy, VarNo,
};
use circdd_core::util::{seeded_rng, RngExt};
use circdd_forest::ForestConfig;
use circdd_parser::load_file::load_file;
use clap::{ArgAction, Parser, ValueEnum};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

mod stats;
mod util;
use stats::{Phase, StatsWriter};
use util::{or_exit, HDuration};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// BLIF input file
    file: PathBuf,

    /// Number of random reorders to perform after building each model
    #[arg(default_value_t = 0)]
    reorders: usize,

    /// Seed for the random orders and randomized reorder decisions
    #[arg(default_value_t = 0)]
    seed: u64,

    /// Reorder heuristic: LI, HI, BD, BU, LC, LM, RAN or LARC
    #[arg(default_value = "LARC")]
    heuristic: String,

    /// How explicit reorders are carried out
    #[arg(value_enum, long, default_value_t = Strategy::InPlace)]
    strategy: Strategy,

    /// Variable order to establish before building
    #[arg(value_enum, long, default_value_t = InitialOrder::None)]
    initial_order: InitialOrder,

    /// Unify the variable orders of the first two models afterwards
    #[arg(value_enum, long, default_value_t = Unify::None)]
    unify: Unify,

    /// Node count that first triggers an optimization during building
    #[arg(long, default_value_t = circdd::DEFAULT_SIZE_THRESHOLD)]
    size_threshold: usize,

    /// Growth factor up to which sifting keeps moving a variable
    #[arg(long, default_value_t = 1.2)]
    max_growth: f64,

    /// Write every reported status to the given CSV file
    #[arg(long)]
    stats_csv: Option<PathBuf>,

    /// Increase the log level (may be given multiple times)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Always output durations as seconds (floating point)
    #[arg(long)]
    durations_as_secs: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum Strategy {
    /// Permute the levels by adjacent swaps
    InPlace,
    /// Rebuild the outputs in a fresh engine
    Rebuild,
}

impl From<Strategy> for circdd::ReorderStrategy {
    fn from(value: Strategy) -> Self {
        match value {
            Strategy::InPlace => circdd::ReorderStrategy::InPlace,
            Strategy::Rebuild => circdd::ReorderStrategy::Rebuild,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum InitialOrder {
    /// Keep the engine's initial order
    None,
    /// Inputs of the deepest gates first
    Depth,
    /// Randomized depth-first traversal from the outputs
    Dfs,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum Unify {
    /// Keep the orders of all models as they are
    None,
    /// Move the cheaper side at every mismatching level
    Greedy,
    /// Like greedy, but optimize the levels below whenever a model grows
    Gradual,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .unwrap();

    util::DURATIONS_AS_SECS.store(cli.durations_as_secs, Relaxed);

    let policy: ReorderPolicy = or_exit(cli.heuristic.parse());
    if cli.max_growth < 1.0 {
        eprintln!("error: the maximum growth must be at least 1");
        std::process::exit(1);
    }

    println!("File: {}", cli.file.display());
    println!("Heuristic: {}", cli.heuristic);

    let Some(models) = load_file(&cli.file) else {
        std::process::exit(1)
    };
    if models.is_empty() {
        eprintln!("error: '{}' does not contain any model", cli.file.display());
        std::process::exit(1);
    }

    let budget = models
        .iter()
        .map(|model| model.inputs.len())
        .max()
        .unwrap_or(0);
    let Ok(budget) = VarNo::try_from(budget) else {
        eprintln!("error: too many inputs ({budget})");
        std::process::exit(1);
    };

    let mut stats = StatsWriter::new(cli.stats_csv.as_ref());
    let mut rng = seeded_rng(cli.seed);
    let mut builders = Vec::with_capacity(models.len());

    for model in &models {
        let config = BuilderConfig {
            strategy: cli.strategy.into(),
            size_threshold: cli.size_threshold,
            engine: ForestConfig {
                seed: cli.seed,
                max_growth: cli.max_growth,
                ..Default::default()
            },
        };
        let mut builder = or_exit(ModelBuilder::with_config(model, config));
        or_exit(builder.set_num_vars(budget));

        println!();
        println!("Model: {}", builder.name());
        let start = Instant::now();
        or_exit(builder.initialize_with_policy(policy));
        let initial = match cli.initial_order {
            InitialOrder::None => None,
            InitialOrder::Depth => Some(builder.depth_order()),
            InitialOrder::Dfs => Some(builder.dfs_order(&mut rng)),
        };
        if let Some(order) = initial {
            log::info!("initial order: {order:?}");
            or_exit(builder.reorder(&order));
        }
        or_exit(builder.build_model());
        or_exit(builder.optimize());
        let time = start.elapsed();
        let status = or_exit(builder.output_status());
        println!("{status}");
        println!("Time: {}", HDuration(time));
        stats.record(builder.name(), Phase::Build, 0, status, time);

        for i in 1..=cli.reorders {
            let mut order = or_exit(builder.get_variable_order());
            rng.shuffle(&mut order);
            println!("Order {i}: {order:?}");

            let start = Instant::now();
            or_exit(builder.reset_stat());
            or_exit(builder.reorder(&order));
            let time = start.elapsed();
            let status = or_exit(builder.output_status());
            println!("{status}");
            println!("Time: {}", HDuration(time));
            stats.record(builder.name(), Phase::Reorder, i, status, time);
        }

        builders.push(builder);
    }

    if cli.unify != Unify::None {
        let [x, y, ..] = &mut builders[..] else {
            eprintln!("error: unification requires at least two models");
            std::process::exit(1);
        };

        println!();
        let start = Instant::now();
        let result = match cli.unify {
            Unify::Greedy => unify_orders(x, y),
            _ => gradual_unify_orders(x, y),
        };
        let summary = or_exit(result);
        let time = start.elapsed();
        println!(
            "Unified {} and {} ({} + {} swaps, {} + {} optimizations)",
            x.name(),
            y.name(),
            summary.swaps[0],
            summary.swaps[1],
            summary.optimizations[0],
            summary.optimizations[1],
        );
        println!("Order: {:?}", or_exit(x.get_variable_order()));
        for builder in [x, y] {
            let status = or_exit(builder.output_status());
            println!("Model: {}", builder.name());
            println!("{status}");
            stats.record(builder.name(), Phase::Unify, 0, status, time);
        }
        println!("Time: {}", HDuration(time));
    }

    for builder in &mut builders {
        builder.release();
    }
    println!();
    println!("Total time: {}", HDuration(stats.elapsed_time()));
}
