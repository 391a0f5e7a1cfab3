//! dchoice CLI

use std::collections::{BTreeMap, BTreeSet};
use std::hint::black_box;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use dc_core::Utilities;
use dc_logit::{CrossNestedLogit, MultinomialLogit, NestedLogit, synthetic};
use dc_models::ParameterSet;
use rand::SeedableRng;
use rand::rngs::StdRng;

mod model_spec;

use model_spec::{Alternative, CliModel, ModelSpec};

#[derive(Parser)]
#[command(name = "dchoice")]
#[command(about = "dchoice - nested and cross-nested logit choice models")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Utilities and choice probabilities of a model
    Probabilities {
        /// Model description (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Parameter file (`NAME = expression` lines); overrides inline parameters
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// Restrict the choice set to these alternatives (comma-separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Draw choices with a seeded random number generator
    Select {
        /// Model description (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Parameter file (`NAME = expression` lines); overrides inline parameters
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of draws
        #[arg(long, default_value = "1000")]
        draws: usize,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the nest tree of a model
    Tree {
        /// Model description (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Parameter file (`NAME = expression` lines); overrides inline parameters
        #[arg(short, long)]
        params: Option<PathBuf>,
    },

    /// Time evaluation on synthetic structures
    Bench {
        /// Number of alternatives
        #[arg(long, default_value = "100")]
        alternatives: u32,

        /// Number of nests
        #[arg(long, default_value = "10")]
        nests: u32,

        /// Evaluations per case
        #[arg(long, default_value = "1000")]
        iterations: usize,

        /// Threads for the batch case (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Probabilities { model, params, only, output } => {
            cmd_probabilities(&model, params.as_ref(), &only, output.as_ref())
        }
        Commands::Select { model, params, seed, draws, output } => {
            cmd_select(&model, params.as_ref(), seed, draws, output.as_ref())
        }
        Commands::Tree { model, params } => cmd_tree(&model, params.as_ref()),
        Commands::Bench { alternatives, nests, iterations, threads, output } => {
            cmd_bench(alternatives, nests, iterations, threads, output.as_ref())
        }
    }
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}

fn load_spec(model: &PathBuf, params: Option<&PathBuf>) -> Result<(ModelSpec, ParameterSet)> {
    tracing::info!(path = %model.display(), "loading model");
    let spec = ModelSpec::read(model)?;
    let overrides = match params {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading parameters");
            Some(ParameterSet::read(path)?)
        }
        None => None,
    };
    let parameters = spec.parameter_set(overrides.as_ref());
    tracing::info!(parameters = parameters.len(), "parameters resolved");
    Ok((spec, parameters))
}

fn load_model(model: &PathBuf, params: Option<&PathBuf>) -> Result<CliModel> {
    let (spec, parameters) = load_spec(model, params)?;
    spec.build(parameters)
}

fn cmd_probabilities(
    model: &PathBuf,
    params: Option<&PathBuf>,
    only: &[String],
    output: Option<&PathBuf>,
) -> Result<()> {
    let model = load_model(model, params)?;
    let choices: BTreeSet<Alternative> = if only.is_empty() {
        model.choices().clone()
    } else {
        only.iter().map(|name| Alternative(name.trim().to_string())).collect()
    };
    let report = model.model().report(&choices, &())?;
    tracing::info!(total = report.total_probability(), "probabilities computed");
    write_json(output, serde_json::to_value(&report)?)
}

fn cmd_select(
    model: &PathBuf,
    params: Option<&PathBuf>,
    seed: u64,
    draws: usize,
    output: Option<&PathBuf>,
) -> Result<()> {
    let model = load_model(model, params)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut counts: BTreeMap<String, usize> =
        model.choices().iter().map(|a| (a.to_string(), 0)).collect();
    for _ in 0..draws {
        let chosen = model.select_fixed(&(), &mut rng)?;
        *counts.entry(chosen.to_string()).or_default() += 1;
    }
    tracing::info!(draws, seed, "selection complete");

    let output_json = serde_json::json!({
        "model": dc_models::ChoiceModel::<Alternative, ()>::name(&model),
        "seed": seed,
        "draws": draws,
        "counts": counts,
    });
    write_json(output, output_json)
}

fn cmd_tree(model: &PathBuf, params: Option<&PathBuf>) -> Result<()> {
    let (spec, parameters) = load_spec(model, params)?;
    let structure = spec.structure(&parameters)?;
    print!("{}", structure.render_tree());
    Ok(())
}

fn cmd_bench(
    alternatives: u32,
    nests: u32,
    iterations: usize,
    threads: usize,
    output: Option<&PathBuf>,
) -> Result<()> {
    if alternatives == 0 || iterations == 0 {
        bail!("--alternatives and --iterations must be positive");
    }
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }

    let utilities = synthetic::utilities(alternatives);
    let nested = NestedLogit::new(synthetic::nested_structure::<()>(alternatives, nests)?)?;
    let cross =
        CrossNestedLogit::new(synthetic::cross_nested_structure::<()>(alternatives, nests)?);
    let flat = MultinomialLogit::new();
    tracing::info!(alternatives, nests, iterations, "structures built");

    let mut cases = Vec::new();
    cases.push(time_case("multinomial", iterations, || flat.probabilities(&utilities).map(drop))?);
    cases.push(time_case("nested", iterations, || {
        nested.probabilities(&utilities, &()).map(drop)
    })?);
    cases.push(time_case("cross_nested", iterations, || {
        cross.probabilities(&utilities, &()).map(drop)
    })?);

    let batch: Vec<Utilities<u32>> = vec![utilities.clone(); iterations];
    let start = Instant::now();
    let results = black_box(nested.probabilities_batch(&batch, &()));
    let elapsed = start.elapsed();
    for result in results {
        result?;
    }
    cases.push(case_json("nested_batch", iterations, elapsed.as_secs_f64()));

    let output_json = serde_json::json!({
        "alternatives": alternatives,
        "nests": nests,
        "iterations": iterations,
        "threads": rayon::current_num_threads(),
        "cases": cases,
    });
    write_json(output, output_json)
}

fn time_case<F>(name: &str, iterations: usize, mut eval: F) -> Result<serde_json::Value>
where
    F: FnMut() -> dc_core::Result<()>,
{
    let start = Instant::now();
    for _ in 0..iterations {
        black_box(eval()?);
    }
    let seconds = start.elapsed().as_secs_f64();
    tracing::info!(case = name, seconds, "case timed");
    Ok(case_json(name, iterations, seconds))
}

fn case_json(name: &str, iterations: usize, seconds: f64) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "total_ms": seconds * 1e3,
        "per_eval_us": seconds * 1e6 / iterations as f64,
    })
}
