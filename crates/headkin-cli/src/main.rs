//! headkin CLI
//!
//! # Commands
//!
//! - `augment`: expand recordings into six peak-aligned tensors each and store them
//! - `damage`: DAMAGE score of a recording's angular acceleration
//! - `ubric`: UBrIC score and features
//! - `label`: metadata row for a recording
//! - `config`: print the effective (or an example) configuration

mod error;

use clap::{Parser, Subcommand};
use error::{CliError, CliExitCode};
use headkin_core::config::HeadkinConfig;
use headkin_core::io::{ImpactTable, JsonTensorStore, TensorSink};
use headkin_core::logging::{init_logging, LogConfig};
use headkin_core::metadata::MetadataLinker;
use headkin_core::ode::SolverMethod;
use headkin_core::pipeline::{AugmentedTensor, Augmenter};
use headkin_core::types::{KinematicProfile, PreprocessError, PreprocessResult, TimeVector};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "headkin", version, about = "Head-impact kinematics preprocessing")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: search path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, short = 'j', global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build six augmented tensors per recording and store them
    Augment {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// JSON tensor store to create or update
        #[arg(long, short)]
        output: PathBuf,
        /// Base seed; file i uses seed + i
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Worker threads (default: all cores)
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// DAMAGE of a recording
    Damage {
        file: PathBuf,
        /// ODE method: rk45 or trapezoid
        #[arg(long)]
        method: Option<SolverMethod>,
    },
    /// UBrIC of a recording
    Ubric { file: PathBuf },
    /// Metadata label of a recording
    Label {
        file: PathBuf,
        #[arg(long)]
        metadata_dir: Option<PathBuf>,
    },
    /// Show configuration
    Config {
        /// Print an example instead of the effective configuration
        #[arg(long)]
        example: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&LogConfig::default());
            eprintln!("error: {}", e);
            return CliExitCode::from(&e).into();
        }
    };

    let mut logging = config.logging.clone();
    logging.level = logging.level.raised_by(cli.verbose);
    init_logging(&logging);

    match run(cli, config) {
        Ok(()) => CliExitCode::Success.into(),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {}", e);
            CliExitCode::from(&e).into()
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<HeadkinConfig, CliError> {
    let config = match path {
        Some(p) => HeadkinConfig::load_from(p)?,
        None => HeadkinConfig::load()?,
    };
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli, config: HeadkinConfig) -> Result<(), CliError> {
    match cli.command {
        Commands::Augment {
            files,
            output,
            seed,
            jobs,
        } => augment(&config, &files, &output, seed, jobs, cli.json),
        Commands::Damage { file, method } => damage(&config, &file, method, cli.json),
        Commands::Ubric { file } => ubric(&config, &file, cli.json),
        Commands::Label { file, metadata_dir } => {
            let dir = metadata_dir.unwrap_or_else(|| config.metadata.dir.clone());
            let entry = MetadataLinker::new(dir).lookup(&file)?;
            if cli.json {
                print_json(&json!({ "file": file, "entry": entry }))
            } else {
                println!(
                    "{}: pred={} ubric={} location={}",
                    file.display(),
                    entry.pred,
                    entry.ubric.map_or("-".to_string(), |u| u.to_string()),
                    entry.location.as_deref().unwrap_or("-")
                );
                Ok(())
            }
        }
        Commands::Config { example } => {
            let yaml = if example {
                HeadkinConfig::example_yaml()
            } else {
                config.to_yaml()?
            };
            print!("{}", yaml);
            Ok(())
        }
    }
}

/// Group name for a recording: its file stem.
fn group_name(path: &Path) -> PreprocessResult<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| PreprocessError::Parse(format!("{}: no file name", path.display())))
}

/// Seed for the `index`-th file of a batch.
fn file_seed(base: u64, index: usize) -> u64 {
    base.wrapping_add(index as u64)
}

fn augment_file(
    augmenter: &Augmenter,
    config: &HeadkinConfig,
    path: &Path,
    seed: u64,
) -> PreprocessResult<(String, Vec<AugmentedTensor>)> {
    let group = group_name(path)?;
    let profile = ImpactTable::from_path(path)?
        .profile_by_indices(&config.columns.augment_indices)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let tensors = augmenter.augment(&profile, &mut rng)?;
    tracing::info!(file = %path.display(), group = %group, "augmented");
    Ok((group, tensors))
}

fn augment(
    config: &HeadkinConfig,
    files: &[PathBuf],
    output: &Path,
    seed: u64,
    jobs: Option<usize>,
    as_json: bool,
) -> Result<(), CliError> {
    let augmenter = Augmenter::new(config.augment)?.with_filter(config.filter)?;

    let work = || -> Vec<PreprocessResult<(String, Vec<AugmentedTensor>)>> {
        files
            .par_iter()
            .enumerate()
            .map(|(i, path)| augment_file(&augmenter, config, path, file_seed(seed, i)))
            .collect()
    };
    let results = match jobs {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map_err(|e| CliError::Output(format!("thread pool: {}", e)))?
            .install(work),
        None => work(),
    };

    let mut store = JsonTensorStore::open(output)?;
    let mut written = Vec::new();
    let mut failures = Vec::new();
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok((group, tensors)) => {
                store.write_group(&group, &tensors)?;
                written.push(group);
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping file");
                failures.push((path, e));
            }
        }
    }
    store.save()?;

    if as_json {
        let failed: Vec<_> = failures
            .iter()
            .map(|(p, e)| json!({ "file": p, "error": e.to_string() }))
            .collect();
        print_json(&json!({ "output": output, "groups": written, "failed": failed }))?;
    } else {
        println!(
            "{} of {} files augmented -> {}",
            written.len(),
            files.len(),
            output.display()
        );
    }

    let failed = failures.len();
    match failures.into_iter().next() {
        None => Ok(()),
        Some((_, first)) => Err(CliError::Batch {
            failed,
            total: files.len(),
            first,
        }),
    }
}

fn load_acceleration(
    config: &HeadkinConfig,
    file: &Path,
) -> PreprocessResult<(KinematicProfile, TimeVector)> {
    let table = ImpactTable::from_path(file)?;
    let accel = table.profile_by_names(&config.columns.angular_acceleration)?;
    Ok((accel, table.time()?))
}

fn damage(
    config: &HeadkinConfig,
    file: &Path,
    method: Option<SolverMethod>,
    as_json: bool,
) -> Result<(), CliError> {
    let mut damage_config = config.damage;
    if let Some(m) = method {
        damage_config.method = m;
    }
    let integrator = damage_config.integrator()?;
    let (accel, time) = load_acceleration(config, file)?;
    let report = integrator.evaluate(&accel, &time)?;

    if as_json {
        print_json(&json!({
            "file": file,
            "solver": integrator.solver_name(),
            "damage": report.damage,
            "peak_index": report.peak_index,
            "peak_time": report.peak_time,
        }))
    } else {
        println!(
            "{}: DAMAGE = {:.6} (peak at t = {:.6} s, {})",
            file.display(),
            report.damage,
            report.peak_time,
            integrator.solver_name()
        );
        Ok(())
    }
}

fn ubric(config: &HeadkinConfig, file: &Path, as_json: bool) -> Result<(), CliError> {
    let scorer = config.ubric_scorer()?;
    let (accel, time) = load_acceleration(config, file)?;
    let features = scorer.evaluate(&accel, &time)?;

    if as_json {
        print_json(&json!({ "file": file, "features": features }))
    } else {
        println!("{}: UBrIC = {:.6}", file.display(), features.score);
        println!("  peak velocity     {:?} rad/s", features.peak_velocity);
        println!("  peak acceleration {:?} rad/s^2", features.peak_acceleration);
        println!("  terms             {:?}", features.terms);
        Ok(())
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{}", text);
    Ok(())
}
