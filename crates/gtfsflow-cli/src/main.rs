//! gtfsflow CLI: run, validate and explain YAML pipeline definitions.

mod logging;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use gtfsflow_core::config::EngineConfig;
use gtfsflow_exec::{ExecError, Execution, PipelineDef, RunReport, TaskOutcome};

#[derive(Parser)]
#[command(name = "gtfsflow")]
#[command(about = "Pipeline engine for transforming GTFS feeds", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline definition
    Run {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Rows per committed transaction (overrides config)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a pipeline definition without running it
    Validate {
        #[arg(short, long)]
        pipeline: PathBuf,
    },

    /// Show the steps a pipeline definition would run
    Explain {
        #[arg(short, long)]
        pipeline: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let result = match cli.command {
        Commands::Run {
            pipeline,
            batch_size,
            json,
        } => run_pipeline(&pipeline, batch_size, json),
        Commands::Validate { pipeline } => {
            PipelineDef::from_path(&pipeline).map(|_| println!("pipeline is valid"))
        }
        Commands::Explain { pipeline } => explain_pipeline(&pipeline),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        for hint in e.suggestions() {
            eprintln!("  hint: {hint}");
        }
        std::process::exit(1);
    }
}

fn run_pipeline(path: &Path, batch_size: Option<usize>, json: bool) -> Result<(), ExecError> {
    tracing::debug!(path = %path.display(), "loading pipeline definition");
    let mut def = PipelineDef::from_path(path)?;
    if batch_size.is_some() {
        def.batch_size = batch_size;
        def.validate()?;
    }
    let config = EngineConfig::from_env();

    let execution = def.execute(&config)?;
    if json {
        let out = serde_json::to_string_pretty(&execution)
            .map_err(|e| ExecError::Dsl(format!("report serialization: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    match &execution {
        Execution::Single { run } => print_run("pipeline", run),
        Execution::Merged { merge, export } => {
            for ds in &merge.datasets {
                if let Some(run) = &ds.run {
                    print_run(&format!("dataset {}", ds.prefix), run);
                }
                let rows: u64 = ds.tables.iter().map(|t| t.rows_inserted).sum();
                println!("  merged {rows} rows");
            }
            if let Some(run) = export {
                print_run("export", run);
            }
        }
    }
    Ok(())
}

fn print_run(label: &str, run: &RunReport) {
    println!(
        "{label}: {} tasks in {}ms (run {}, hash {})",
        run.tasks.len(),
        run.duration.as_millis(),
        run.run_id,
        &run.pipeline_hash[..12.min(run.pipeline_hash.len())]
    );
    for t in &run.tasks {
        match &t.outcome {
            TaskOutcome::Completed => {
                println!("  #{} {} {}ms", t.index + 1, t.id, t.duration.as_millis());
            }
            TaskOutcome::SkippedAfterFailure(msg) => {
                println!("  #{} {} skipped: {msg}", t.index + 1, t.id);
            }
        }
    }
}

fn explain_pipeline(path: &Path) -> Result<(), ExecError> {
    let def = PipelineDef::from_path(path)?;
    let config = def.engine_config(&EngineConfig::from_env());
    println!("batch size: {}", config.batch_size);
    for line in def.explain() {
        println!("{line}");
    }
    Ok(())
}
