//! # CLI Module
//!
//! Command-line interface for the incongruence pipeline.
//!
//! ## Usage
//! ```bash
//! # Everything, start to finish
//! phylo-pipeline run --outgroup Out --steps generate_combinations prune_trees \
//!     generate_config run_external --species-list species.txt --tree-file trees.nwk \
//!     --pruned-tree-dir pruned --output-base configs --script QuIBL.py \
//!     --finished-dir finished
//!
//! # Resume after a failed external run
//! phylo-pipeline run --outgroup Out --steps run_external --output-base configs \
//!     --script QuIBL.py --finished-dir finished
//!
//! # JSON summary for scripting
//! phylo-pipeline run --outgroup Out --steps generate_config --pruned-tree-dir pruned \
//!     --output-base configs --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use phylo_pipeline::core::pipeline::{
    format_duration, Pipeline, PipelineResult, Step, StepOutcome, DEFAULT_TASK_FILE, DEFAULT_TOOL,
};
use phylo_pipeline::core::pruning::{DEFAULT_CHUNK_SIZE, DEFAULT_POOL_SIZE};
use phylo_pipeline::error::{ConfigError, Result};
use phylo_pipeline::events::{Event, EventChannel, PipelineEvent, PruneEvent, RunnerEvent};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Phylo Pipeline - quartet pruning and incongruence analysis runs
#[derive(Parser, Debug)]
#[command(name = "phylo-pipeline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the selected pipeline steps in order
    Run {
        /// Outgroup appended to every combination
        #[arg(long, required = true)]
        outgroup: String,

        /// Steps to run, in order
        #[arg(long, required = true, num_args = 1.., value_parser = parse_step)]
        steps: Vec<Step>,

        /// Species list, one taxon per line
        #[arg(long)]
        species_list: Option<PathBuf>,

        /// Tree collection, one Newick tree per line
        #[arg(long)]
        tree_file: Option<PathBuf>,

        /// Directory for pruned-tree files
        #[arg(long)]
        pruned_tree_dir: Option<PathBuf>,

        /// Base directory for configs and analysis output
        #[arg(long)]
        output_base: Option<PathBuf>,

        /// Interpreter that runs the analysis script
        #[arg(long, default_value = DEFAULT_TOOL)]
        tool: String,

        /// Analysis script passed to the tool
        #[arg(long)]
        script: Option<PathBuf>,

        /// Destination for configs whose run completed
        #[arg(long)]
        finished_dir: Option<PathBuf>,

        /// Worker pool size (clamped to available cores)
        #[arg(long, default_value_t = DEFAULT_POOL_SIZE)]
        pool_size: usize,

        /// Pruning tasks submitted per chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Task file written and read by the first two steps
        #[arg(long, default_value = DEFAULT_TASK_FILE)]
        task_file: PathBuf,

        /// Append-only log file
        #[arg(long, default_value = "pipeline_analysis.log")]
        log_file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary with colors
    Pretty,
    /// JSON report for scripting
    Json,
}

fn parse_step(value: &str) -> std::result::Result<Step, String> {
    value.parse().map_err(|e: ConfigError| e.to_string())
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            outgroup,
            steps,
            species_list,
            tree_file,
            pruned_tree_dir,
            output_base,
            tool,
            script,
            finished_dir,
            pool_size,
            chunk_size,
            task_file,
            log_file,
            output,
        } => {
            phylo_pipeline::init_tracing(Some(&log_file))?;

            let mut builder = Pipeline::builder()
                .outgroup(outgroup)
                .steps(steps)
                .tool(tool)
                .pool_size(pool_size)
                .chunk_size(chunk_size)
                .task_file(task_file);
            if let Some(path) = species_list {
                builder = builder.species_list(path);
            }
            if let Some(path) = tree_file {
                builder = builder.tree_file(path);
            }
            if let Some(path) = pruned_tree_dir {
                builder = builder.pruned_tree_dir(path);
            }
            if let Some(path) = output_base {
                builder = builder.output_base(path);
            }
            if let Some(path) = script {
                builder = builder.script(path);
            }
            if let Some(path) = finished_dir {
                builder = builder.finished_dir(path);
            }

            run_pipeline(builder.build(), output)
        }
    }
}

fn run_pipeline(pipeline: Pipeline, output: OutputFormat) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(output, OutputFormat::Pretty);

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Phylo Pipeline").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let (sender, receiver) = EventChannel::new();

    let progress = if pretty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            for _ in receiver.iter() {}
            return;
        };
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::StepStarted { step }) => {
                    pb.set_position(0);
                    pb.set_length(0);
                    pb.set_message(step.to_string());
                }
                Event::Prune(PruneEvent::Started { total_tasks, .. }) => {
                    pb.set_length(total_tasks as u64);
                }
                Event::Prune(PruneEvent::ChunkCompleted(p)) => {
                    pb.set_position(p.tasks_done as u64);
                    pb.set_message(format!("prune_trees ({} trees)", p.trees_pruned));
                }
                Event::Runner(RunnerEvent::Started { total_configs }) => {
                    pb.set_length(total_configs as u64);
                }
                Event::Runner(RunnerEvent::Relocated { .. } | RunnerEvent::Failed { .. }) => {
                    pb.inc(1);
                }
                Event::Pipeline(PipelineEvent::Completed { .. } | PipelineEvent::Error { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(&sender);

    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let result = result?;
    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &result),
        OutputFormat::Json => print_json_results(&result),
    }
    Ok(())
}

fn print_pretty_results(term: &Term, result: &PipelineResult) {
    term.write_line(&format!("{} Pipeline Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    for report in &result.steps {
        let seconds = report.elapsed_ms as f64 / 1000.0;
        let summary = match &report.outcome {
            StepOutcome::Combinations { count } => {
                format!("{} combinations", style(count).cyan())
            }
            StepOutcome::Pruned(p) => format!(
                "{} trees pruned, {} skipped, {} files, {} failed tasks",
                style(p.trees_pruned).cyan(),
                p.trees_skipped,
                p.files_written,
                if p.tasks_failed > 0 {
                    style(p.tasks_failed).red()
                } else {
                    style(p.tasks_failed).dim()
                }
            ),
            StepOutcome::Configs(c) => format!("{} configs", style(c.configs.len()).cyan()),
            StepOutcome::External(r) => format!(
                "{} relocated, {} left for retry",
                style(r.relocated.len()).cyan(),
                if r.failed.is_empty() {
                    style(r.failed.len()).dim()
                } else {
                    style(r.failed.len()).yellow()
                }
            ),
        };
        term.write_line(&format!(
            "  {:<22} {}  {}",
            style(report.step).bold(),
            summary,
            style(format!("{:.2}s", seconds)).dim()
        ))
        .ok();
    }

    term.write_line("").ok();
    term.write_line(&format!(
        "Pipeline completed in {}",
        style(format_duration(Duration::from_millis(result.duration_ms))).yellow()
    ))
    .ok();
}

fn print_json_results(result: &PipelineResult) {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize report: {}", e),
    }
}
