//! Pipeline execution implementation.

use super::step::Step;
use super::timer::{format_duration, StepTimer};
use crate::core::analysis_config::{AnalysisParameters, ConfigEmitter, EmitReport};
use crate::core::combinations::{generate_combinations, read_species_list};
use crate::core::pruning::{
    PruneConfig, PruneReport, PruningPool, DEFAULT_CHUNK_SIZE, DEFAULT_POOL_SIZE,
};
use crate::core::runner::{discover_configs, ExternalRunner, Launcher, ProcessLauncher, RunReport};
use crate::error::{ConfigError, PipelineError};
use crate::events::{null_sender, Event, EventSender, PipelineEvent, PipelineSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Default task file, relative to the working directory
pub const DEFAULT_TASK_FILE: &str = "temp_combinations.txt";

/// Default interpreter for the external analysis script
pub const DEFAULT_TOOL: &str = "python";

/// What a single step produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutcome {
    Combinations { count: usize },
    Pruned(PruneReport),
    Configs(EmitReport),
    External(RunReport),
}

/// Timing and outcome of one executed step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub step: Step,
    pub elapsed_ms: u64,
    pub outcome: StepOutcome,
}

/// Result of pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub started_at: DateTime<Utc>,
    /// Executed steps in run order
    pub steps: Vec<StepReport>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Steps to run, in order
    pub steps: Vec<Step>,
    /// Outgroup appended to every combination
    pub outgroup: String,
    /// Species list, one taxon per line
    pub species_list: Option<PathBuf>,
    /// Task file shared by the combination and pruning steps
    pub task_file: PathBuf,
    /// Tree collection to prune
    pub tree_file: Option<PathBuf>,
    /// Pruned-tree directory
    pub pruned_tree_dir: Option<PathBuf>,
    /// Base directory for configs and analysis output
    pub output_base: Option<PathBuf>,
    /// Interpreter launched for each config
    pub tool: OsString,
    /// Analysis script passed to the tool
    pub script: Option<PathBuf>,
    /// Destination of configs whose run completed
    pub finished_dir: Option<PathBuf>,
    /// Requested workers per pool (clamped to hardware)
    pub pool_size: usize,
    /// Pruning tasks per chunk
    pub chunk_size: usize,
    /// Hyperparameters written into every config
    pub parameters: AnalysisParameters,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            outgroup: String::new(),
            species_list: None,
            task_file: PathBuf::from(DEFAULT_TASK_FILE),
            tree_file: None,
            pruned_tree_dir: None,
            output_base: None,
            tool: OsString::from(DEFAULT_TOOL),
            script: None,
            finished_dir: None,
            pool_size: DEFAULT_POOL_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            parameters: AnalysisParameters::default(),
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    launcher: Option<Arc<dyn Launcher>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            launcher: None,
        }
    }

    /// Steps to run, in the given order
    pub fn steps(mut self, steps: Vec<Step>) -> Self {
        self.config.steps = steps;
        self
    }

    pub fn outgroup(mut self, outgroup: impl Into<String>) -> Self {
        self.config.outgroup = outgroup.into();
        self
    }

    pub fn species_list(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.species_list = Some(path.into());
        self
    }

    pub fn task_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.task_file = path.into();
        self
    }

    pub fn tree_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tree_file = Some(path.into());
        self
    }

    pub fn pruned_tree_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pruned_tree_dir = Some(path.into());
        self
    }

    pub fn output_base(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_base = Some(path.into());
        self
    }

    pub fn tool(mut self, tool: impl Into<OsString>) -> Self {
        self.config.tool = tool.into();
        self
    }

    pub fn script(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.script = Some(path.into());
        self
    }

    pub fn finished_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.finished_dir = Some(path.into());
        self
    }

    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.config.pool_size = pool_size;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    pub fn parameters(mut self, parameters: AnalysisParameters) -> Self {
        self.config.parameters = parameters;
        self
    }

    /// Replace the process launcher used by `run_external`
    ///
    /// With a custom launcher the script path is no longer required.
    pub fn launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            launcher: self.launcher,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The staged incongruence pipeline
pub struct Pipeline {
    config: PipelineConfig,
    launcher: Option<Arc<dyn Launcher>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<PipelineResult, PipelineError> {
        self.run_with_events(&null_sender())
    }

    /// Run the selected steps in order with event reporting.
    ///
    /// The first failing step halts the run; steps before it keep their
    /// on-disk output.
    pub fn run_with_events(&self, events: &EventSender) -> Result<PipelineResult, PipelineError> {
        let start_time = Instant::now();
        let started_at = Utc::now();
        let mut steps = Vec::with_capacity(self.config.steps.len());

        events.send(Event::Pipeline(PipelineEvent::Started {
            steps: self.config.steps.clone(),
        }));

        for &step in &self.config.steps {
            events.send(Event::Pipeline(PipelineEvent::StepStarted { step }));

            let timer = StepTimer::start(format!("STEP: {}", step.as_str().to_uppercase()));
            let result = self.run_step(step, events);
            let elapsed_ms = timer.elapsed().as_millis() as u64;
            drop(timer);

            events.send(Event::Pipeline(PipelineEvent::StepCompleted {
                step,
                elapsed_ms,
                succeeded: result.is_ok(),
            }));

            match result {
                Ok(outcome) => steps.push(StepReport {
                    step,
                    elapsed_ms,
                    outcome,
                }),
                Err(e) => {
                    error!(%step, error = %e, "Pipeline halted");
                    events.send(Event::Pipeline(PipelineEvent::Error {
                        message: e.to_string(),
                    }));
                    return Err(e);
                }
            }
        }

        let elapsed = start_time.elapsed();
        info!(
            "TOTAL PIPELINE TIME: {:.2}s ({})",
            elapsed.as_secs_f64(),
            format_duration(elapsed)
        );
        let duration_ms = elapsed.as_millis() as u64;
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                steps_run: steps.len(),
                duration_ms,
            },
        }));

        Ok(PipelineResult {
            started_at,
            steps,
            duration_ms,
        })
    }

    fn run_step(&self, step: Step, events: &EventSender) -> Result<StepOutcome, PipelineError> {
        let config = &self.config;
        match step {
            Step::GenerateCombinations => {
                let species_list = require(&config.species_list, step, "a species list file")?;
                let outgroup = require_outgroup(&config.outgroup)?;
                let species = read_species_list(species_list)?;
                let count = generate_combinations(&species, outgroup, &config.task_file)?;
                Ok(StepOutcome::Combinations { count })
            }
            Step::PruneTrees => {
                let tree_file = require(&config.tree_file, step, "a tree file")?;
                let pruned_dir = require(&config.pruned_tree_dir, step, "a pruned-tree directory")?;
                let prune = PruneConfig {
                    task_file: config.task_file.clone(),
                    tree_file: tree_file.to_path_buf(),
                    output_dir: pruned_dir.to_path_buf(),
                    pool_size: config.pool_size,
                    chunk_size: config.chunk_size,
                };
                let report = PruningPool::new(prune).run_with_events(events)?;
                Ok(StepOutcome::Pruned(report))
            }
            Step::GenerateConfig => {
                let pruned_dir = require(&config.pruned_tree_dir, step, "a pruned-tree directory")?;
                let output_base = require(&config.output_base, step, "an output base directory")?;
                let outgroup = require_outgroup(&config.outgroup)?;
                let report = ConfigEmitter::new(pruned_dir, output_base, outgroup)
                    .with_parameters(config.parameters.clone())
                    .emit_with_events(events)?;
                Ok(StepOutcome::Configs(report))
            }
            Step::RunExternal => {
                let output_base = require(&config.output_base, step, "an output base directory")?;
                let finished_dir = require(&config.finished_dir, step, "a finished directory")?;
                let launcher: Arc<dyn Launcher> = match &self.launcher {
                    Some(launcher) => Arc::clone(launcher),
                    None => {
                        let script = require(&config.script, step, "an analysis script path")?;
                        Arc::new(ProcessLauncher::new(config.tool.clone()).with_script(script))
                    }
                };
                let configs = discover_configs(output_base, finished_dir);
                let report = ExternalRunner::new(launcher, finished_dir)
                    .pool_size(config.pool_size)
                    .run_with_events(&configs, events)?;
                Ok(StepOutcome::External(report))
            }
        }
    }
}

fn require<'a>(
    value: &'a Option<PathBuf>,
    step: Step,
    parameter: &'static str,
) -> Result<&'a Path, ConfigError> {
    value.as_deref().ok_or(ConfigError::MissingParameter {
        step: step.as_str(),
        parameter,
    })
}

fn require_outgroup(outgroup: &str) -> Result<&str, ConfigError> {
    if outgroup.trim().is_empty() {
        return Err(ConfigError::EmptyOutgroup);
    }
    Ok(outgroup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventChannel;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn builder_sets_defaults() {
        let pipeline = Pipeline::builder()
            .outgroup("O")
            .steps(vec![Step::GenerateCombinations])
            .build();

        assert_eq!(pipeline.config().chunk_size, 100);
        assert_eq!(pipeline.config().pool_size, 4);
        assert_eq!(pipeline.config().task_file, PathBuf::from("temp_combinations.txt"));
    }

    #[test]
    fn missing_parameter_halts_before_the_step_runs() {
        let temp = TempDir::new().unwrap();
        let task_file = temp.path().join("tasks.txt");
        let pipeline = Pipeline::builder()
            .outgroup("O")
            .task_file(&task_file)
            .steps(vec![Step::GenerateCombinations])
            .build();

        let err = pipeline.run().unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::MissingParameter {
                step: "generate_combinations",
                ..
            })
        ));
        assert!(!task_file.exists());
    }

    #[test]
    fn later_step_failure_keeps_earlier_output() {
        let temp = TempDir::new().unwrap();
        let species = temp.path().join("species.txt");
        fs::write(&species, "A\nB\nC\nD\n").unwrap();
        let task_file = temp.path().join("tasks.txt");

        let (sender, receiver) = EventChannel::new();
        let result = Pipeline::builder()
            .outgroup("O")
            .species_list(&species)
            .task_file(&task_file)
            .steps(vec![Step::GenerateCombinations, Step::PruneTrees])
            .build()
            .run_with_events(&sender);
        drop(sender);

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&task_file).unwrap().lines().count(), 4);

        let completed: Vec<(Step, bool)> = receiver
            .iter()
            .filter_map(|e| match e {
                Event::Pipeline(PipelineEvent::StepCompleted {
                    step, succeeded, ..
                }) => Some((step, succeeded)),
                _ => None,
            })
            .collect();
        assert_eq!(
            completed,
            vec![(Step::GenerateCombinations, true), (Step::PruneTrees, false)]
        );
    }

    #[test]
    fn steps_run_in_the_given_order() {
        let temp = TempDir::new().unwrap();
        let pruned = temp.path().join("pruned");
        fs::create_dir_all(&pruned).unwrap();
        fs::write(pruned.join("out_subtree_1.txt"), "(A:1,B:1,C:1,O:1);\n").unwrap();

        let result = Pipeline::builder()
            .outgroup("O")
            .pruned_tree_dir(&pruned)
            .output_base(temp.path().join("configs"))
            .steps(vec![Step::GenerateConfig, Step::GenerateConfig])
            .build()
            .run()
            .unwrap();

        let order: Vec<Step> = result.steps.iter().map(|s| s.step).collect();
        assert_eq!(order, vec![Step::GenerateConfig, Step::GenerateConfig]);
    }

    #[test]
    fn run_external_requires_a_script_without_custom_launcher() {
        let temp = TempDir::new().unwrap();
        let err = Pipeline::builder()
            .outgroup("O")
            .output_base(temp.path())
            .finished_dir(temp.path().join("finished"))
            .steps(vec![Step::RunExternal])
            .build()
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("analysis script"));
    }
}
