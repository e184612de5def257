//! # Runner Module
//!
//! Drives the external analysis tool over every config file on a fixed-size
//! pool and moves each finished config into the finished directory.
//!
//! A config is dispatched at most once per run, and so is a file name: two
//! configs with the same name in different subdirectories would relocate to
//! the same finished path, so only the first by path runs and the other waits
//! for a later run. After a run every config is either still in its original
//! place (skipped, launch or move failed) or in the finished directory.

mod launcher;
mod relocate;

pub use launcher::{Launcher, ProcessLauncher};
pub use relocate::relocate;

use crate::core::analysis_config::CONFIG_FILE_PREFIX;
use crate::core::pool::{build_pool, effective_pool_size};
use crate::core::pruning::{DEFAULT_POOL_SIZE, PRUNED_FILE_PREFIX};
use crate::error::{InvocationError, Result};
use crate::events::{null_sender, Event, EventSender, RunnerEvent};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Config files below `config_dir`, skipping anything inside `finished_dir`.
///
/// Matches files named `run_out_subtree*`, sorted by path.
pub fn discover_configs(config_dir: &Path, finished_dir: &Path) -> Vec<PathBuf> {
    let prefix = format!("{}{}", CONFIG_FILE_PREFIX, PRUNED_FILE_PREFIX);
    let finished = fs::canonicalize(finished_dir).ok();
    let root = fs::canonicalize(config_dir).unwrap_or_else(|_| config_dir.to_path_buf());

    let mut configs: Vec<PathBuf> = WalkDir::new(&root)
        .into_iter()
        .filter_entry(|entry| finished.as_deref() != Some(entry.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .map(|entry| entry.into_path())
        .collect();
    configs.sort();
    configs
}

/// A config whose run or relocation failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRun {
    pub config: PathBuf,
    pub message: String,
}

/// Result of an external run batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Configs handed to the pool
    pub dispatched: usize,
    /// New locations of relocated configs
    pub relocated: Vec<PathBuf>,
    /// Configs left in place
    pub failed: Vec<FailedRun>,
}

/// Runs the analysis for each config on a dedicated pool
pub struct ExternalRunner {
    launcher: Arc<dyn Launcher>,
    finished_dir: PathBuf,
    pool_size: usize,
}

impl ExternalRunner {
    pub fn new(launcher: Arc<dyn Launcher>, finished_dir: impl Into<PathBuf>) -> Self {
        Self {
            launcher,
            finished_dir: finished_dir.into(),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    /// Requested workers, clamped to available parallelism
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn run(&self, configs: &[PathBuf]) -> Result<RunReport> {
        self.run_with_events(configs, &null_sender())
    }

    /// Launch every config once and wait for all of them to return
    pub fn run_with_events(&self, configs: &[PathBuf], events: &EventSender) -> Result<RunReport> {
        let pool_size = effective_pool_size(self.pool_size)?;
        let mut configs = configs.to_vec();
        configs.sort();
        configs.dedup();

        let mut names = HashSet::new();
        let mut skipped = Vec::new();
        configs.retain(|config| {
            let name = config.file_name().map(|n| n.to_os_string());
            if names.insert(name) {
                return true;
            }
            skipped.push(config.clone());
            false
        });

        info!(configs = configs.len(), pool_size, "Dispatching external runs");
        events.send(Event::Runner(RunnerEvent::Started {
            total_configs: configs.len() + skipped.len(),
        }));

        let mut report = RunReport::default();
        for config in skipped {
            warn!(config = %config.display(), "Skipping config with a duplicate file name");
            let message = format!(
                "another config named {} is dispatched in this run",
                config.file_name().unwrap_or_default().to_string_lossy()
            );
            events.send(Event::Runner(RunnerEvent::Failed {
                config: config.clone(),
                message: message.clone(),
            }));
            report.failed.push(FailedRun { config, message });
        }

        let pool = build_pool(pool_size, "external-worker")?;
        let outcomes: Vec<(PathBuf, std::result::Result<PathBuf, InvocationError>)> =
            pool.install(|| {
                configs
                    .par_iter()
                    .map(|config| (config.clone(), self.run_one(config)))
                    .collect()
            });

        report.dispatched = configs.len();
        for (config, outcome) in outcomes {
            match outcome {
                Ok(destination) => {
                    events.send(Event::Runner(RunnerEvent::Relocated {
                        config,
                        destination: destination.clone(),
                    }));
                    report.relocated.push(destination);
                }
                Err(e) => {
                    events.send(Event::Runner(RunnerEvent::Failed {
                        config: config.clone(),
                        message: e.to_string(),
                    }));
                    report.failed.push(FailedRun {
                        config,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            relocated = report.relocated.len(),
            failed = report.failed.len(),
            "External runs finished"
        );
        events.send(Event::Runner(RunnerEvent::Completed {
            relocated: report.relocated.len(),
            failed: report.failed.len(),
        }));
        Ok(report)
    }

    fn run_one(&self, config: &Path) -> std::result::Result<PathBuf, InvocationError> {
        let result = self.launcher.launch(config).and_then(|()| {
            info!(config = %config.display(), "Processed");
            relocate(config, &self.finished_dir).map_err(|source| InvocationError::Relocate {
                config: config.to_path_buf(),
                finished_dir: self.finished_dir.clone(),
                source,
            })
        });
        match &result {
            Ok(destination) => {
                info!(from = %config.display(), to = %destination.display(), "Moved")
            }
            Err(e) => error!(config = %config.display(), error = %e, "Processing failed"),
        }
        result
    }
}
