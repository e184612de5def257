//! # Pruning Module
//!
//! Restricts a tree collection to each task's quartet on a fixed-size pool.
//!
//! ## Scheduling
//! Tasks are submitted in chunks. A chunk fully drains before the next one is
//! submitted, and one progress entry is logged per chunk. Within a chunk
//! tasks complete in any order.
//!
//! ## Failures
//! - A tree that cannot be restricted is skipped and counted
//! - A task whose collection cannot be read scores zero
//!
//! Neither stops the other tasks.

mod worker;

pub use worker::prune_task;

use crate::core::combinations::read_task_lines;
use crate::core::pool::{build_pool, effective_pool_size};
use crate::error::{ConfigError, Result};
use crate::events::{null_sender, ChunkProgress, Event, EventSender, PruneEvent};
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{error, info};

/// Default number of tasks submitted per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Default number of pool workers before clamping
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Prefix shared by every pruned-tree file
pub const PRUNED_FILE_PREFIX: &str = "out_subtree_";

/// File name of the pruned trees for a task
pub fn pruned_file_name(index: usize) -> String {
    format!("{}{}.txt", PRUNED_FILE_PREFIX, index)
}

/// Recover the task index from a pruned-tree file name
pub fn parse_task_index(file_name: &str) -> Option<usize> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"^out_subtree_(\d+)\.txt$").expect("valid pattern"));
    pattern
        .captures(file_name)
        .and_then(|caps| caps[1].parse().ok())
}

/// Configuration for a pruning run
#[derive(Debug, Clone)]
pub struct PruneConfig {
    /// Task file written by the combination step
    pub task_file: PathBuf,
    /// Tree collection, one Newick tree per line
    pub tree_file: PathBuf,
    /// Directory receiving `out_subtree_<index>.txt` files
    pub output_dir: PathBuf,
    /// Requested workers, clamped to available parallelism
    pub pool_size: usize,
    /// Tasks per chunk
    pub chunk_size: usize,
}

impl PruneConfig {
    pub fn new(
        task_file: impl Into<PathBuf>,
        tree_file: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            task_file: task_file.into(),
            tree_file: tree_file.into(),
            output_dir: output_dir.into(),
            pool_size: DEFAULT_POOL_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Result of pruning one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Task index (line number in the task file)
    pub index: usize,
    /// Trees restricted and written
    pub trees_pruned: usize,
    /// Trees dropped because they could not be restricted
    pub trees_skipped: usize,
    /// Written file, absent when no tree survived
    pub output: Option<PathBuf>,
    /// Set when the whole task failed
    pub error: Option<String>,
}

impl TaskOutcome {
    fn failed(index: usize, message: String) -> Self {
        Self {
            index,
            trees_pruned: 0,
            trees_skipped: 0,
            output: None,
            error: Some(message),
        }
    }
}

/// Aggregate result of a pruning run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruneReport {
    pub total_tasks: usize,
    pub trees_pruned: usize,
    pub trees_skipped: usize,
    pub tasks_failed: usize,
    pub files_written: usize,
    pub chunks: usize,
    pub pool_size: usize,
    /// Per-task outcomes in task-file order
    pub outcomes: Vec<TaskOutcome>,
}

impl PruneReport {
    fn absorb(&mut self, outcome: TaskOutcome) {
        self.trees_pruned += outcome.trees_pruned;
        self.trees_skipped += outcome.trees_skipped;
        if outcome.error.is_some() {
            self.tasks_failed += 1;
        }
        if outcome.output.is_some() {
            self.files_written += 1;
        }
        self.outcomes.push(outcome);
    }
}

/// Chunked pruning over a dedicated worker pool
pub struct PruningPool {
    config: PruneConfig,
}

impl PruningPool {
    pub fn new(config: PruneConfig) -> Self {
        Self { config }
    }

    /// Run without progress events
    pub fn run(&self) -> Result<PruneReport> {
        self.run_with_events(&null_sender())
    }

    /// Run every task, reporting progress after each chunk
    pub fn run_with_events(&self, events: &EventSender) -> Result<PruneReport> {
        let config = &self.config;
        if config.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize.into());
        }
        let pool_size = effective_pool_size(config.pool_size)?;
        let lines = read_task_lines(&config.task_file)?;
        let pool = build_pool(pool_size, "prune-worker")?;

        let total_tasks = lines.len();
        let total_chunks = total_tasks.div_ceil(config.chunk_size);

        info!(
            tasks = total_tasks,
            chunks = total_chunks,
            pool_size,
            tree_file = %config.tree_file.display(),
            "Pruning started"
        );
        events.send(Event::Prune(PruneEvent::Started {
            total_tasks,
            total_chunks,
            pool_size,
        }));

        let mut report = PruneReport {
            total_tasks,
            pool_size,
            ..Default::default()
        };

        for (chunk, tasks) in lines.chunks(config.chunk_size).enumerate() {
            let outcomes: Vec<TaskOutcome> = pool.install(|| {
                tasks
                    .par_iter()
                    .map(|(index, line)| {
                        match prune_task(*index, line, &config.tree_file, &config.output_dir) {
                            Ok(outcome) => outcome,
                            Err(e) => {
                                error!(task = index, error = %e, "Critical error");
                                events.send(Event::Prune(PruneEvent::TaskFailed {
                                    index: *index,
                                    message: e.to_string(),
                                }));
                                TaskOutcome::failed(*index, e.to_string())
                            }
                        }
                    })
                    .collect()
            });

            for outcome in outcomes {
                report.absorb(outcome);
            }
            report.chunks += 1;

            info!(
                chunk,
                tasks_done = report.outcomes.len(),
                "Processed chunk {} ({} trees)",
                chunk,
                report.trees_pruned
            );
            events.send(Event::Prune(PruneEvent::ChunkCompleted(ChunkProgress {
                chunk,
                total_chunks,
                tasks_done: report.outcomes.len(),
                total_tasks,
                trees_pruned: report.trees_pruned,
            })));
        }

        info!(
            skipped = report.trees_skipped,
            failed_tasks = report.tasks_failed,
            files = report.files_written,
            "Total pruned trees: {}",
            report.trees_pruned
        );
        events.send(Event::Prune(PruneEvent::Completed {
            trees_pruned: report.trees_pruned,
            files_written: report.files_written,
        }));

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::combinations::generate_combinations;
    use crate::events::EventChannel;
    use std::fs;
    use tempfile::TempDir;

    fn species(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("T{i}")).collect()
    }

    fn star_tree(taxa: &[String]) -> String {
        let leaves: Vec<String> = taxa.iter().map(|t| format!("{t}:1")).collect();
        format!("({});", leaves.join(","))
    }

    #[test]
    fn file_names_round_trip_to_indices() {
        assert_eq!(pruned_file_name(42), "out_subtree_42.txt");
        assert_eq!(parse_task_index("out_subtree_42.txt"), Some(42));
        assert_eq!(parse_task_index("run_out_subtree_42.txt"), None);
        assert_eq!(parse_task_index("out_subtree_42.txt.csv"), None);
        assert_eq!(parse_task_index("out_subtree_.txt"), None);
    }

    #[test]
    fn one_progress_entry_per_chunk() {
        let dir = TempDir::new().unwrap();
        let names = species(7);
        let task_file = dir.path().join("tasks.txt");
        let count = generate_combinations(&names, "O", &task_file).unwrap();
        assert_eq!(count, 35);

        let mut all = names.clone();
        all.push("O".to_string());
        let tree_file = dir.path().join("trees.nwk");
        fs::write(&tree_file, format!("{}\n", star_tree(&all))).unwrap();

        let mut config = PruneConfig::new(&task_file, &tree_file, dir.path().join("pruned"));
        config.chunk_size = 10;
        config.pool_size = 3;

        let (sender, receiver) = EventChannel::new();
        let report = PruningPool::new(config).run_with_events(&sender).unwrap();
        drop(sender);

        let chunk_events: Vec<ChunkProgress> = receiver
            .iter()
            .filter_map(|e| match e {
                Event::Prune(PruneEvent::ChunkCompleted(p)) => Some(p),
                _ => None,
            })
            .collect();

        assert_eq!(report.chunks, 4);
        assert_eq!(chunk_events.len(), 4);
        assert_eq!(chunk_events.last().unwrap().tasks_done, 35);
        assert_eq!(report.trees_pruned, 35);
        assert_eq!(report.files_written, 35);
    }

    #[test]
    fn missing_collection_scores_zero_without_aborting() {
        let dir = TempDir::new().unwrap();
        let task_file = dir.path().join("tasks.txt");
        generate_combinations(&species(4), "O", &task_file).unwrap();

        let config = PruneConfig::new(&task_file, dir.path().join("absent.nwk"), dir.path());
        let report = PruningPool::new(config).run().unwrap();

        assert_eq!(report.total_tasks, 4);
        assert_eq!(report.tasks_failed, 4);
        assert_eq!(report.trees_pruned, 0);
        assert!(report.outcomes.iter().all(|o| o.error.is_some()));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = PruneConfig::new(dir.path().join("t"), dir.path().join("x"), dir.path());
        config.chunk_size = 0;
        assert!(PruningPool::new(config).run().is_err());
    }

    #[test]
    fn outcomes_keep_task_file_order() {
        let dir = TempDir::new().unwrap();
        let task_file = dir.path().join("tasks.txt");
        generate_combinations(&species(6), "O", &task_file).unwrap();
        let tree_file = dir.path().join("trees.nwk");
        fs::write(&tree_file, "(T0:1,T1:1,T2:1,O:1);\n").unwrap();

        let mut config = PruneConfig::new(&task_file, &tree_file, dir.path().join("out"));
        config.chunk_size = 3;
        let report = PruningPool::new(config).run().unwrap();

        let indices: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, (1..=20).collect::<Vec<_>>());
        assert_eq!(report.files_written, 1);
        assert!(dir.path().join("out").join("out_subtree_1.txt").exists());
    }
}
