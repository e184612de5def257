//! Event type definitions for progress reporting.

use crate::core::pipeline::Step;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Pipeline-level events
    Pipeline(PipelineEvent),
    /// Tree pruning events
    Prune(PruneEvent),
    /// Config emission events
    Config(ConfigEvent),
    /// External runner events
    Runner(RunnerEvent),
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started with the given step order
    Started { steps: Vec<Step> },
    /// A step is about to run
    StepStarted { step: Step },
    /// A step returned, successfully or not
    StepCompleted {
        step: Step,
        elapsed_ms: u64,
        succeeded: bool,
    },
    /// Every step ran
    Completed { summary: PipelineSummary },
    /// A step failed and halted the pipeline
    Error { message: String },
}

/// Events during the pruning step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PruneEvent {
    /// Pruning has started
    Started {
        total_tasks: usize,
        total_chunks: usize,
        pool_size: usize,
    },
    /// A chunk fully drained
    ChunkCompleted(ChunkProgress),
    /// A whole task failed and scored zero
    TaskFailed { index: usize, message: String },
    /// Pruning completed
    Completed {
        trees_pruned: usize,
        files_written: usize,
    },
}

/// Progress information after each pruning chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkProgress {
    /// Zero-based chunk number
    pub chunk: usize,
    /// Number of chunks in this run
    pub total_chunks: usize,
    /// Tasks finished so far
    pub tasks_done: usize,
    /// Total number of tasks
    pub total_tasks: usize,
    /// Trees pruned so far across all chunks
    pub trees_pruned: usize,
}

/// Events during config emission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConfigEvent {
    /// A config file was written
    Written { path: PathBuf },
    /// Emission completed
    Completed { total_configs: usize },
}

/// Events during external runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunnerEvent {
    /// Dispatch has started
    Started { total_configs: usize },
    /// A config finished and was moved
    Relocated {
        config: PathBuf,
        destination: PathBuf,
    },
    /// A launch or move failed; the config stays where it was
    Failed { config: PathBuf, message: String },
    /// Every dispatch returned
    Completed { relocated: usize, failed: usize },
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Number of steps executed
    pub steps_run: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}
