//! # Core Module
//!
//! The UI-agnostic pipeline engine.
//!
//! ## Modules
//! - `combinations` - Enumerates quartets and writes the task file
//! - `newick` - Parses, prunes and writes phylogenetic trees
//! - `pruning` - Prunes the tree collection per task on a worker pool
//! - `analysis_config` - Writes one analysis config per pruned-tree file
//! - `runner` - Launches the external analysis and relocates finished configs
//! - `pipeline` - Sequences the steps
//! - `pool` - Sizes and builds worker pools

pub mod analysis_config;
pub mod combinations;
pub mod newick;
pub mod pipeline;
pub mod pool;
pub mod pruning;
pub mod runner;

// Re-export commonly used types
pub use analysis_config::{AnalysisParameters, ConfigEmitter, ConfigRecord};
pub use combinations::CombinationTask;
pub use pipeline::{Pipeline, PipelineResult, Step};
pub use pruning::{PruneReport, PruningPool, TaskOutcome};
pub use runner::{ExternalRunner, Launcher, RunReport};
