//! # Pipeline Module
//!
//! Runs a caller-selected sequence of steps.
//!
//! ## Steps
//! 1. **generate_combinations** - species list to quartet task file
//! 2. **prune_trees** - task file and tree collection to pruned-tree files
//! 3. **generate_config** - pruned-tree files to analysis configs
//! 4. **run_external** - configs to external analysis runs
//!
//! Steps run in the order given, not in the order above, so a partially
//! failed run can be resumed by naming only the remaining steps. Every
//! hand-off goes through the filesystem.

mod executor;
mod step;
mod timer;

pub use executor::{
    Pipeline, PipelineBuilder, PipelineConfig, PipelineResult, StepOutcome, StepReport,
    DEFAULT_TASK_FILE, DEFAULT_TOOL,
};
pub use step::Step;
pub use timer::{format_duration, StepTimer};
