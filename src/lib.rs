//! # Phylo Pipeline
//!
//! A staged phylogenetic incongruence pipeline.
//!
//! ## Workflow
//! - Enumerate every 3-species combination plus a fixed outgroup
//! - Prune a large tree collection down to each quartet
//! - Emit one analysis config per pruned-tree file
//! - Run an external analysis tool over each config
//!
//! Stages communicate only through files, so any stage can be re-run on its
//! own once the directories it reads are populated.
//!
//! ## Architecture
//! - `core` - The pipeline engine
//! - `events` - Progress events for the CLI or any other listener
//! - `error` - Error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{PipelineError, Result};

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the process-wide tracing subscriber.
///
/// Records go to `log_file`, opened in append mode, or to stderr when no
/// file is given. `RUST_LOG` overrides the default `info` level. Call once
/// from the entry point; later calls leave the first subscriber in place.
/// Writes are unbuffered, so nothing needs flushing at exit.
pub fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| PipelineError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(())
}
