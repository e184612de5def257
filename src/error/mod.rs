//! # Error Module
//!
//! Error types for the incongruence pipeline.
//!
//! ## Severity
//! - [`ConfigError`] is fatal: the selected step never starts
//! - [`TaskError`] covers one tree of one task: the tree is skipped
//! - [`CollectionError`] covers one whole task: the task scores zero
//! - [`InvocationError`] covers one external run: the config stays put for a retry
//!
//! Only `ConfigError` and step-level I/O failures reach [`PipelineError`];
//! the others are contained inside the workers and surface as counts.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level pipeline error
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build worker pool: {0}")]
    Pool(String),
}

/// Missing or invalid input for a selected step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Step '{step}' requires {parameter}")]
    MissingParameter {
        step: &'static str,
        parameter: &'static str,
    },

    #[error("Species list needs at least 3 taxa, found {found}")]
    TooFewSpecies { found: usize },

    #[error("Outgroup name must not be empty")]
    EmptyOutgroup,

    #[error("Pool size must be at least 1")]
    ZeroPoolSize,

    #[error("Chunk size must be at least 1")]
    ZeroChunkSize,

    #[error("Unknown step '{0}' (expected generate_combinations, prune_trees, generate_config or run_external)")]
    UnknownStep(String),
}

/// One tree could not be restricted to a task's taxa
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("Malformed tree at column {position}: {reason}")]
    Parse { position: usize, reason: String },

    #[error("Taxa not found in tree: {}", .taxa.join(", "))]
    MissingTaxa { taxa: Vec<String> },

    #[error("Taxon '{taxon}' labels {count} leaves")]
    AmbiguousTaxon { taxon: String, count: usize },
}

/// A whole task failed and scores zero
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("Task {index}: expected 4 taxa, found {found}")]
    MalformedTask { index: usize, found: usize },

    #[error("Failed to read tree collection {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write pruned trees to {path}: {source}")]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An external run or the relocation after it failed
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("Failed to launch analysis for {config}: {source}")]
    Launch {
        config: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {config} into {finished_dir}: {source}")]
    Relocate {
        config: PathBuf,
        finished_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_names_step_and_parameter() {
        let error = PipelineError::from(ConfigError::MissingParameter {
            step: "prune_trees",
            parameter: "--tree-file",
        });
        let message = error.to_string();
        assert!(message.contains("prune_trees"));
        assert!(message.contains("--tree-file"));
    }

    #[test]
    fn missing_taxa_lists_every_name() {
        let error = TaskError::MissingTaxa {
            taxa: vec!["Homo".to_string(), "Pan".to_string()],
        };
        assert_eq!(error.to_string(), "Taxa not found in tree: Homo, Pan");
    }

    #[test]
    fn collection_error_includes_path() {
        let error = CollectionError::Unreadable {
            path: PathBuf::from("/data/trees.nwk"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(error.to_string().contains("/data/trees.nwk"));
    }

    #[test]
    fn relocate_error_names_both_paths() {
        let error = InvocationError::Relocate {
            config: PathBuf::from("/cfg/run_out_subtree_1.txt"),
            finished_dir: PathBuf::from("/done"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let message = error.to_string();
        assert!(message.contains("/cfg/run_out_subtree_1.txt"));
        assert!(message.contains("/done"));
    }
}
