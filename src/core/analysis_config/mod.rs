//! # Analysis Config Module
//!
//! Writes one analysis config per pruned-tree file.
//!
//! ## Format
//! Two sections of `key: value` pairs, the layout the external analysis
//! script reads:
//!
//! ```text
//! [Input]
//! treefile: /abs/pruned/out_subtree_3.txt
//! numdistributions: 2
//! likelihoodthresh: 0.01
//! numsteps: 50
//! gradascentscalar: 0.5
//! totaloutgroup: Outgroup
//! multiproc: False
//! maxcores: 1
//!
//! [Output]
//! OutputPath: /abs/configs/out_subtree_3.txt.csv
//! ```
//!
//! Files are named `run_<pruned file name>` and processed in task order, so
//! a re-run over the same directory rewrites identical bytes.

use crate::core::pruning::parse_task_index;
use crate::error::{PipelineError, Result};
use crate::events::{null_sender, ConfigEvent, Event, EventSender};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of every emitted config file
pub const CONFIG_FILE_PREFIX: &str = "run_";

/// Config file name for a pruned-tree file name
pub fn config_file_name(pruned_file_name: &str) -> String {
    format!("{}{}", CONFIG_FILE_PREFIX, pruned_file_name)
}

/// Fixed hyperparameters for the external analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParameters {
    /// Mixture components
    pub num_distributions: u32,
    /// Convergence threshold on the likelihood
    pub likelihood_threshold: f64,
    /// Optimization steps
    pub num_steps: u32,
    /// Gradient-ascent step scalar
    pub grad_ascent_scalar: f64,
    /// Internal parallelism of the external tool
    pub multiproc: bool,
    /// Core limit for the external tool
    pub max_cores: u32,
}

impl Default for AnalysisParameters {
    fn default() -> Self {
        Self {
            num_distributions: 2,
            likelihood_threshold: 0.01,
            num_steps: 50,
            grad_ascent_scalar: 0.5,
            multiproc: false,
            max_cores: 1,
        }
    }
}

/// One pruned-tree file bound to its parameters and output path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub tree_file: PathBuf,
    pub outgroup: String,
    pub parameters: AnalysisParameters,
    pub output_path: PathBuf,
}

impl fmt::Display for ConfigRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.parameters;
        writeln!(f, "[Input]")?;
        writeln!(f, "treefile: {}", self.tree_file.display())?;
        writeln!(f, "numdistributions: {}", p.num_distributions)?;
        writeln!(f, "likelihoodthresh: {}", p.likelihood_threshold)?;
        writeln!(f, "numsteps: {}", p.num_steps)?;
        writeln!(f, "gradascentscalar: {}", p.grad_ascent_scalar)?;
        writeln!(f, "totaloutgroup: {}", self.outgroup)?;
        writeln!(f, "multiproc: {}", if p.multiproc { "True" } else { "False" })?;
        writeln!(f, "maxcores: {}", p.max_cores)?;
        writeln!(f)?;
        writeln!(f, "[Output]")?;
        writeln!(f, "OutputPath: {}", self.output_path.display())
    }
}

/// Result of a config emission run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmitReport {
    /// Written config files in task order
    pub configs: Vec<PathBuf>,
}

/// Scans a pruned-tree directory and writes configs
pub struct ConfigEmitter {
    pruned_dir: PathBuf,
    output_dir: PathBuf,
    outgroup: String,
    parameters: AnalysisParameters,
}

impl ConfigEmitter {
    pub fn new(
        pruned_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        outgroup: impl Into<String>,
    ) -> Self {
        Self {
            pruned_dir: pruned_dir.into(),
            output_dir: output_dir.into(),
            outgroup: outgroup.into(),
            parameters: AnalysisParameters::default(),
        }
    }

    /// Override the default hyperparameters
    pub fn with_parameters(mut self, parameters: AnalysisParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn emit(&self) -> Result<EmitReport> {
        self.emit_with_events(&null_sender())
    }

    /// Write one config per `out_subtree_<index>.txt` file
    pub fn emit_with_events(&self, events: &EventSender) -> Result<EmitReport> {
        let pruned_dir = absolute(&self.pruned_dir)?;
        fs::create_dir_all(&self.output_dir).map_err(|source| PipelineError::Write {
            path: self.output_dir.clone(),
            source,
        })?;
        let output_dir = absolute(&self.output_dir)?;

        let mut report = EmitReport::default();
        for (index, name) in pruned_files(&pruned_dir)? {
            let record = ConfigRecord {
                tree_file: pruned_dir.join(&name),
                outgroup: self.outgroup.clone(),
                parameters: self.parameters.clone(),
                output_path: output_dir.join(format!("{}.csv", name)),
            };
            let path = output_dir.join(config_file_name(&name));
            fs::write(&path, record.to_string()).map_err(|source| PipelineError::Write {
                path: path.clone(),
                source,
            })?;

            debug!(task = index, config = %path.display(), "Config written");
            events.send(Event::Config(ConfigEvent::Written { path: path.clone() }));
            report.configs.push(path);
        }

        info!(
            configs = report.configs.len(),
            dir = %output_dir.display(),
            "Generated {} config files",
            report.configs.len()
        );
        events.send(Event::Config(ConfigEvent::Completed {
            total_configs: report.configs.len(),
        }));
        Ok(report)
    }
}

/// Pruned-tree files in `dir`, sorted by task index
fn pruned_files(dir: &Path) -> Result<Vec<(usize, String)>> {
    let read_error = |source| PipelineError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if !entry.file_type().map_err(read_error)?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(index) = parse_task_index(&name) {
            files.push((index, name));
        }
    }
    files.sort_unstable();
    Ok(files)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pruned_dir_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in files {
            fs::write(dir.path().join(name), "(A:1,B:1,C:1,O:1);\n").unwrap();
        }
        dir
    }

    #[test]
    fn renders_both_sections() {
        let record = ConfigRecord {
            tree_file: PathBuf::from("/p/out_subtree_3.txt"),
            outgroup: "Out".to_string(),
            parameters: AnalysisParameters::default(),
            output_path: PathBuf::from("/c/out_subtree_3.txt.csv"),
        };
        let expected = "\
[Input]
treefile: /p/out_subtree_3.txt
numdistributions: 2
likelihoodthresh: 0.01
numsteps: 50
gradascentscalar: 0.5
totaloutgroup: Out
multiproc: False
maxcores: 1

[Output]
OutputPath: /c/out_subtree_3.txt.csv
";
        assert_eq!(record.to_string(), expected);
    }

    #[test]
    fn one_config_per_pruned_file() {
        let pruned = pruned_dir_with(&["out_subtree_1.txt", "out_subtree_10.txt", "notes.txt"]);
        let out = TempDir::new().unwrap();

        let report = ConfigEmitter::new(pruned.path(), out.path().join("configs"), "O")
            .emit()
            .unwrap();

        let names: Vec<String> = report
            .configs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["run_out_subtree_1.txt", "run_out_subtree_10.txt"]);
    }

    #[test]
    fn paths_in_config_are_absolute() {
        let pruned = pruned_dir_with(&["out_subtree_2.txt"]);
        let out = TempDir::new().unwrap();

        let report = ConfigEmitter::new(pruned.path(), out.path(), "O").emit().unwrap();
        let content = fs::read_to_string(&report.configs[0]).unwrap();

        let treefile = content
            .lines()
            .find_map(|l| l.strip_prefix("treefile: "))
            .unwrap();
        assert!(Path::new(treefile).is_absolute());
        assert!(treefile.ends_with("out_subtree_2.txt"));

        let output = content
            .lines()
            .find_map(|l| l.strip_prefix("OutputPath: "))
            .unwrap();
        assert!(output.ends_with("out_subtree_2.txt.csv"));
    }

    #[test]
    fn rerun_is_byte_identical() {
        let pruned = pruned_dir_with(&["out_subtree_1.txt", "out_subtree_2.txt"]);
        let out = TempDir::new().unwrap();
        let emitter = ConfigEmitter::new(pruned.path(), out.path(), "O");

        let first = emitter.emit().unwrap();
        let before: Vec<Vec<u8>> = first.configs.iter().map(|p| fs::read(p).unwrap()).collect();
        let second = emitter.emit().unwrap();
        let after: Vec<Vec<u8>> = second.configs.iter().map(|p| fs::read(p).unwrap()).collect();

        assert_eq!(first.configs, second.configs);
        assert_eq!(before, after);
    }

    #[test]
    fn missing_pruned_dir_is_an_error() {
        let out = TempDir::new().unwrap();
        let result = ConfigEmitter::new(out.path().join("absent"), out.path(), "O").emit();
        assert!(matches!(result, Err(PipelineError::Read { .. })));
    }
}
