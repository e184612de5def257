//! # Combinations Module
//!
//! Enumerates every 3-taxon subset of the species list, appends the
//! outgroup, and writes the resulting quartets as the task file.
//!
//! The task file has one quartet per line, taxa separated by single spaces.
//! A task's index is its 1-based line number, so pruned outputs and configs
//! named after the index can always be traced back to their taxa.

use crate::error::{CollectionError, ConfigError, PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Taxa per task: three sampled species plus the outgroup
pub const TAXA_PER_TASK: usize = 4;

/// One quartet of taxa and its line position in the task file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationTask {
    /// 1-based line number in the task file
    pub index: usize,
    /// Three species followed by the outgroup
    pub taxa: Vec<String>,
}

impl CombinationTask {
    /// Parse one task-file line
    pub fn parse(index: usize, line: &str) -> std::result::Result<Self, CollectionError> {
        let taxa: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if taxa.len() != TAXA_PER_TASK {
            return Err(CollectionError::MalformedTask {
                index,
                found: taxa.len(),
            });
        }
        Ok(Self { index, taxa })
    }

    /// The line written to the task file
    pub fn to_line(&self) -> String {
        self.taxa.join(" ")
    }
}

/// Read a species list: one taxon per line, blank lines ignored
pub fn read_species_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// All 3-subsets of `species` in input order, each followed by `outgroup`.
///
/// Yields C(n, 3) tasks indexed from 1.
pub fn combinations(
    species: &[String],
    outgroup: &str,
) -> std::result::Result<Vec<CombinationTask>, ConfigError> {
    if outgroup.trim().is_empty() {
        return Err(ConfigError::EmptyOutgroup);
    }
    let n = species.len();
    if n < 3 {
        return Err(ConfigError::TooFewSpecies { found: n });
    }

    let mut tasks = Vec::with_capacity(n * (n - 1) * (n - 2) / 6);
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                tasks.push(CombinationTask {
                    index: tasks.len() + 1,
                    taxa: vec![
                        species[i].clone(),
                        species[j].clone(),
                        species[k].clone(),
                        outgroup.to_string(),
                    ],
                });
            }
        }
    }
    Ok(tasks)
}

/// Generate the combinations and write them to `task_file`.
///
/// Returns the number of tasks written.
pub fn generate_combinations(species: &[String], outgroup: &str, task_file: &Path) -> Result<usize> {
    let tasks = combinations(species, outgroup)?;

    let mut content = String::with_capacity(tasks.len() * 32);
    for task in &tasks {
        content.push_str(&task.to_line());
        content.push('\n');
    }

    if let Some(parent) = task_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PipelineError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(task_file, content).map_err(|source| PipelineError::Write {
        path: task_file.to_path_buf(),
        source,
    })?;

    info!(
        species = species.len(),
        tasks = tasks.len(),
        path = %task_file.display(),
        "Generated {} combinations",
        tasks.len()
    );
    Ok(tasks.len())
}

/// Non-blank task-file lines paired with their 1-based line numbers
pub fn read_task_lines(task_file: &Path) -> Result<Vec<(usize, String)>> {
    let content = fs::read_to_string(task_file).map_err(|source| PipelineError::Read {
        path: task_file.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect())
}
