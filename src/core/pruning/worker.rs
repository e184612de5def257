//! Per-task pruning work, run on pool threads.

use super::{pruned_file_name, TaskOutcome};
use crate::core::combinations::CombinationTask;
use crate::core::newick::parse;
use crate::error::CollectionError;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Prune every tree in `tree_file` down to one task's quartet.
///
/// The collection is read fresh for each task. Trees that fail to parse or
/// lack one of the taxa are skipped and counted. The output file is only
/// written when at least one tree survives.
pub fn prune_task(
    index: usize,
    line: &str,
    tree_file: &Path,
    output_dir: &Path,
) -> Result<TaskOutcome, CollectionError> {
    let task = CombinationTask::parse(index, line)?;

    let collection = fs::read_to_string(tree_file).map_err(|source| CollectionError::Unreadable {
        path: tree_file.to_path_buf(),
        source,
    })?;

    let mut pruned = Vec::new();
    let mut skipped = 0;
    let trees = collection.lines().map(str::trim).filter(|l| !l.is_empty());
    for (position, newick) in trees.enumerate() {
        match parse(newick).and_then(|tree| tree.restrict(&task.taxa)) {
            Ok(quartet) => pruned.push(quartet.to_newick()),
            Err(e) => {
                skipped += 1;
                debug!(task = index, tree = position + 1, error = %e, "Pruning error");
            }
        }
    }

    if pruned.is_empty() {
        debug!(task = index, skipped, "No usable trees");
        return Ok(TaskOutcome {
            index,
            trees_pruned: 0,
            trees_skipped: skipped,
            output: None,
            error: None,
        });
    }

    let unwritable = |source| CollectionError::Unwritable {
        path: output_dir.to_path_buf(),
        source,
    };
    fs::create_dir_all(output_dir).map_err(unwritable)?;
    let path = output_dir.join(pruned_file_name(index));
    let mut content = pruned.join("\n");
    content.push('\n');
    fs::write(&path, content).map_err(|source| CollectionError::Unwritable {
        path: path.clone(),
        source,
    })?;

    Ok(TaskOutcome {
        index,
        trees_pruned: pruned.len(),
        trees_skipped: skipped,
        output: Some(path),
        error: None,
    })
}
