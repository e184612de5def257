//! # phylo-pipeline CLI
//!
//! Command-line interface for the incongruence pipeline.
//!
//! ## Usage
//! ```bash
//! phylo-pipeline run --outgroup Outgroup --species-list species.txt \
//!     --steps generate_combinations prune_trees --tree-file trees.nwk \
//!     --pruned-tree-dir pruned
//! ```

mod cli;

use phylo_pipeline::Result;

fn main() -> Result<()> {
    cli::run()
}
