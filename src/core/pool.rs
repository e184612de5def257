//! Worker pool sizing and construction.

use crate::error::{ConfigError, PipelineError};
use std::thread;

/// Clamp a requested worker count to the machine's available parallelism.
pub fn effective_pool_size(requested: usize) -> Result<usize, ConfigError> {
    if requested == 0 {
        return Err(ConfigError::ZeroPoolSize);
    }
    let available = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    Ok(requested.min(available))
}

/// Build a dedicated rayon pool with `size` named worker threads.
pub fn build_pool(size: usize, name: &'static str) -> Result<rayon::ThreadPool, PipelineError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(size)
        .thread_name(move |i| format!("{}-{}", name, i))
        .build()
        .map_err(|e| PipelineError::Pool(e.to_string()))
}
