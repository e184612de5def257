//! # Events Module
//!
//! Progress events sent from the pipeline to whoever is listening.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Prune(PruneEvent::ChunkCompleted(p)) = event {
//!             println!("chunk {}/{}: {} trees", p.chunk + 1, p.total_chunks, p.trees_pruned);
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
