//! The local-first enrichment cache

mod context;
mod fence;
mod manager;
mod record;

pub use fence::CommitFence;
pub use context::{build_context_window, DEFAULT_CONTEXT_LIMIT};
pub use manager::NoteCache;
pub use record::{FetchState, NoteRecord};
