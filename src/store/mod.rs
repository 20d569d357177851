//! Durable note storage: trait and filesystem backend

mod fs;
mod traits;

pub use fs::{DraftItem, FsStore};
pub use traits::{NoteStore, StoreError, StoreResult};
