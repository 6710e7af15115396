//! State storage traits and implementations
//!
//! This module defines the storage abstraction for per-mailbox state
//! (credential bundle, watermark, search query) and the cycle lease.
//! The trait-based design allows swapping between in-memory and SQLite
//! backends.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryStateStore;
pub use sqlite::SqliteStateStore;
pub use traits::{StateKind, StateStore};
