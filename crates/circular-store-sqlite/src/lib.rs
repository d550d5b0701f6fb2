//! SQLite backend for the circular workflow.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The same store also serves as a local
//! [`ParticipantDirectory`](circular_core::directory::ParticipantDirectory)
//! when the host system shares the database file.

mod directory;
mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
