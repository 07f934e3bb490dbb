//! Persistent storage for channels, members, timetables and standups.
//!
//! Sub-modules:
//! - `schema`: SQLite DDL definitions.
//! - `sqlite`: SQLite-backed `SqliteStore`.

pub(crate) mod schema;
pub mod sqlite;

pub use sqlite::{NewStandup, SqliteStore, StoreError};
