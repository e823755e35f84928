//! Local cache layer for the federated record resolution engine.
//!
//! `shipstore` owns the canonical [`models::Record`] type, the narrow
//! [`store::DocumentStore`] interface onto the backing document store, a
//! SQLite implementation of it, and the [`gateway::CacheGateway`] the
//! resolution engine reads and writes through.

pub mod errors;
pub mod gateway;
pub mod models;
pub mod sqlite;
pub mod store;

pub use errors::{Result, StorageError};
pub use gateway::CacheGateway;
pub use models::{Direction, DirectionFilter, Item, Record};
pub use sqlite::SqliteStore;
pub use store::{DocumentStore, MemoryStore};
