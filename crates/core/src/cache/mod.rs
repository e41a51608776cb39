//! SQLite-backed storage for versioned cache partitions.
//!
//! This module provides the durable side of the offline cache, using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named partitions whose names embed a deployment version
//! - Request-keyed entries (SHA-256 over method and URL)
//! - Atomic single-entry and multi-entry writes
//! - Pruning of every partition outside the current allow-list
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod names;
pub mod partition;

pub use crate::Error;

pub use connection::CacheDb;
pub use names::{CacheNames, PartitionRole};
pub use partition::{Partition, Partitions};
