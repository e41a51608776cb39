//! Core types and shared functionality for harbor.
//!
//! This crate provides:
//! - Request and response snapshot types
//! - The request classifier
//! - Versioned cache partitions with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod request;

pub use cache::{CacheDb, CacheNames, Partition, PartitionRole, Partitions};
pub use classify::{Category, Classifier};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use request::{CacheRequest, CachedResponse, RequestMode};
