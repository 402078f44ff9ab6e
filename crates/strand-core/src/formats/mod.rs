//! # Formats
//!
//! Serialization formats for Strand graph snapshots.

pub mod persistence;

pub use persistence::{PersistenceHeader, graph_from_bytes, graph_to_bytes};
