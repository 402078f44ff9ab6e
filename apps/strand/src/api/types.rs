//! # HTTP Response Types
//!
//! JSON bodies of the plain HTTP endpoints. WebSocket messages live in
//! [`crate::protocol`].

use serde::{Deserialize, Serialize};
use strand_core::GraphStats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Element counts of the shared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub nodes: usize,
    pub links: usize,
    pub edges: usize,
    pub subscriptions: usize,
}

impl From<GraphStats> for StatusResponse {
    fn from(stats: GraphStats) -> Self {
        Self {
            nodes: stats.nodes,
            links: stats.links,
            edges: stats.edges,
            subscriptions: stats.subscriptions,
        }
    }
}
