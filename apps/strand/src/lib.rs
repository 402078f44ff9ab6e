//! # Strand
//!
//! WebSocket server for the Strand graph protocol.
//!
//! - [`protocol`]: JSON envelopes and request decoding
//! - [`dispatcher`]: request execution against a `GraphStore`
//! - [`subscriptions`]: per-connection event registry
//! - [`api`]: axum router, WebSocket loop, auth and rate limiting
//! - [`config`]: TOML and environment configuration
//! - [`cli`]: clap commands

pub mod api;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod protocol;
pub mod subscriptions;
