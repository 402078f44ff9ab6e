//! # strand-core
//!
//! Graph store and template engine for Strand.
//!
//! This crate holds everything that does not touch the network:
//! - the element type system and addresses (`types`)
//! - the `GraphStore` contract and its in-memory implementation (`graph`)
//! - element event subscriptions (`events`)
//! - template search and generation (`template`)
//! - snapshot persistence (`formats`)
//!
//! All operations are synchronous and report failures through
//! [`StrandError`]. Callers that share a store across threads wrap it in a
//! lock; the engine itself holds no global state.

// =============================================================================
// MODULES
// =============================================================================

pub mod events;
pub mod formats;
pub mod graph;
pub mod primitives;
pub mod template;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{Addr, ElementType, LinkContent, StrandError};

// =============================================================================
// RE-EXPORTS: Graph and Events
// =============================================================================

pub use events::{ElementEvent, EventId, EventKind, EventSink};
pub use graph::{EdgeInfo, GraphStats, GraphStore, MemoryGraph, SerializableGraph};

// =============================================================================
// RE-EXPORTS: Template Engine
// =============================================================================

pub use template::{
    Binding, GenerateResult, MatchResult, ParamValue, Slot, Template, TemplateParams,
    TemplateSource, Triple, build_template, generate, resolve_params, search, search_with,
};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{PersistenceHeader, graph_from_bytes, graph_to_bytes};
