//! # Element Events
//!
//! Subscription contract between the graph store and its observers.
//!
//! The store keeps subscriptions and calls the registered [`EventSink`]
//! synchronously, while the mutation that triggered the event is applied.
//! Sinks must therefore be cheap and non-blocking (typically a channel send).

use crate::{Addr, StrandError};
use std::fmt;
use std::str::FromStr;

/// Identifier of a subscription, unique for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u64);

/// The condition a subscription waits for, relative to its subject element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// An edge starting at the subject was created.
    AddOutgoingEdge,
    /// An edge ending at the subject was created.
    AddIngoingEdge,
    /// An edge starting at the subject was deleted.
    RemoveOutgoingEdge,
    /// An edge ending at the subject was deleted.
    RemoveIngoingEdge,
    /// The subject's link content was set.
    ContentChange,
    /// The subject was deleted.
    DeleteElement,
}

impl EventKind {
    /// Wire name of the event kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddOutgoingEdge => "add_outgoing_edge",
            Self::AddIngoingEdge => "add_ingoing_edge",
            Self::RemoveOutgoingEdge => "remove_outgoing_edge",
            Self::RemoveIngoingEdge => "remove_ingoing_edge",
            Self::ContentChange => "content_change",
            Self::DeleteElement => "delete_element",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = StrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add_outgoing_edge" => Ok(Self::AddOutgoingEdge),
            "add_ingoing_edge" => Ok(Self::AddIngoingEdge),
            "remove_outgoing_edge" => Ok(Self::RemoveOutgoingEdge),
            "remove_ingoing_edge" => Ok(Self::RemoveIngoingEdge),
            "content_change" => Ok(Self::ContentChange),
            "delete_element" => Ok(Self::DeleteElement),
            other => Err(StrandError::UnsupportedRequest(format!(
                "unknown event type '{}'",
                other
            ))),
        }
    }
}

/// A fired event, addressed to one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementEvent {
    /// The subscription this event is delivered to.
    pub id: EventId,
    /// The subscribed element.
    pub subject: Addr,
    /// The edge involved, or `Addr::EMPTY` for element-level events.
    pub edge: Addr,
    /// The other endpoint of `edge`, or `Addr::EMPTY`.
    pub other: Addr,
}

/// Receiver of fired events.
pub trait EventSink: Send + Sync {
    /// Deliver one event. Must not block.
    fn emit(&self, event: ElementEvent);
}

impl<F> EventSink for F
where
    F: Fn(ElementEvent) + Send + Sync,
{
    fn emit(&self, event: ElementEvent) {
        self(event);
    }
}
