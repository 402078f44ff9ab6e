//! # Connection Subscriptions
//!
//! Per-connection registry of event subscriptions.
//!
//! The store invokes sinks synchronously during mutations, so each
//! connection registers a [`ChannelSink`] that forwards events into an
//! unbounded channel drained by the connection's send loop.

use std::collections::BTreeMap;
use std::sync::Arc;
use strand_core::{Addr, ElementEvent, EventId, EventKind, EventSink, GraphStore, StrandError};
use tokio::sync::mpsc;

/// Sink that forwards events into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink(mpsc::UnboundedSender<ElementEvent>);

impl EventSink for ChannelSink {
    fn emit(&self, event: ElementEvent) {
        // The receiver is gone only once the connection is closing.
        if self.0.send(event).is_err() {
            tracing::trace!(event = event.id.0, "event dropped after disconnect");
        }
    }
}

/// Subscriptions owned by one connection.
pub struct SubscriptionRegistry {
    sink: Arc<dyn EventSink>,
    owned: BTreeMap<EventId, (EventKind, Addr)>,
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("owned", &self.owned)
            .finish()
    }
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            owned: BTreeMap::new(),
        }
    }

    /// Registry backed by a fresh channel, plus the receiving end.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ElementEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(Arc::new(ChannelSink(tx))), rx)
    }

    /// Subscribe this connection to `kind` events on `addr`.
    pub fn subscribe<G: GraphStore + ?Sized>(
        &mut self,
        store: &mut G,
        kind: EventKind,
        addr: Addr,
    ) -> Result<EventId, StrandError> {
        let id = store.subscribe(kind, addr, Arc::clone(&self.sink))?;
        self.owned.insert(id, (kind, addr));
        tracing::debug!(event = id.0, kind = %kind, addr = addr.0, "subscription created");
        Ok(id)
    }

    /// Remove one of this connection's subscriptions.
    ///
    /// Ids owned by other connections are left alone and report `false`.
    pub fn unsubscribe<G: GraphStore + ?Sized>(&mut self, store: &mut G, id: EventId) -> bool {
        if self.owned.remove(&id).is_none() {
            return false;
        }
        // The store drops subscriptions of deleted elements on its own.
        store.unsubscribe(id)
    }

    /// Remove every subscription of this connection. Returns how many were live.
    pub fn clear<G: GraphStore + ?Sized>(&mut self, store: &mut G) -> usize {
        let owned = std::mem::take(&mut self.owned);
        owned
            .into_keys()
            .filter(|&id| store.unsubscribe(id))
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.owned.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::{ElementType, MemoryGraph};

    #[test]
    fn events_reach_the_channel() {
        let mut graph = MemoryGraph::new();
        let node = graph.create_node(ElementType::NODE_CONST).expect("node");
        let other = graph.create_node(ElementType::NODE_CONST).expect("node");
        let (mut registry, mut rx) = SubscriptionRegistry::channel();

        let id = registry
            .subscribe(&mut graph, EventKind::AddOutgoingEdge, node)
            .expect("subscribe");
        let edge = graph
            .create_edge(ElementType::EDGE_ACCESS_CONST_POS_PERM, node, other)
            .expect("edge");

        let event = rx.try_recv().expect("event");
        assert_eq!(event.id, id);
        assert_eq!(event.edge, edge);
        assert_eq!(event.other, other);
    }

    #[test]
    fn foreign_ids_are_not_removed() {
        let mut graph = MemoryGraph::new();
        let node = graph.create_node(ElementType::NODE_CONST).expect("node");
        let (mut mine, _rx1) = SubscriptionRegistry::channel();
        let (mut theirs, _rx2) = SubscriptionRegistry::channel();

        let id = theirs
            .subscribe(&mut graph, EventKind::DeleteElement, node)
            .expect("subscribe");
        assert!(!mine.unsubscribe(&mut graph, id));
        assert_eq!(graph.stats().subscriptions, 1);
        assert!(theirs.unsubscribe(&mut graph, id));
        assert_eq!(graph.stats().subscriptions, 0);
    }

    #[test]
    fn clear_removes_everything() {
        let mut graph = MemoryGraph::new();
        let node = graph.create_node(ElementType::NODE_CONST).expect("node");
        let (mut registry, _rx) = SubscriptionRegistry::channel();
        for kind in [EventKind::ContentChange, EventKind::DeleteElement] {
            registry.subscribe(&mut graph, kind, node).expect("subscribe");
        }

        assert_eq!(registry.clear(&mut graph), 2);
        assert!(registry.is_empty());
        assert_eq!(graph.stats().subscriptions, 0);
    }

    #[test]
    fn missing_element_cannot_be_subscribed() {
        let mut graph = MemoryGraph::new();
        let (mut registry, _rx) = SubscriptionRegistry::channel();
        assert!(
            registry
                .subscribe(&mut graph, EventKind::DeleteElement, Addr(99))
                .is_err()
        );
        assert_eq!(registry.len(), 0);
    }
}
