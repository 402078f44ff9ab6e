//! # Graph Store
//!
//! Element storage for Strand.
//!
//! This module defines the `GraphStore` trait consumed by the template
//! engine and the protocol layer, and `MemoryGraph`, its in-memory
//! implementation. Adjacency lists keep edges in creation order, so
//! iteration is stable for an unchanged store.

use crate::events::{ElementEvent, EventId, EventKind, EventSink};
use crate::primitives::{MAX_CONTENT_LENGTH, MAX_IDTF_LENGTH};
use crate::{Addr, ElementType, LinkContent, StrandError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// Endpoints of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeInfo {
    pub source: Addr,
    pub target: Addr,
}

/// Element counts by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: usize,
    pub links: usize,
    pub edges: usize,
    pub subscriptions: usize,
}

/// The GraphStore trait defines the element operations the engine relies on.
///
/// Mutations return `Result<T, StrandError>`; lookups of missing elements
/// return `None` rather than failing.
pub trait GraphStore {
    /// Create a node. `ty` must be of node category.
    fn create_node(&mut self, ty: ElementType) -> Result<Addr, StrandError>;

    /// Create an empty link. `ty` must be of link category.
    fn create_link(&mut self, ty: ElementType) -> Result<Addr, StrandError>;

    /// Create an edge between two existing elements. `ty` must be of edge category.
    fn create_edge(
        &mut self,
        ty: ElementType,
        source: Addr,
        target: Addr,
    ) -> Result<Addr, StrandError>;

    /// Delete an element together with every edge incident to it.
    /// Returns `false` if the element did not exist.
    fn delete_element(&mut self, addr: Addr) -> Result<bool, StrandError>;

    /// Get the type of an element.
    fn element_type(&self, addr: Addr) -> Option<ElementType>;

    /// Get the endpoints of an edge.
    fn edge_info(&self, addr: Addr) -> Option<EdgeInfo>;

    /// Edges whose source is `addr`, in creation order.
    fn outgoing(&self, addr: Addr) -> Vec<Addr>;

    /// Edges whose target is `addr`, in creation order.
    fn incoming(&self, addr: Addr) -> Vec<Addr>;

    /// Every edge in the store, in creation order.
    fn all_edges(&self) -> Vec<Addr>;

    /// Replace the content of a link.
    fn set_content(&mut self, addr: Addr, content: LinkContent) -> Result<(), StrandError>;

    /// Get the content of a link.
    fn content(&self, addr: Addr) -> Option<LinkContent>;

    /// Links whose content equals `content`, in address order.
    fn find_links_by_content(&self, content: &LinkContent) -> Vec<Addr>;

    /// Assign a system identifier. Identifiers are unique per store.
    fn set_system_idtf(&mut self, addr: Addr, idtf: &str) -> Result<(), StrandError>;

    /// Get the system identifier of an element.
    fn system_idtf(&self, addr: Addr) -> Option<String>;

    /// Find an element by system identifier.
    fn find_by_idtf(&self, idtf: &str) -> Option<Addr>;

    /// Register a subscription on `addr`.
    fn subscribe(
        &mut self,
        kind: EventKind,
        addr: Addr,
        sink: Arc<dyn EventSink>,
    ) -> Result<EventId, StrandError>;

    /// Remove a subscription. Returns `false` if it did not exist.
    fn unsubscribe(&mut self, id: EventId) -> bool;

    /// Element counts.
    fn stats(&self) -> GraphStats;

    /// Queue fired events instead of delivering them.
    fn hold_events(&mut self);

    /// Stop queueing. Queued events are delivered in firing order when
    /// `deliver` is true and discarded otherwise.
    fn release_events(&mut self, deliver: bool);

    /// Check if an element exists.
    fn contains(&self, addr: Addr) -> bool {
        self.element_type(addr).is_some()
    }

    /// Find an element by identifier, or create one of type `ty` carrying it.
    fn resolve_idtf(&mut self, idtf: &str, ty: ElementType) -> Result<Addr, StrandError> {
        if let Some(addr) = self.find_by_idtf(idtf) {
            return Ok(addr);
        }
        let addr = if ty.is_link() {
            self.create_link(ty)?
        } else {
            self.create_node(ty)?
        };
        self.set_system_idtf(addr, idtf)?;
        Ok(addr)
    }

    /// Create an element of any non-edge type.
    fn create_element(&mut self, ty: ElementType) -> Result<Addr, StrandError> {
        if ty.is_link() {
            self.create_link(ty)
        } else {
            self.create_node(ty)
        }
    }
}

// =============================================================================
// MEMORY GRAPH
// =============================================================================

#[derive(Debug, Clone)]
struct Element {
    ty: ElementType,
    edge: Option<EdgeInfo>,
    outgoing: Vec<Addr>,
    incoming: Vec<Addr>,
}

impl Element {
    fn new(ty: ElementType, edge: Option<EdgeInfo>) -> Self {
        Self {
            ty,
            edge,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }
}

struct Subscription {
    kind: EventKind,
    addr: Addr,
    sink: Arc<dyn EventSink>,
}

/// Subscriptions indexed by id and by subject.
#[derive(Default)]
struct Subscriptions {
    by_id: BTreeMap<EventId, Subscription>,
    by_addr: BTreeMap<Addr, Vec<EventId>>,
    next_id: u64,
    held: Option<Vec<(Arc<dyn EventSink>, ElementEvent)>>,
}

impl fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriptions")
            .field("count", &self.by_id.len())
            .field("next_id", &self.next_id)
            .field("held", &self.held.as_ref().map(Vec::len))
            .finish()
    }
}

impl Subscriptions {
    fn insert(&mut self, kind: EventKind, addr: Addr, sink: Arc<dyn EventSink>) -> EventId {
        self.next_id = self.next_id.saturating_add(1);
        let id = EventId(self.next_id);
        self.by_id.insert(id, Subscription { kind, addr, sink });
        self.by_addr.entry(addr).or_default().push(id);
        id
    }

    fn remove(&mut self, id: EventId) -> bool {
        let Some(sub) = self.by_id.remove(&id) else {
            return false;
        };
        if let Some(ids) = self.by_addr.get_mut(&sub.addr) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_addr.remove(&sub.addr);
            }
        }
        true
    }

    fn drop_subject(&mut self, addr: Addr) {
        if let Some(ids) = self.by_addr.remove(&addr) {
            for id in ids {
                self.by_id.remove(&id);
            }
        }
    }

    fn fire(&mut self, kind: EventKind, subject: Addr, edge: Addr, other: Addr) {
        let Some(ids) = self.by_addr.get(&subject) else {
            return;
        };
        for id in ids {
            let Some(sub) = self.by_id.get(id).filter(|sub| sub.kind == kind) else {
                continue;
            };
            let event = ElementEvent {
                id: *id,
                subject,
                edge,
                other,
            };
            match self.held.as_mut() {
                Some(held) => held.push((Arc::clone(&sub.sink), event)),
                None => sub.sink.emit(event),
            }
        }
    }

    fn hold(&mut self) {
        self.held.get_or_insert_with(Vec::new);
    }

    fn release(&mut self, deliver: bool) {
        let Some(held) = self.held.take() else {
            return;
        };
        if deliver {
            for (sink, event) in held {
                sink.emit(event);
            }
        }
    }
}

/// In-memory graph store.
///
/// Uses `BTreeMap` for deterministic ordering. Addresses are minted from a
/// monotonic counter and never reused, so address order is creation order.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    elements: BTreeMap<Addr, Element>,
    contents: BTreeMap<Addr, LinkContent>,
    idtf_by_addr: BTreeMap<Addr, String>,
    addr_by_idtf: BTreeMap<String, Addr>,
    subscriptions: Subscriptions,
    next_addr: u64,
}

impl MemoryGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The address the next created element will receive.
    #[must_use]
    pub fn next_addr(&self) -> u64 {
        self.next_addr.saturating_add(1)
    }

    fn mint(&mut self) -> Addr {
        self.next_addr = self.next_addr.saturating_add(1);
        Addr(self.next_addr)
    }

    fn insert(&mut self, ty: ElementType, edge: Option<EdgeInfo>) -> Addr {
        let addr = self.mint();
        self.elements.insert(addr, Element::new(ty, edge));
        addr
    }

    /// Collect `root` and, transitively, every edge incident to it.
    /// Incident edges come after the element they hang on.
    fn deletion_closure(&self, root: Addr) -> Vec<Addr> {
        let mut order = Vec::new();
        let mut seen = std::collections::BTreeSet::new();
        let mut stack = vec![root];
        while let Some(addr) = stack.pop() {
            if !seen.insert(addr) {
                continue;
            }
            let Some(element) = self.elements.get(&addr) else {
                continue;
            };
            order.push(addr);
            stack.extend(element.outgoing.iter().copied());
            stack.extend(element.incoming.iter().copied());
        }
        order
    }

    fn remove_one(&mut self, addr: Addr) {
        let Some(element) = self.elements.remove(&addr) else {
            return;
        };
        if let Some(info) = element.edge {
            if let Some(source) = self.elements.get_mut(&info.source) {
                source.outgoing.retain(|e| *e != addr);
            }
            if let Some(target) = self.elements.get_mut(&info.target) {
                target.incoming.retain(|e| *e != addr);
            }
            self.subscriptions
                .fire(EventKind::RemoveOutgoingEdge, info.source, addr, info.target);
            self.subscriptions
                .fire(EventKind::RemoveIngoingEdge, info.target, addr, info.source);
        }
        self.subscriptions
            .fire(EventKind::DeleteElement, addr, Addr::EMPTY, Addr::EMPTY);
        self.subscriptions.drop_subject(addr);
        self.contents.remove(&addr);
        if let Some(idtf) = self.idtf_by_addr.remove(&addr) {
            self.addr_by_idtf.remove(&idtf);
        }
    }
}

impl GraphStore for MemoryGraph {
    fn create_node(&mut self, ty: ElementType) -> Result<Addr, StrandError> {
        if !ty.is_node() || !ty.has_single_category() {
            return Err(StrandError::InvalidType(ty));
        }
        Ok(self.insert(ty, None))
    }

    fn create_link(&mut self, ty: ElementType) -> Result<Addr, StrandError> {
        if !ty.is_link() || !ty.has_single_category() {
            return Err(StrandError::InvalidType(ty));
        }
        Ok(self.insert(ty, None))
    }

    fn create_edge(
        &mut self,
        ty: ElementType,
        source: Addr,
        target: Addr,
    ) -> Result<Addr, StrandError> {
        if !ty.is_edge() || !ty.has_single_category() {
            return Err(StrandError::InvalidType(ty));
        }
        for endpoint in [source, target] {
            if !self.elements.contains_key(&endpoint) {
                return Err(StrandError::ElementNotFound(endpoint));
            }
        }

        let addr = self.insert(ty, Some(EdgeInfo { source, target }));
        if let Some(element) = self.elements.get_mut(&source) {
            element.outgoing.push(addr);
        }
        if let Some(element) = self.elements.get_mut(&target) {
            element.incoming.push(addr);
        }
        self.subscriptions
            .fire(EventKind::AddOutgoingEdge, source, addr, target);
        self.subscriptions
            .fire(EventKind::AddIngoingEdge, target, addr, source);
        Ok(addr)
    }

    fn delete_element(&mut self, addr: Addr) -> Result<bool, StrandError> {
        if !self.elements.contains_key(&addr) {
            return Ok(false);
        }
        // Edges hanging on edges go before the edge they hang on.
        for victim in self.deletion_closure(addr).into_iter().rev() {
            self.remove_one(victim);
        }
        Ok(true)
    }

    fn element_type(&self, addr: Addr) -> Option<ElementType> {
        self.elements.get(&addr).map(|e| e.ty)
    }

    fn edge_info(&self, addr: Addr) -> Option<EdgeInfo> {
        self.elements.get(&addr).and_then(|e| e.edge)
    }

    fn outgoing(&self, addr: Addr) -> Vec<Addr> {
        self.elements
            .get(&addr)
            .map(|e| e.outgoing.clone())
            .unwrap_or_default()
    }

    fn incoming(&self, addr: Addr) -> Vec<Addr> {
        self.elements
            .get(&addr)
            .map(|e| e.incoming.clone())
            .unwrap_or_default()
    }

    fn all_edges(&self) -> Vec<Addr> {
        self.elements
            .iter()
            .filter(|(_, e)| e.edge.is_some())
            .map(|(addr, _)| *addr)
            .collect()
    }

    fn set_content(&mut self, addr: Addr, content: LinkContent) -> Result<(), StrandError> {
        let ty = self
            .element_type(addr)
            .ok_or(StrandError::ElementNotFound(addr))?;
        if !ty.is_link() {
            return Err(StrandError::InvalidType(ty));
        }
        if let LinkContent::String(s) = &content
            && s.len() > MAX_CONTENT_LENGTH
        {
            return Err(StrandError::SerializationError(format!(
                "Content length {} exceeds maximum {} bytes",
                s.len(),
                MAX_CONTENT_LENGTH
            )));
        }
        self.contents.insert(addr, content);
        self.subscriptions
            .fire(EventKind::ContentChange, addr, Addr::EMPTY, Addr::EMPTY);
        Ok(())
    }

    fn content(&self, addr: Addr) -> Option<LinkContent> {
        self.contents.get(&addr).cloned()
    }

    fn find_links_by_content(&self, content: &LinkContent) -> Vec<Addr> {
        self.contents
            .iter()
            .filter(|(_, c)| *c == content)
            .map(|(addr, _)| *addr)
            .collect()
    }

    fn set_system_idtf(&mut self, addr: Addr, idtf: &str) -> Result<(), StrandError> {
        if !self.elements.contains_key(&addr) {
            return Err(StrandError::ElementNotFound(addr));
        }
        if idtf.is_empty() || idtf.len() > MAX_IDTF_LENGTH {
            return Err(StrandError::InvalidBinding(format!(
                "identifier length must be between 1 and {} bytes",
                MAX_IDTF_LENGTH
            )));
        }
        if let Some(owner) = self.addr_by_idtf.get(idtf)
            && *owner != addr
        {
            return Err(StrandError::InvalidBinding(format!(
                "identifier '{}' already names element {}",
                idtf, owner
            )));
        }
        if let Some(previous) = self.idtf_by_addr.insert(addr, idtf.to_string()) {
            self.addr_by_idtf.remove(&previous);
        }
        self.addr_by_idtf.insert(idtf.to_string(), addr);
        Ok(())
    }

    fn system_idtf(&self, addr: Addr) -> Option<String> {
        self.idtf_by_addr.get(&addr).cloned()
    }

    fn find_by_idtf(&self, idtf: &str) -> Option<Addr> {
        self.addr_by_idtf.get(idtf).copied()
    }

    fn subscribe(
        &mut self,
        kind: EventKind,
        addr: Addr,
        sink: Arc<dyn EventSink>,
    ) -> Result<EventId, StrandError> {
        if !self.elements.contains_key(&addr) {
            return Err(StrandError::ElementNotFound(addr));
        }
        Ok(self.subscriptions.insert(kind, addr, sink))
    }

    fn unsubscribe(&mut self, id: EventId) -> bool {
        self.subscriptions.remove(id)
    }

    fn hold_events(&mut self) {
        self.subscriptions.hold();
    }

    fn release_events(&mut self, deliver: bool) {
        self.subscriptions.release(deliver);
    }

    fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            subscriptions: self.subscriptions.by_id.len(),
            ..GraphStats::default()
        };
        for element in self.elements.values() {
            if element.ty.is_edge() {
                stats.edges += 1;
            } else if element.ty.is_link() {
                stats.links += 1;
            } else {
                stats.nodes += 1;
            }
        }
        stats
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Serializable representation of the store for snapshots.
///
/// Subscriptions are connection-scoped and never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub elements: Vec<(Addr, ElementType, Option<EdgeInfo>)>,
    pub contents: Vec<(Addr, LinkContent)>,
    pub idtfs: Vec<(Addr, String)>,
    pub next_addr: u64,
}

impl From<&MemoryGraph> for SerializableGraph {
    fn from(graph: &MemoryGraph) -> Self {
        Self {
            elements: graph
                .elements
                .iter()
                .map(|(addr, e)| (*addr, e.ty, e.edge))
                .collect(),
            contents: graph
                .contents
                .iter()
                .map(|(addr, c)| (*addr, c.clone()))
                .collect(),
            idtfs: graph
                .idtf_by_addr
                .iter()
                .map(|(addr, idtf)| (*addr, idtf.clone()))
                .collect(),
            next_addr: graph.next_addr,
        }
    }
}

impl From<SerializableGraph> for MemoryGraph {
    fn from(sg: SerializableGraph) -> Self {
        let mut graph = MemoryGraph::new();

        // Elements arrive in address order, so endpoints precede their edges.
        for (addr, ty, edge) in sg.elements {
            if let Some(info) = edge
                && (!graph.elements.contains_key(&info.source)
                    || !graph.elements.contains_key(&info.target))
            {
                continue;
            }
            graph.elements.insert(addr, Element::new(ty, edge));
            if let Some(info) = edge {
                if let Some(source) = graph.elements.get_mut(&info.source) {
                    source.outgoing.push(addr);
                }
                if let Some(target) = graph.elements.get_mut(&info.target) {
                    target.incoming.push(addr);
                }
            }
            graph.next_addr = graph.next_addr.max(addr.0);
        }

        for (addr, content) in sg.contents {
            if graph.elements.contains_key(&addr) {
                graph.contents.insert(addr, content);
            }
        }

        for (addr, idtf) in sg.idtfs {
            let _ = graph.set_system_idtf(addr, &idtf);
        }

        graph.next_addr = graph.next_addr.max(sg.next_addr);
        graph
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<ElementEvent>>>, Arc<dyn EventSink>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink_log = Arc::clone(&log);
        let sink: Arc<dyn EventSink> = Arc::new(move |event: ElementEvent| {
            if let Ok(mut events) = sink_log.lock() {
                events.push(event);
            }
        });
        (log, sink)
    }

    #[test]
    fn create_and_type_lookup() {
        let mut graph = MemoryGraph::new();
        let node = graph.create_node(ElementType::NODE_CONST_CLASS).expect("node");
        let link = graph.create_link(ElementType::LINK_CONST).expect("link");

        assert_eq!(graph.element_type(node), Some(ElementType::NODE_CONST_CLASS));
        assert_eq!(graph.element_type(link), Some(ElementType::LINK_CONST));
        assert_eq!(graph.element_type(Addr(999)), None);
        assert_ne!(node, link);
    }

    #[test]
    fn wrong_category_rejected() {
        let mut graph = MemoryGraph::new();
        assert!(graph.create_node(ElementType::LINK_CONST).is_err());
        assert!(graph.create_link(ElementType::NODE_CONST).is_err());
        let a = graph.create_node(ElementType::NODE_CONST).expect("node");
        assert!(
            graph
                .create_edge(ElementType::NODE_CONST, a, a)
                .is_err()
        );
    }

    #[test]
    fn edge_to_missing_element_fails() {
        let mut graph = MemoryGraph::new();
        let a = graph.create_node(ElementType::NODE_CONST).expect("node");
        let result = graph.create_edge(ElementType::EDGE_ACCESS_CONST_POS_PERM, a, Addr(77));
        assert!(matches!(result, Err(StrandError::ElementNotFound(Addr(77)))));
    }

    #[test]
    fn adjacency_in_creation_order() {
        let mut graph = MemoryGraph::new();
        let a = graph.create_node(ElementType::NODE_CONST).expect("node");
        let b = graph.create_node(ElementType::NODE_CONST).expect("node");
        let c = graph.create_node(ElementType::NODE_CONST).expect("node");
        let ty = ElementType::EDGE_ACCESS_CONST_POS_PERM;

        let e1 = graph.create_edge(ty, a, c).expect("edge");
        let e2 = graph.create_edge(ty, a, b).expect("edge");

        assert_eq!(graph.outgoing(a), vec![e1, e2]);
        assert_eq!(graph.incoming(b), vec![e2]);
        assert_eq!(graph.all_edges(), vec![e1, e2]);
        assert_eq!(
            graph.edge_info(e2),
            Some(EdgeInfo {
                source: a,
                target: b
            })
        );
    }

    #[test]
    fn edges_may_connect_edges() {
        let mut graph = MemoryGraph::new();
        let a = graph.create_node(ElementType::NODE_CONST).expect("node");
        let b = graph.create_node(ElementType::NODE_CONST).expect("node");
        let ty = ElementType::EDGE_ACCESS_CONST_POS_PERM;
        let e = graph.create_edge(ty, a, b).expect("edge");
        let role = graph.create_node(ElementType::NODE_CONST_ROLE).expect("node");
        let attr = graph.create_edge(ty, role, e).expect("edge");

        assert_eq!(graph.incoming(e), vec![attr]);
    }

    #[test]
    fn delete_cascades_to_incident_edges() {
        let mut graph = MemoryGraph::new();
        let a = graph.create_node(ElementType::NODE_CONST).expect("node");
        let b = graph.create_node(ElementType::NODE_CONST).expect("node");
        let role = graph.create_node(ElementType::NODE_CONST_ROLE).expect("node");
        let ty = ElementType::EDGE_ACCESS_CONST_POS_PERM;
        let e = graph.create_edge(ty, a, b).expect("edge");
        let attr = graph.create_edge(ty, role, e).expect("edge");

        assert!(graph.delete_element(a).expect("delete"));
        assert!(!graph.contains(a));
        assert!(!graph.contains(e));
        assert!(!graph.contains(attr));
        assert!(graph.contains(b));
        assert!(graph.outgoing(role).is_empty());
        assert!(!graph.delete_element(a).expect("delete"));
    }

    #[test]
    fn addresses_not_reused_after_delete() {
        let mut graph = MemoryGraph::new();
        let a = graph.create_node(ElementType::NODE_CONST).expect("node");
        graph.delete_element(a).expect("delete");
        let b = graph.create_node(ElementType::NODE_CONST).expect("node");
        assert!(b > a);
    }

    #[test]
    fn content_roundtrip_and_find() {
        let mut graph = MemoryGraph::new();
        let l1 = graph.create_link(ElementType::LINK_CONST).expect("link");
        let l2 = graph.create_link(ElementType::LINK_CONST).expect("link");
        graph.set_content(l1, LinkContent::Int(45)).expect("set");
        graph.set_content(l2, LinkContent::Float(45.0)).expect("set");

        assert_eq!(graph.content(l1), Some(LinkContent::Int(45)));
        assert_eq!(graph.find_links_by_content(&LinkContent::Int(45)), vec![l1]);
        assert_eq!(
            graph.find_links_by_content(&LinkContent::Float(45.0)),
            vec![l2]
        );
    }

    #[test]
    fn content_on_node_rejected() {
        let mut graph = MemoryGraph::new();
        let node = graph.create_node(ElementType::NODE_CONST).expect("node");
        assert!(graph.set_content(node, LinkContent::Int(1)).is_err());
        assert!(graph.content(node).is_none());
    }

    #[test]
    fn resolve_idtf_finds_or_creates() {
        let mut graph = MemoryGraph::new();
        assert_eq!(graph.find_by_idtf("concept_set"), None);

        let first = graph
            .resolve_idtf("concept_set", ElementType::NODE_CONST_CLASS)
            .expect("resolve");
        let second = graph
            .resolve_idtf("concept_set", ElementType::NODE_CONST)
            .expect("resolve");

        assert_eq!(first, second);
        assert_eq!(graph.element_type(first), Some(ElementType::NODE_CONST_CLASS));
        assert_eq!(graph.system_idtf(first).as_deref(), Some("concept_set"));
    }

    #[test]
    fn duplicate_idtf_rejected() {
        let mut graph = MemoryGraph::new();
        let a = graph.create_node(ElementType::NODE_CONST).expect("node");
        let b = graph.create_node(ElementType::NODE_CONST).expect("node");
        graph.set_system_idtf(a, "name").expect("idtf");
        assert!(graph.set_system_idtf(b, "name").is_err());
    }

    #[test]
    fn delete_releases_idtf() {
        let mut graph = MemoryGraph::new();
        let a = graph
            .resolve_idtf("temp", ElementType::NODE_CONST)
            .expect("resolve");
        graph.delete_element(a).expect("delete");
        assert_eq!(graph.find_by_idtf("temp"), None);
    }

    #[test]
    fn subscriptions_fire_on_edge_creation_and_removal() {
        let mut graph = MemoryGraph::new();
        let a = graph.create_node(ElementType::NODE_CONST).expect("node");
        let b = graph.create_node(ElementType::NODE_CONST).expect("node");
        let (log, sink) = recorder();

        let add = graph
            .subscribe(EventKind::AddOutgoingEdge, a, Arc::clone(&sink))
            .expect("subscribe");
        let remove = graph
            .subscribe(EventKind::RemoveIngoingEdge, b, sink)
            .expect("subscribe");

        let e = graph
            .create_edge(ElementType::EDGE_ACCESS_CONST_POS_PERM, a, b)
            .expect("edge");
        graph.delete_element(e).expect("delete");

        let events = log.lock().expect("lock").clone();
        assert_eq!(
            events,
            vec![
                ElementEvent {
                    id: add,
                    subject: a,
                    edge: e,
                    other: b
                },
                ElementEvent {
                    id: remove,
                    subject: b,
                    edge: e,
                    other: a
                },
            ]
        );
    }

    #[test]
    fn held_events_delivered_or_discarded_on_release() {
        let mut graph = MemoryGraph::new();
        let a = graph.create_node(ElementType::NODE_CONST).expect("node");
        let b = graph.create_node(ElementType::NODE_CONST).expect("node");
        let (log, sink) = recorder();
        graph
            .subscribe(EventKind::AddOutgoingEdge, a, sink)
            .expect("subscribe");

        graph.hold_events();
        let kept = graph
            .create_edge(ElementType::EDGE_ACCESS_CONST_POS_PERM, a, b)
            .expect("edge");
        assert!(log.lock().expect("lock").is_empty());
        graph.release_events(true);
        assert_eq!(log.lock().expect("lock").len(), 1);
        assert_eq!(log.lock().expect("lock")[0].edge, kept);

        graph.hold_events();
        graph
            .create_edge(ElementType::EDGE_ACCESS_CONST_POS_PERM, a, b)
            .expect("edge");
        graph.release_events(false);
        assert_eq!(log.lock().expect("lock").len(), 1);

        // Delivery is immediate again once released.
        graph
            .create_edge(ElementType::EDGE_ACCESS_CONST_POS_PERM, a, b)
            .expect("edge");
        assert_eq!(log.lock().expect("lock").len(), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut graph = MemoryGraph::new();
        let link = graph.create_link(ElementType::LINK_CONST).expect("link");
        let (log, sink) = recorder();
        let id = graph
            .subscribe(EventKind::ContentChange, link, sink)
            .expect("subscribe");

        graph.set_content(link, LinkContent::Int(1)).expect("set");
        assert!(graph.unsubscribe(id));
        graph.set_content(link, LinkContent::Int(2)).expect("set");

        assert_eq!(log.lock().expect("lock").len(), 1);
        assert!(!graph.unsubscribe(id));
    }

    #[test]
    fn delete_event_drops_subscription() {
        let mut graph = MemoryGraph::new();
        let a = graph.create_node(ElementType::NODE_CONST).expect("node");
        let (log, sink) = recorder();
        graph
            .subscribe(EventKind::DeleteElement, a, sink)
            .expect("subscribe");

        graph.delete_element(a).expect("delete");

        assert_eq!(log.lock().expect("lock").len(), 1);
        assert_eq!(graph.stats().subscriptions, 0);
    }

    #[test]
    fn serializable_graph_roundtrip() {
        let mut graph = MemoryGraph::new();
        let a = graph
            .resolve_idtf("alpha", ElementType::NODE_CONST)
            .expect("resolve");
        let link = graph.create_link(ElementType::LINK_CONST).expect("link");
        graph
            .set_content(link, LinkContent::String("hello".into()))
            .expect("set");
        let e = graph
            .create_edge(ElementType::EDGE_ACCESS_CONST_POS_PERM, a, link)
            .expect("edge");

        let restored = MemoryGraph::from(SerializableGraph::from(&graph));

        assert_eq!(restored.stats(), graph.stats());
        assert_eq!(restored.outgoing(a), vec![e]);
        assert_eq!(restored.find_by_idtf("alpha"), Some(a));
        assert_eq!(
            restored.content(link),
            Some(LinkContent::String("hello".into()))
        );
        assert_eq!(restored.next_addr(), graph.next_addr());
    }
}
