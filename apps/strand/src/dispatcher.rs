//! # Request Dispatcher
//!
//! Executes decoded requests against a [`GraphStore`] and renders replies.
//!
//! The dispatcher is synchronous: the transport takes the store lock, hands
//! the store and the connection's [`SubscriptionRegistry`] in, and sends back
//! whatever [`Reply`] comes out. Every request is one unit of work; no error
//! escapes as anything but a `status: false` reply.

use crate::protocol::{
    ContentCommand, CreateItem, EdgeEnd, Envelope, EventsRequest, KeynodeCommand, Reply, Request,
    TemplateRequest, content_from_json, content_to_json, recover_id,
};
use crate::subscriptions::SubscriptionRegistry;
use serde_json::{Value, json};
use strand_core::primitives::MAX_BATCH_ITEMS;
use strand_core::{
    Addr, ElementType, EventId, EventKind, GraphStore, LinkContent, StrandError, build_template,
    generate, resolve_params, search_with,
};

/// Decode `text`, execute it and build the reply.
pub fn dispatch<G: GraphStore + ?Sized>(
    store: &mut G,
    registry: &mut SubscriptionRegistry,
    text: &str,
) -> Reply {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            let id = recover_id(text);
            tracing::warn!(id, error = %e, "undecodable request");
            return Reply::error(id, format!("Malformed request: {}", e));
        }
    };

    let id = envelope.id;
    let request = match Request::decode(&envelope.kind, envelope.payload) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(id, kind = %envelope.kind, error = %e, "undecodable payload");
            return Reply::error(id, e.to_string());
        }
    };

    let kind = request.kind().to_owned();
    match execute(store, registry, request) {
        Ok(payload) => {
            tracing::debug!(id, kind = %kind, status = true, "request handled");
            Reply::ok(id, payload)
        }
        Err(e) => {
            tracing::warn!(id, kind = %kind, error = %e, "request failed");
            Reply::error(id, e.to_string())
        }
    }
}

/// Execute one decoded request, returning the reply payload.
pub fn execute<G: GraphStore + ?Sized>(
    store: &mut G,
    registry: &mut SubscriptionRegistry,
    request: Request,
) -> Result<Value, StrandError> {
    match request {
        Request::Keynodes(items) => batch(items, |item| keynode(store, item)),
        Request::CreateElements(items) => create_elements(store, items),
        Request::CheckElements(items) => batch(items, |item| check_element(&*store, item)),
        Request::DeleteElements(items) => delete_elements(store, items),
        Request::SearchTemplate(request) => search_template(&*store, &request),
        Request::GenerateTemplate(request) => generate_template(store, &request),
        Request::Content(items) => batch(items, |item| content(store, item)),
        Request::Events(request) => events(store, registry, request),
        Request::Unknown(kind) => Err(StrandError::UnsupportedRequest(kind)),
    }
}

// =============================================================================
// BATCH OPERATIONS
// =============================================================================

fn check_batch(items: &[Value]) -> Result<(), StrandError> {
    if items.len() > MAX_BATCH_ITEMS {
        return Err(StrandError::SerializationError(format!(
            "batch of {} items exceeds the limit of {}",
            items.len(),
            MAX_BATCH_ITEMS
        )));
    }
    Ok(())
}

fn batch<F>(items: Vec<Value>, mut op: F) -> Result<Value, StrandError>
where
    F: FnMut(Value) -> Value,
{
    check_batch(&items)?;
    Ok(Value::Array(items.into_iter().map(&mut op).collect()))
}

fn keynode<G: GraphStore + ?Sized>(store: &mut G, item: Value) -> Value {
    let addr = match serde_json::from_value::<KeynodeCommand>(item) {
        Ok(KeynodeCommand::Find { idtf }) => store.find_by_idtf(&idtf).unwrap_or(Addr::EMPTY),
        Ok(KeynodeCommand::Resolve { idtf, el_type }) => store
            .resolve_idtf(&idtf, ElementType::new(el_type))
            .unwrap_or(Addr::EMPTY),
        Err(_) => Addr::EMPTY,
    };
    json!(addr.0)
}

fn check_element<G: GraphStore + ?Sized>(store: &G, item: Value) -> Value {
    let code = item
        .as_u64()
        .and_then(|a| store.element_type(Addr(a)))
        .map_or(0, ElementType::code);
    json!(code)
}

fn create_elements<G: GraphStore + ?Sized>(
    store: &mut G,
    items: Vec<Value>,
) -> Result<Value, StrandError> {
    check_batch(&items)?;
    let mut created: Vec<Addr> = Vec::with_capacity(items.len());
    for item in items {
        let addr = serde_json::from_value::<CreateItem>(item)
            .map_err(|e| StrandError::SerializationError(e.to_string()))
            .and_then(|item| create_one(store, &created, item))
            .unwrap_or(Addr::EMPTY);
        created.push(addr);
    }
    Ok(json!(created.iter().map(|a| a.0).collect::<Vec<_>>()))
}

fn create_one<G: GraphStore + ?Sized>(
    store: &mut G,
    created: &[Addr],
    item: CreateItem,
) -> Result<Addr, StrandError> {
    match item {
        CreateItem::Node { ty } => store.create_node(ElementType::new(ty)),
        CreateItem::Link { ty, content } => {
            let ty = ElementType::new(ty);
            let ty = if ty.is_link() { ty } else { ElementType::LINK_CONST };
            let content = content_from_json(None, &content).ok_or_else(|| {
                StrandError::InvalidBinding("unsupported link content".to_string())
            })?;
            let link = store.create_link(ty)?;
            if let Err(e) = store.set_content(link, content) {
                store.delete_element(link)?;
                return Err(e);
            }
            Ok(link)
        }
        CreateItem::Edge { ty, src, trg } => {
            let source = edge_end(created, src)?;
            let target = edge_end(created, trg)?;
            store.create_edge(ElementType::new(ty), source, target)
        }
    }
}

fn edge_end(created: &[Addr], end: EdgeEnd) -> Result<Addr, StrandError> {
    match end {
        EdgeEnd::Addr(a) => Ok(Addr(a)),
        EdgeEnd::Ref(index) => created
            .get(index)
            .copied()
            .filter(|a| a.is_valid())
            .ok_or_else(|| {
                StrandError::InvalidBinding(format!("ref {} does not name a created element", index))
            }),
    }
}

fn delete_elements<G: GraphStore + ?Sized>(
    store: &mut G,
    items: Vec<Value>,
) -> Result<Value, StrandError> {
    check_batch(&items)?;
    let mut all_deleted = true;
    for item in items {
        let deleted = item
            .as_u64()
            .is_some_and(|a| store.delete_element(Addr(a)).unwrap_or(false));
        all_deleted &= deleted;
    }
    Ok(json!(all_deleted))
}

fn content<G: GraphStore + ?Sized>(store: &mut G, item: Value) -> Value {
    match serde_json::from_value::<ContentCommand>(item) {
        Ok(ContentCommand::Set { addr, kind, data }) => {
            let ok = content_from_json(kind.as_deref(), &data)
                .is_some_and(|c| store.set_content(Addr(addr), c).is_ok());
            json!(ok)
        }
        Ok(ContentCommand::Get { addr }) => content_to_json(store.content(Addr(addr)).as_ref()),
        Ok(ContentCommand::Find { kind, data }) => {
            let found: Vec<u64> = content_from_json(kind.as_deref(), &data)
                .map(|c: LinkContent| store.find_links_by_content(&c))
                .unwrap_or_default()
                .into_iter()
                .map(|a| a.0)
                .collect();
            json!(found)
        }
        Err(_) => Value::Bool(false),
    }
}

// =============================================================================
// TEMPLATES
// =============================================================================

fn search_template<G: GraphStore + ?Sized>(
    store: &G,
    request: &TemplateRequest,
) -> Result<Value, StrandError> {
    let template = build_template(store, &request.source)?;
    let bindings = resolve_params(&request.params, &template, store)?;
    let result = search_with(store, &template, &bindings)?;
    if result.truncated {
        tracing::warn!(rows = result.len(), "search result truncated");
    }
    let rows: Vec<Vec<u64>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|a| a.0).collect())
        .collect();
    Ok(json!({"aliases": result.aliases, "addrs": rows}))
}

fn generate_template<G: GraphStore + ?Sized>(
    store: &mut G,
    request: &TemplateRequest,
) -> Result<Value, StrandError> {
    let template = build_template(&*store, &request.source)?;
    let bindings = resolve_params(&request.params, &template, &*store)?;
    let result = generate(store, &template, &bindings)?;
    let addrs: Vec<u64> = result.addrs.iter().map(|a| a.0).collect();
    Ok(json!({"aliases": result.aliases, "addrs": addrs}))
}

// =============================================================================
// EVENTS
// =============================================================================

fn events<G: GraphStore + ?Sized>(
    store: &mut G,
    registry: &mut SubscriptionRegistry,
    request: EventsRequest,
) -> Result<Value, StrandError> {
    if request.create.len() + request.delete.len() > MAX_BATCH_ITEMS {
        return Err(StrandError::SerializationError(format!(
            "events request exceeds the limit of {} items",
            MAX_BATCH_ITEMS
        )));
    }

    for id in request.delete {
        registry.unsubscribe(store, EventId(id));
    }

    let created: Vec<u64> = request
        .create
        .into_iter()
        .map(|spec| {
            spec.kind
                .parse::<EventKind>()
                .and_then(|kind| registry.subscribe(store, kind, Addr(spec.addr)))
                .map_or(0, |id| id.0)
        })
        .collect();
    Ok(json!(created))
}
