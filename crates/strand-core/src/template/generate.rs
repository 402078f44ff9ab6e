//! # Template Generate
//!
//! Materializes one embedding of a template.
//!
//! Triples are processed in declaration order. Unbound endpoints are created
//! with the constant form of their slot type; every unbound edge slot gets a
//! new edge, even if an equivalent edge already exists. A generate call is
//! all-or-nothing: on any failure every element it created is deleted again.

use crate::graph::GraphStore;
use crate::primitives::TRIPLE_ARITY;
use crate::template::params::check_binding;
use crate::template::{Binding, Constraint, GenerateResult, Template};
use crate::{Addr, ElementType, StrandError};
use std::collections::BTreeMap;

/// Generate `template` in `store`, honoring `bindings`.
///
/// # Errors
///
/// - `InvalidBinding` if a binding names an unknown alias, a missing element,
///   an element of the wrong type, or an edge that does not connect the
///   triple's endpoints
/// - `MalformedTemplate` if a slot cannot be instantiated (untyped, or an
///   edge-typed endpoint that was never bound)
/// - any store error raised while creating elements
///
/// The store is left unchanged when an error is returned. Events fired
/// while generating are held until the call ends: subscribers see them only
/// if it succeeds.
pub fn generate<G: GraphStore + ?Sized>(
    store: &mut G,
    template: &Template,
    bindings: &BTreeMap<String, Binding>,
) -> Result<GenerateResult, StrandError> {
    let mut created = Vec::new();
    store.hold_events();
    let outcome = run(store, template, bindings, &mut created);
    if outcome.is_err() {
        rollback(store, created);
    }
    store.release_events(outcome.is_ok());
    outcome.map(|addrs| GenerateResult {
        aliases: template.aliases().clone(),
        addrs,
    })
}

/// Delete `created` newest first.
fn rollback<G: GraphStore + ?Sized>(store: &mut G, created: Vec<Addr>) {
    for addr in created.into_iter().rev() {
        // `Ok(false)` means a cascade already removed it. A store error
        // leaves nothing further to undo, and the caller gets the error
        // that aborted the generate.
        store.delete_element(addr).ok();
    }
}

fn run<G: GraphStore + ?Sized>(
    store: &mut G,
    template: &Template,
    bindings: &BTreeMap<String, Binding>,
    created: &mut Vec<Addr>,
) -> Result<Vec<Addr>, StrandError> {
    let mut assignment = template.initial_assignment();

    // Validate address bindings before touching the store.
    let mut deferred = Vec::new();
    for (alias, binding) in bindings {
        match binding {
            Binding::Addr(addr) => {
                let pos = check_binding(template, &*store, alias, *addr)?;
                assignment[pos] = *addr;
            }
            Binding::Content(content) => {
                let pos = template.alias_position(alias).ok_or_else(|| {
                    StrandError::InvalidBinding(format!(
                        "alias '{}' is not declared in the template",
                        alias
                    ))
                })?;
                if !template.constraint(pos).accepts(Addr::EMPTY, ElementType::LINK_CONST) {
                    return Err(StrandError::InvalidBinding(format!(
                        "alias '{}' cannot be bound to a link",
                        alias
                    )));
                }
                deferred.push((pos, content.clone()));
            }
        }
    }

    for (pos, content) in deferred {
        let link = store.create_link(ElementType::LINK_CONST)?;
        created.push(link);
        store.set_content(link, content)?;
        assignment[pos] = link;
    }

    for triple in 0..template.triples().len() {
        let base = triple * TRIPLE_ARITY;
        let source = endpoint(store, template, &mut assignment, base, created)?;
        let target = endpoint(store, template, &mut assignment, base + 2, created)?;

        let pos = base + 1;
        let canon = template.canonical(pos);
        let bound = assignment[canon];
        if bound.is_valid() {
            let info = store.edge_info(bound);
            if info.map(|i| (i.source, i.target)) != Some((source, target)) {
                return Err(StrandError::InvalidBinding(format!(
                    "element {} at position {} is not an edge from {} to {}",
                    bound, pos, source, target
                )));
            }
            continue;
        }
        let ty = instantiable(template.constraint(pos), pos)?;
        let edge = store.create_edge(ty, source, target)?;
        created.push(edge);
        assignment[canon] = edge;
    }

    Ok(template.row(&assignment))
}

/// Resolve the endpoint at `pos`, creating it if unbound.
fn endpoint<G: GraphStore + ?Sized>(
    store: &mut G,
    template: &Template,
    assignment: &mut [Addr],
    pos: usize,
    created: &mut Vec<Addr>,
) -> Result<Addr, StrandError> {
    let canon = template.canonical(pos);
    let bound = assignment[canon];
    if bound.is_valid() {
        return Ok(bound);
    }
    let ty = instantiable(template.constraint(pos), pos)?;
    if ty.is_edge() {
        return Err(StrandError::MalformedTemplate(format!(
            "edge-typed slot at position {} is used before its edge is generated",
            pos
        )));
    }
    let addr = store.create_element(ty)?;
    created.push(addr);
    assignment[canon] = addr;
    Ok(addr)
}

/// The concrete type to create for an unbound typed position.
fn instantiable(constraint: Constraint, pos: usize) -> Result<ElementType, StrandError> {
    match constraint {
        Constraint::Type(ty) if !ty.is_unknown() => Ok(ty.to_const()),
        Constraint::Type(_) => Err(StrandError::MalformedTemplate(format!(
            "untyped slot at position {} cannot be generated",
            pos
        ))),
        Constraint::Fixed(addr) => Err(StrandError::ElementNotFound(addr)),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use crate::events::{ElementEvent, EventKind, EventSink};
    use crate::template::{Slot, Triple, search};
    use crate::LinkContent;
    use std::sync::{Arc, Mutex};

    const ACCESS_VAR: ElementType = ElementType::EDGE_ACCESS_VAR_POS_PERM;

    fn star(hub: Addr) -> Template {
        Template::new(vec![Triple::new(
            Slot::addr(hub),
            Slot::var(ACCESS_VAR, "_e"),
            Slot::var(ElementType::NODE_VAR, "_n"),
        )])
        .expect("valid")
    }

    #[test]
    fn creates_const_forms_of_var_types() {
        let mut store = MemoryGraph::new();
        let hub = store.create_node(ElementType::NODE_CONST).expect("node");

        let result = generate(&mut store, &star(hub), &BTreeMap::new()).expect("generate");

        let node = result.get("_n").expect("node");
        let edge = result.get("_e").expect("edge");
        assert_eq!(store.element_type(node), Some(ElementType::NODE_CONST));
        assert_eq!(
            store.element_type(edge),
            Some(ElementType::EDGE_ACCESS_CONST_POS_PERM)
        );
        assert_eq!(result.addrs, vec![hub, edge, node]);
    }

    #[test]
    fn repeated_generation_duplicates() {
        let mut store = MemoryGraph::new();
        let hub = store.create_node(ElementType::NODE_CONST).expect("node");
        let template = star(hub);

        generate(&mut store, &template, &BTreeMap::new()).expect("generate");
        generate(&mut store, &template, &BTreeMap::new()).expect("generate");

        assert_eq!(search(&store, &template).expect("search").len(), 2);
    }

    #[test]
    fn content_binding_creates_link() {
        let mut store = MemoryGraph::new();
        let hub = store.create_node(ElementType::NODE_CONST).expect("node");
        let template = Template::new(vec![Triple::new(
            Slot::addr(hub),
            Slot::ty(ACCESS_VAR),
            Slot::var(ElementType::LINK_VAR, "_link"),
        )])
        .expect("valid");
        let bindings = BTreeMap::from([(
            "_link".to_string(),
            Binding::Content(LinkContent::String("hello".into())),
        )]);

        let result = generate(&mut store, &template, &bindings).expect("generate");

        let link = result.get("_link").expect("link");
        assert_eq!(
            store.content(link),
            Some(LinkContent::String("hello".into()))
        );
    }

    #[test]
    fn failure_rolls_back_everything() {
        let mut store = MemoryGraph::new();
        let hub = store.create_node(ElementType::NODE_CONST).expect("node");
        let before = store.stats();

        // Second triple hangs on an element that does not exist.
        let template = Template::new(vec![
            Triple::new(
                Slot::addr(hub),
                Slot::ty(ACCESS_VAR),
                Slot::var(ElementType::LINK_VAR, "_link"),
            ),
            Triple::new(Slot::addr(Addr(999)), Slot::ty(ACCESS_VAR), Slot::alias("_link")),
        ])
        .expect("valid");
        let bindings = BTreeMap::from([(
            "_link".to_string(),
            Binding::Content(LinkContent::Int(7)),
        )]);

        let result = generate(&mut store, &template, &bindings);

        assert!(matches!(result, Err(StrandError::ElementNotFound(Addr(999)))));
        assert_eq!(store.stats(), before);
        assert!(store.find_links_by_content(&LinkContent::Int(7)).is_empty());
    }

    #[test]
    fn failed_generate_fires_no_events() {
        let mut store = MemoryGraph::new();
        let hub = store.create_node(ElementType::NODE_CONST).expect("node");
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink_log = Arc::clone(&log);
        let sink: Arc<dyn EventSink> = Arc::new(move |event: ElementEvent| {
            if let Ok(mut events) = sink_log.lock() {
                events.push(event);
            }
        });
        store
            .subscribe(EventKind::AddOutgoingEdge, hub, sink)
            .expect("subscribe");

        let failing = Template::new(vec![
            Triple::new(
                Slot::addr(hub),
                Slot::ty(ACCESS_VAR),
                Slot::var(ElementType::NODE_VAR, "_n"),
            ),
            Triple::new(Slot::addr(Addr(999)), Slot::ty(ACCESS_VAR), Slot::alias("_n")),
        ])
        .expect("valid");
        assert!(generate(&mut store, &failing, &BTreeMap::new()).is_err());
        assert!(log.lock().expect("lock").is_empty());

        let result = generate(&mut store, &star(hub), &BTreeMap::new()).expect("generate");
        let events = log.lock().expect("lock").clone();
        assert_eq!(events.len(), 1);
        assert_eq!(Some(events[0].edge), result.get("_e"));
    }

    #[test]
    fn forward_alias_generates_then_matches() {
        let mut store = MemoryGraph::new();
        let a = store.create_node(ElementType::NODE_CONST).expect("node");

        // _x is used by the first triple and declared by the second, which
        // has no fixed slot.
        let template = Template::new(vec![
            Triple::new(Slot::addr(a), Slot::ty(ACCESS_VAR), Slot::alias("_x")),
            Triple::new(
                Slot::var(ElementType::NODE_VAR, "_x"),
                Slot::ty(ACCESS_VAR),
                Slot::var(ElementType::NODE_VAR, "_y"),
            ),
        ])
        .expect("valid");

        let generated = generate(&mut store, &template, &BTreeMap::new()).expect("generate");
        let x = generated.get("_x").expect("x");
        let y = generated.get("_y").expect("y");
        assert_eq!(generated.addrs[2], x);
        assert_eq!(store.outgoing(x).len(), 1);

        let found = search(&store, &template).expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found.get(0, "_x"), Some(x));
        assert_eq!(found.get(0, "_y"), Some(y));
    }

    #[test]
    fn node_bound_to_edge_alias_rejected() {
        let mut store = MemoryGraph::new();
        let hub = store.create_node(ElementType::NODE_CONST).expect("node");
        let other = store.create_node(ElementType::NODE_CONST).expect("node");
        let before = store.stats();

        let bindings = BTreeMap::from([("_e".to_string(), Binding::Addr(other))]);
        let result = generate(&mut store, &star(hub), &bindings);

        assert!(matches!(result, Err(StrandError::InvalidBinding(_))));
        assert_eq!(store.stats(), before);
    }

    #[test]
    fn bound_edge_must_connect_endpoints() {
        let mut store = MemoryGraph::new();
        let hub = store.create_node(ElementType::NODE_CONST).expect("node");
        let a = store.create_node(ElementType::NODE_CONST).expect("node");
        let b = store.create_node(ElementType::NODE_CONST).expect("node");
        let edge = store
            .create_edge(ElementType::EDGE_ACCESS_CONST_POS_PERM, a, b)
            .expect("edge");

        let bindings = BTreeMap::from([("_e".to_string(), Binding::Addr(edge))]);
        let result = generate(&mut store, &star(hub), &bindings);
        assert!(matches!(result, Err(StrandError::InvalidBinding(_))));
    }

    #[test]
    fn edge_between_generated_edge_and_node() {
        let mut store = MemoryGraph::new();
        let a = store.create_node(ElementType::NODE_CONST).expect("node");
        let b = store.create_node(ElementType::NODE_CONST).expect("node");
        let template = Template::new(vec![
            Triple::new(
                Slot::addr(a),
                Slot::var(ACCESS_VAR, "_edge"),
                Slot::var(ElementType::NODE_VAR, "_node"),
            ),
            Triple::new(
                Slot::alias("_node"),
                Slot::ty(ElementType::EDGE_ACCESS_VAR_POS_TEMP),
                Slot::alias("_edge"),
            ),
        ])
        .expect("valid");
        let bindings = BTreeMap::from([("_node".to_string(), Binding::Addr(b))]);

        let result = generate(&mut store, &template, &bindings).expect("generate");

        let edge = result.get("_edge").expect("edge");
        assert_eq!(store.incoming(edge).len(), 1);
        let found = search(&store, &template).expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found.get(0, "_node"), Some(b));
    }
}
