//! # Template Builder
//!
//! Builds a [`Template`] from one of its source forms:
//! an explicit triple list, a struct node (by address or identifier), or
//! the textual triple notation.
//!
//! ## Structure Form
//!
//! The members of a struct are the targets of its membership edges
//! ([`MEMBERSHIP_EDGE_TYPE`]). Every member that is an edge with both
//! endpoints among the members becomes one triple. Variable members become
//! typed slots aliased by their system identifier (or their address in
//! decimal); any other member is a fixed slot.

use crate::graph::GraphStore;
use crate::primitives::MEMBERSHIP_EDGE_TYPE;
use crate::template::text;
use crate::template::{Slot, Template, Triple};
use crate::{Addr, StrandError};
use std::collections::BTreeSet;

/// Where a template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Triples(Vec<Triple>),
    StructAddr(Addr),
    StructIdtf(String),
    Text(String),
}

/// Build a template from `source`.
///
/// # Errors
///
/// - `InvalidTemplateSource` if a struct does not exist, is not a struct,
///   an identifier does not resolve, or the text cannot be compiled
/// - `MalformedTemplate` if the resulting triples are inconsistent
pub fn build_template<G: GraphStore + ?Sized>(
    store: &G,
    source: &TemplateSource,
) -> Result<Template, StrandError> {
    match source {
        TemplateSource::Triples(triples) => Template::new(triples.clone()),
        TemplateSource::StructAddr(addr) => from_struct(store, *addr),
        TemplateSource::StructIdtf(idtf) => {
            let addr = store.find_by_idtf(idtf).ok_or_else(|| {
                StrandError::InvalidTemplateSource(format!(
                    "template with identifier '{}' doesn't exist",
                    idtf
                ))
            })?;
            from_struct(store, addr)
        }
        TemplateSource::Text(source) => text::compile(store, source),
    }
}

fn from_struct<G: GraphStore + ?Sized>(store: &G, addr: Addr) -> Result<Template, StrandError> {
    let ty = store.element_type(addr).ok_or_else(|| {
        StrandError::InvalidTemplateSource(format!("template with addr {} doesn't exist", addr))
    })?;
    if !ty.is_struct() || !ty.is_const() {
        return Err(StrandError::InvalidTemplateSource(format!(
            "element with addr {} isn't structure",
            addr
        )));
    }

    let members: Vec<Addr> = store
        .outgoing(addr)
        .into_iter()
        .filter(|edge| {
            store
                .element_type(*edge)
                .is_some_and(|t| t == MEMBERSHIP_EDGE_TYPE)
        })
        .filter_map(|edge| store.edge_info(edge).map(|info| info.target))
        .collect();
    let member_set: BTreeSet<Addr> = members.iter().copied().collect();

    let edges: Vec<(Addr, Addr, Addr)> = members
        .iter()
        .filter_map(|m| store.edge_info(*m).map(|info| (info.source, *m, info.target)))
        .filter(|(s, _, t)| member_set.contains(s) && member_set.contains(t))
        .collect();

    let mut declared = BTreeSet::new();
    let triples = order_connected(edges, store)
        .into_iter()
        .map(|(s, e, t)| {
            Triple::new(
                member_slot(store, s, &mut declared),
                member_slot(store, e, &mut declared),
                member_slot(store, t, &mut declared),
            )
        })
        .collect();
    Template::new(triples)
}

fn is_var<G: GraphStore + ?Sized>(store: &G, addr: Addr) -> bool {
    store.element_type(addr).is_some_and(|t| t.is_var())
}

fn member_slot<G: GraphStore + ?Sized>(
    store: &G,
    addr: Addr,
    declared: &mut BTreeSet<Addr>,
) -> Slot {
    let Some(ty) = store.element_type(addr).filter(|t| t.is_var()) else {
        return Slot::addr(addr);
    };
    let alias = store
        .system_idtf(addr)
        .unwrap_or_else(|| addr.to_string());
    if declared.insert(addr) {
        Slot::var(ty, alias)
    } else {
        Slot::AliasRef(alias)
    }
}

/// Order member edges so that every edge after the first touches an element
/// already seen, preferring edges anchored on constant elements.
fn order_connected<G: GraphStore + ?Sized>(
    mut pending: Vec<(Addr, Addr, Addr)>,
    store: &G,
) -> Vec<(Addr, Addr, Addr)> {
    let mut ordered = Vec::with_capacity(pending.len());
    let mut seen: BTreeSet<Addr> = BTreeSet::new();

    while !pending.is_empty() {
        let anchored = |(s, e, t): &(Addr, Addr, Addr)| {
            [*s, *e, *t]
                .iter()
                .any(|a| seen.contains(a) || !is_var(store, *a))
        };
        let next = pending
            .iter()
            .position(|triple| {
                let (s, e, t) = *triple;
                [s, e, t].iter().any(|a| seen.contains(a))
            })
            .or_else(|| pending.iter().position(anchored))
            .unwrap_or(0);
        let triple = pending.remove(next);
        seen.extend([triple.0, triple.1, triple.2]);
        ordered.push(triple);
    }
    ordered
}
