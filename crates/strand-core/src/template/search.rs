//! # Template Search
//!
//! Exhaustive backtracking search for every embedding of a template.
//!
//! Triples are matched in declaration order. Each triple is anchored on
//! whichever of its slots is already bound: a bound edge is checked
//! directly, a bound source enumerates outgoing edges, a bound target
//! enumerates incoming edges. The first triple may have no bound slot, in
//! which case every edge in the store is a candidate.
//!
//! The search keeps an explicit stack of frames instead of recursing. Each
//! frame owns the candidate edges for one triple, the index of the next
//! candidate, and the positions its current candidate bound, which are
//! released before the next candidate is tried.

use crate::graph::GraphStore;
use crate::primitives::{MAX_SEARCH_RESULTS, TRIPLE_ARITY};
use crate::template::params::check_binding;
use crate::template::{Binding, MatchResult, Template};
use crate::{Addr, StrandError};
use std::collections::BTreeMap;

/// Find every embedding of `template` in `store`.
pub fn search<G: GraphStore + ?Sized>(
    store: &G,
    template: &Template,
) -> Result<MatchResult, StrandError> {
    search_with(store, template, &BTreeMap::new())
}

/// Find every embedding of `template` consistent with `bindings`.
///
/// # Errors
///
/// - `InvalidBinding` for content bindings, unknown aliases, or bound
///   elements that are missing or of the wrong type
/// - `UnsupportedTemplateShape` if a triple cannot be anchored
pub fn search_with<G: GraphStore + ?Sized>(
    store: &G,
    template: &Template,
    bindings: &BTreeMap<String, Binding>,
) -> Result<MatchResult, StrandError> {
    run(store, template, bindings, MAX_SEARCH_RESULTS)
}

struct Frame {
    triple: usize,
    candidates: Vec<Addr>,
    next: usize,
    bound: Vec<usize>,
}

fn run<G: GraphStore + ?Sized>(
    store: &G,
    template: &Template,
    bindings: &BTreeMap<String, Binding>,
    limit: usize,
) -> Result<MatchResult, StrandError> {
    let mut assignment = template.initial_assignment();
    let mut prebound = Vec::with_capacity(bindings.len());
    for (alias, binding) in bindings {
        let Binding::Addr(addr) = binding else {
            return Err(StrandError::InvalidBinding(format!(
                "alias '{}' is bound to content, which search cannot use",
                alias
            )));
        };
        let pos = check_binding(template, store, alias, *addr)?;
        assignment[pos] = *addr;
        prebound.push(pos);
    }
    template.check_shape(&prebound)?;

    let mut result = MatchResult {
        aliases: template.aliases().clone(),
        ..MatchResult::default()
    };
    let triple_count = template.triples().len();

    let mut stack = vec![Frame {
        triple: 0,
        candidates: candidates(store, template, &assignment, 0),
        next: 0,
        bound: Vec::new(),
    }];

    while let Some(frame) = stack.last_mut() {
        for pos in frame.bound.drain(..) {
            assignment[pos] = Addr::EMPTY;
        }
        let Some(&edge) = frame.candidates.get(frame.next) else {
            stack.pop();
            continue;
        };
        frame.next += 1;

        if !bind_edge(
            store,
            template,
            frame.triple,
            edge,
            &mut assignment,
            &mut frame.bound,
        ) {
            continue;
        }

        let depth = frame.triple + 1;
        if depth == triple_count {
            result.rows.push(template.row(&assignment));
            if result.rows.len() >= limit {
                result.truncated = true;
                break;
            }
            continue;
        }

        stack.push(Frame {
            triple: depth,
            candidates: candidates(store, template, &assignment, depth),
            next: 0,
            bound: Vec::new(),
        });
    }

    Ok(result)
}

/// Candidate edges for `triple` under the current assignment.
fn candidates<G: GraphStore + ?Sized>(
    store: &G,
    template: &Template,
    assignment: &[Addr],
    triple: usize,
) -> Vec<Addr> {
    let base = triple * TRIPLE_ARITY;
    let value = |offset: usize| assignment[template.canonical(base + offset)];

    let edge = value(1);
    if edge.is_valid() {
        return vec![edge];
    }
    let source = value(0);
    if source.is_valid() {
        return store.outgoing(source);
    }
    let target = value(2);
    if target.is_valid() {
        return store.incoming(target);
    }
    store.all_edges()
}

/// Try to bind the slots of `triple` to `edge` and its endpoints.
///
/// Newly bound canonical positions are appended to `bound`; on failure the
/// caller releases them.
fn bind_edge<G: GraphStore + ?Sized>(
    store: &G,
    template: &Template,
    triple: usize,
    edge: Addr,
    assignment: &mut [Addr],
    bound: &mut Vec<usize>,
) -> bool {
    let Some(info) = store.edge_info(edge) else {
        return false;
    };
    let base = triple * TRIPLE_ARITY;
    let values = [info.source, edge, info.target];

    for (offset, addr) in values.into_iter().enumerate() {
        let pos = base + offset;
        let canon = template.canonical(pos);
        let current = assignment[canon];
        if current.is_valid() {
            if current != addr {
                return false;
            }
            continue;
        }
        let Some(actual) = store.element_type(addr) else {
            return false;
        };
        if !template.constraint(pos).accepts(addr, actual) {
            return false;
        }
        assignment[canon] = addr;
        bound.push(canon);
    }
    true
}

// =============================================================================
// TESTS
// =============================================================================
