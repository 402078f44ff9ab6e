//! # Template Engine
//!
//! Structural pattern matching over the graph.
//!
//! A [`Template`] is an ordered list of [`Triple`]s. Each triple describes
//! one edge: its source, the edge itself, and its target. Every slot is a
//! fixed address, a typed wildcard (optionally named by an alias), or a
//! reference to an alias declared elsewhere in the template.
//!
//! ## Positions
//!
//! Results are flat rows of addresses. Triple `i` occupies positions
//! `3*i` (source), `3*i + 1` (edge) and `3*i + 2` (target). The alias table
//! maps each alias to the position that declares it; every position naming
//! the same alias holds the same address in every row.
//!
//! ## Operations
//!
//! - [`builder`]: builds templates from triple lists, struct nodes, or text
//! - [`search`]: enumerates every embedding of a template
//! - [`generate`]: materializes one embedding, creating missing elements
//! - [`params`]: resolves caller-supplied alias bindings

pub mod builder;
pub mod generate;
pub mod params;
pub mod result;
pub mod search;
pub mod text;

pub use builder::{TemplateSource, build_template};
pub use generate::generate;
pub use params::{Binding, ParamValue, TemplateParams, resolve_params};
pub use result::{GenerateResult, MatchResult};
pub use search::{search, search_with};

use crate::primitives::{MAX_TEMPLATE_TRIPLES, TRIPLE_ARITY};
use crate::{Addr, ElementType, StrandError};
use std::collections::BTreeMap;

// =============================================================================
// SLOTS AND TRIPLES
// =============================================================================

/// One position of a triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// A concrete element, optionally exposing it under an alias.
    Fixed { addr: Addr, alias: Option<String> },
    /// A wildcard constrained by type, optionally named by an alias.
    Typed { ty: ElementType, alias: Option<String> },
    /// The element bound to an alias declared by another slot.
    AliasRef(String),
}

impl Slot {
    /// Fixed slot without alias.
    #[must_use]
    pub fn addr(addr: Addr) -> Self {
        Self::Fixed { addr, alias: None }
    }

    /// Unnamed typed wildcard.
    #[must_use]
    pub fn ty(ty: ElementType) -> Self {
        Self::Typed { ty, alias: None }
    }

    /// Typed wildcard declaring `alias`.
    #[must_use]
    pub fn var(ty: ElementType, alias: impl Into<String>) -> Self {
        Self::Typed {
            ty,
            alias: Some(alias.into()),
        }
    }

    /// Reference to `alias`.
    #[must_use]
    pub fn alias(alias: impl Into<String>) -> Self {
        Self::AliasRef(alias.into())
    }

    /// The alias this slot declares, if any.
    #[must_use]
    pub fn declared_alias(&self) -> Option<&str> {
        match self {
            Self::Fixed { alias, .. } | Self::Typed { alias, .. } => alias.as_deref(),
            Self::AliasRef(_) => None,
        }
    }
}

/// A (source, edge, target) pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub source: Slot,
    pub edge: Slot,
    pub target: Slot,
}

impl Triple {
    #[must_use]
    pub fn new(source: Slot, edge: Slot, target: Slot) -> Self {
        Self {
            source,
            edge,
            target,
        }
    }

    /// Slots in position order.
    #[must_use]
    pub fn slots(&self) -> [&Slot; TRIPLE_ARITY] {
        [&self.source, &self.edge, &self.target]
    }
}

/// What a position requires of the element bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Exactly this element.
    Fixed(Addr),
    /// Any element whose type satisfies this pattern type.
    Type(ElementType),
}

impl Constraint {
    /// Whether an element of type `actual` at `addr` satisfies the constraint.
    #[must_use]
    pub fn accepts(self, addr: Addr, actual: ElementType) -> bool {
        match self {
            Self::Fixed(fixed) => fixed == addr,
            Self::Type(ty) => ty.matches(actual),
        }
    }
}

// =============================================================================
// TEMPLATE
// =============================================================================

/// A validated, immutable template.
///
/// Besides the triples, it precomputes for every position the canonical
/// position that holds its value (the declaring position for aliased slots)
/// and the constraint that applies there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    triples: Vec<Triple>,
    aliases: BTreeMap<String, usize>,
    canonical: Vec<usize>,
    constraints: Vec<Constraint>,
}

impl Template {
    /// Validate `triples` and build a template.
    ///
    /// # Errors
    ///
    /// `MalformedTemplate` when the list is empty or too long, an alias is
    /// declared twice or referenced without declaration, a typed slot
    /// carries the const bit, or an edge slot is typed as a non-edge.
    pub fn new(triples: Vec<Triple>) -> Result<Self, StrandError> {
        if triples.is_empty() {
            return Err(StrandError::MalformedTemplate(
                "template has no triples".to_string(),
            ));
        }
        if triples.len() > MAX_TEMPLATE_TRIPLES {
            return Err(StrandError::MalformedTemplate(format!(
                "template has {} triples, maximum is {}",
                triples.len(),
                MAX_TEMPLATE_TRIPLES
            )));
        }

        let mut aliases = BTreeMap::new();
        for (pos, slot) in positions(&triples) {
            if let Slot::Typed { ty, .. } = slot {
                if ty.is_const() {
                    return Err(StrandError::MalformedTemplate(format!(
                        "typed slot at position {} has constant type {}",
                        pos, ty
                    )));
                }
                if pos % TRIPLE_ARITY == 1 && !ty.is_unknown() && !ty.is_edge() {
                    return Err(StrandError::MalformedTemplate(format!(
                        "edge slot at position {} has non-edge type {}",
                        pos, ty
                    )));
                }
            }
            if let Some(alias) = slot.declared_alias()
                && aliases.insert(alias.to_string(), pos).is_some()
            {
                return Err(StrandError::MalformedTemplate(format!(
                    "alias '{}' declared more than once",
                    alias
                )));
            }
        }

        let mut canonical = Vec::with_capacity(triples.len() * TRIPLE_ARITY);
        let mut constraints = Vec::with_capacity(triples.len() * TRIPLE_ARITY);
        for (pos, slot) in positions(&triples) {
            let (canon, constraint) = match slot {
                Slot::Fixed { addr, .. } => (pos, Constraint::Fixed(*addr)),
                Slot::Typed { ty, .. } => (pos, Constraint::Type(*ty)),
                Slot::AliasRef(alias) => {
                    let Some(&declared) = aliases.get(alias) else {
                        return Err(StrandError::MalformedTemplate(format!(
                            "alias '{}' is referenced but never declared",
                            alias
                        )));
                    };
                    // Filled below once every declaring constraint is known.
                    (declared, Constraint::Type(ElementType::UNKNOWN))
                }
            };
            canonical.push(canon);
            constraints.push(constraint);
        }
        let constraints: Vec<Constraint> = canonical.iter().map(|&c| constraints[c]).collect();

        Ok(Self {
            triples,
            aliases,
            canonical,
            constraints,
        })
    }

    #[must_use]
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Alias name to declaring position.
    #[must_use]
    pub fn aliases(&self) -> &BTreeMap<String, usize> {
        &self.aliases
    }

    /// Number of positions in a result row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.canonical.len()
    }

    /// The position whose value `pos` shares.
    #[must_use]
    pub fn canonical(&self, pos: usize) -> usize {
        self.canonical[pos]
    }

    /// The constraint applying at `pos`.
    #[must_use]
    pub fn constraint(&self, pos: usize) -> Constraint {
        self.constraints[pos]
    }

    /// Declaring position of `alias`.
    #[must_use]
    pub fn alias_position(&self, alias: &str) -> Option<usize> {
        self.aliases.get(alias).copied()
    }

    /// Check that every triple after the first can be anchored on a slot
    /// bound by an earlier triple, a fixed address, or a pre-bound position.
    ///
    /// A value counts as bound by an earlier triple when any earlier
    /// position shares it, so an alias used before its declaration anchors
    /// the declaring triple.
    ///
    /// # Errors
    ///
    /// `UnsupportedTemplateShape(i)` for the first triple that cannot.
    pub fn check_shape(&self, prebound: &[usize]) -> Result<(), StrandError> {
        let mut first_use = vec![usize::MAX; self.canonical.len()];
        for (pos, &canon) in self.canonical.iter().enumerate() {
            first_use[canon] = first_use[canon].min(pos);
        }
        for index in 1..self.triples.len() {
            let first = index * TRIPLE_ARITY;
            let anchored = (first..first + TRIPLE_ARITY).any(|pos| {
                let canon = self.canonical[pos];
                matches!(self.constraints[pos], Constraint::Fixed(_))
                    || first_use[canon] < first
                    || prebound.contains(&canon)
            });
            if !anchored {
                return Err(StrandError::UnsupportedTemplateShape(index));
            }
        }
        Ok(())
    }

    /// Expand an assignment over canonical positions into a full row.
    pub(crate) fn row(&self, assignment: &[Addr]) -> Vec<Addr> {
        self.canonical.iter().map(|&c| assignment[c]).collect()
    }

    /// Assignment with every fixed position filled in.
    pub(crate) fn initial_assignment(&self) -> Vec<Addr> {
        self.constraints
            .iter()
            .enumerate()
            .map(|(pos, c)| match c {
                Constraint::Fixed(addr) if self.canonical[pos] == pos => *addr,
                _ => Addr::EMPTY,
            })
            .collect()
    }
}

fn positions(triples: &[Triple]) -> impl Iterator<Item = (usize, &Slot)> {
    triples
        .iter()
        .flat_map(|t| t.slots())
        .enumerate()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_var() -> ElementType {
        ElementType::EDGE_ACCESS_VAR_POS_PERM
    }

    #[test]
    fn aliases_map_to_declaring_position() {
        let template = Template::new(vec![
            Triple::new(
                Slot::addr(Addr(1)),
                Slot::var(edge_var(), "_e"),
                Slot::var(ElementType::NODE_VAR, "_n"),
            ),
            Triple::new(
                Slot::alias("_n"),
                Slot::ty(ElementType::EDGE_ACCESS_VAR_POS_TEMP),
                Slot::alias("_e"),
            ),
        ])
        .expect("valid");

        assert_eq!(template.width(), 6);
        assert_eq!(template.alias_position("_e"), Some(1));
        assert_eq!(template.alias_position("_n"), Some(2));
        assert_eq!(template.canonical(3), 2);
        assert_eq!(template.canonical(5), 1);
        assert_eq!(template.constraint(5), Constraint::Type(edge_var()));
    }

    #[test]
    fn forward_alias_reference_allowed() {
        let template = Template::new(vec![
            Triple::new(
                Slot::addr(Addr(1)),
                Slot::ty(edge_var()),
                Slot::alias("_later"),
            ),
            Triple::new(
                Slot::var(ElementType::NODE_VAR, "_later"),
                Slot::ty(edge_var()),
                Slot::addr(Addr(2)),
            ),
        ]);
        assert!(template.is_ok());
    }

    #[test]
    fn forward_reference_anchors_declaring_triple() {
        let template = Template::new(vec![
            Triple::new(Slot::addr(Addr(1)), Slot::ty(edge_var()), Slot::alias("_x")),
            Triple::new(
                Slot::var(ElementType::NODE_VAR, "_x"),
                Slot::ty(edge_var()),
                Slot::var(ElementType::NODE_VAR, "_y"),
            ),
        ])
        .expect("valid");

        assert_eq!(template.canonical(2), 3);
        assert!(template.check_shape(&[]).is_ok());
    }

    #[test]
    fn empty_template_rejected() {
        assert!(matches!(
            Template::new(Vec::new()),
            Err(StrandError::MalformedTemplate(_))
        ));
    }

    #[test]
    fn undeclared_alias_rejected() {
        let result = Template::new(vec![Triple::new(
            Slot::addr(Addr(1)),
            Slot::ty(edge_var()),
            Slot::alias("_ghost"),
        )]);
        assert!(matches!(result, Err(StrandError::MalformedTemplate(_))));
    }

    #[test]
    fn duplicate_declaration_rejected() {
        let result = Template::new(vec![Triple::new(
            Slot::var(ElementType::NODE_VAR, "_x"),
            Slot::ty(edge_var()),
            Slot::var(ElementType::NODE_VAR, "_x"),
        )]);
        assert!(matches!(result, Err(StrandError::MalformedTemplate(_))));
    }

    #[test]
    fn const_typed_slot_rejected() {
        let result = Template::new(vec![Triple::new(
            Slot::addr(Addr(1)),
            Slot::ty(ElementType::EDGE_ACCESS_CONST_POS_PERM),
            Slot::ty(ElementType::NODE_VAR),
        )]);
        assert!(matches!(result, Err(StrandError::MalformedTemplate(_))));
    }

    #[test]
    fn node_typed_edge_slot_rejected() {
        let result = Template::new(vec![Triple::new(
            Slot::addr(Addr(1)),
            Slot::ty(ElementType::NODE_VAR),
            Slot::ty(ElementType::NODE_VAR),
        )]);
        assert!(matches!(result, Err(StrandError::MalformedTemplate(_))));
    }

    #[test]
    fn disconnected_triple_has_unsupported_shape() {
        let template = Template::new(vec![
            Triple::new(
                Slot::addr(Addr(1)),
                Slot::ty(edge_var()),
                Slot::ty(ElementType::NODE_VAR),
            ),
            Triple::new(
                Slot::var(ElementType::NODE_VAR, "_a"),
                Slot::ty(edge_var()),
                Slot::ty(ElementType::NODE_VAR),
            ),
        ])
        .expect("valid");

        assert!(matches!(
            template.check_shape(&[]),
            Err(StrandError::UnsupportedTemplateShape(1))
        ));
        let prebound = template.alias_position("_a").expect("alias");
        assert!(template.check_shape(&[prebound]).is_ok());
    }

    #[test]
    fn initial_assignment_holds_fixed_addresses() {
        let template = Template::new(vec![Triple::new(
            Slot::addr(Addr(9)),
            Slot::ty(edge_var()),
            Slot::ty(ElementType::NODE_VAR),
        )])
        .expect("valid");
        assert_eq!(
            template.initial_assignment(),
            vec![Addr(9), Addr::EMPTY, Addr::EMPTY]
        );
    }
}
