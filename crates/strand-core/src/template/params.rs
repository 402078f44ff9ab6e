//! # Template Params
//!
//! Caller-supplied alias bindings.
//!
//! A param binds an alias to an element given by address, by system
//! identifier, or as link content to be materialized. Identifiers are
//! resolved here; content is carried through untouched so that only
//! generate creates the link.

use crate::graph::GraphStore;
use crate::template::{Constraint, Template};
use crate::{Addr, LinkContent, StrandError};
use std::collections::BTreeMap;

/// A raw param value as received from the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Addr(Addr),
    Idtf(String),
    Content(LinkContent),
}

/// Alias to raw param value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateParams {
    entries: BTreeMap<String, ParamValue>,
}

impl TemplateParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding, replacing any earlier binding of the same alias.
    pub fn insert(&mut self, alias: impl Into<String>, value: ParamValue) {
        self.entries.insert(alias.into(), value);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, alias: impl Into<String>, value: ParamValue) -> Self {
        self.insert(alias, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.entries.iter()
    }
}

/// A resolved binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Addr(Addr),
    Content(LinkContent),
}

/// Resolve `params` against `template`.
///
/// Identifiers are looked up in `store`; addresses are taken as given.
///
/// # Errors
///
/// `InvalidBinding` if an alias is not declared by the template or an
/// identifier does not resolve.
pub fn resolve_params<G: GraphStore + ?Sized>(
    params: &TemplateParams,
    template: &Template,
    store: &G,
) -> Result<BTreeMap<String, Binding>, StrandError> {
    let mut resolved = BTreeMap::new();
    for (alias, value) in params.iter() {
        if template.alias_position(alias).is_none() {
            return Err(StrandError::InvalidBinding(format!(
                "alias '{}' is not declared in the template",
                alias
            )));
        }
        let binding = match value {
            ParamValue::Addr(addr) => Binding::Addr(*addr),
            ParamValue::Idtf(idtf) => match store.find_by_idtf(idtf) {
                Some(addr) => Binding::Addr(addr),
                None => {
                    return Err(StrandError::InvalidBinding(format!(
                        "element with identifier '{}' doesn't exist",
                        idtf
                    )));
                }
            },
            ParamValue::Content(content) => Binding::Content(content.clone()),
        };
        resolved.insert(alias.clone(), binding);
    }
    Ok(resolved)
}

/// Check that `addr` may be bound at the declaring position of `alias`.
pub(crate) fn check_binding<G: GraphStore + ?Sized>(
    template: &Template,
    store: &G,
    alias: &str,
    addr: Addr,
) -> Result<usize, StrandError> {
    let pos = template.alias_position(alias).ok_or_else(|| {
        StrandError::InvalidBinding(format!("alias '{}' is not declared in the template", alias))
    })?;
    let actual = store.element_type(addr).ok_or_else(|| {
        StrandError::InvalidBinding(format!(
            "alias '{}' is bound to missing element {}",
            alias, addr
        ))
    })?;
    let constraint = template.constraint(pos);
    if !constraint.accepts(addr, actual) {
        let expected = match constraint {
            Constraint::Fixed(fixed) => format!("element {}", fixed),
            Constraint::Type(ty) => format!("type {}", ty),
        };
        return Err(StrandError::InvalidBinding(format!(
            "alias '{}' expects {}, element {} has type {}",
            alias, expected, addr, actual
        )));
    }
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use crate::template::{Slot, Triple};
    use crate::ElementType;

    fn template(anchor: Addr) -> Template {
        Template::new(vec![Triple::new(
            Slot::addr(anchor),
            Slot::var(ElementType::EDGE_ACCESS_VAR_POS_PERM, "_edge"),
            Slot::var(ElementType::NODE_VAR, "_node"),
        )])
        .expect("valid")
    }

    #[test]
    fn identifiers_resolve_to_addresses() {
        let mut store = MemoryGraph::new();
        let anchor = store.create_node(ElementType::NODE_CONST).expect("node");
        let named = store
            .resolve_idtf("test_param", ElementType::NODE_CONST)
            .expect("resolve");

        let params = TemplateParams::new().with("_node", ParamValue::Idtf("test_param".into()));
        let resolved = resolve_params(&params, &template(anchor), &store).expect("resolve");

        assert_eq!(resolved.get("_node"), Some(&Binding::Addr(named)));
    }

    #[test]
    fn unresolved_identifier_is_invalid_binding() {
        let store = MemoryGraph::new();
        let params = TemplateParams::new().with("_node", ParamValue::Idtf("missing".into()));
        let result = resolve_params(&params, &template(Addr(1)), &store);
        assert!(matches!(result, Err(StrandError::InvalidBinding(_))));
    }

    #[test]
    fn undeclared_alias_is_invalid_binding() {
        let store = MemoryGraph::new();
        let params = TemplateParams::new().with("_other", ParamValue::Addr(Addr(1)));
        let result = resolve_params(&params, &template(Addr(1)), &store);
        assert!(matches!(result, Err(StrandError::InvalidBinding(_))));
    }

    #[test]
    fn content_is_deferred() {
        let store = MemoryGraph::new();
        let params =
            TemplateParams::new().with("_node", ParamValue::Content(LinkContent::Int(3)));
        let resolved = resolve_params(&params, &template(Addr(1)), &store).expect("resolve");
        assert_eq!(
            resolved.get("_node"),
            Some(&Binding::Content(LinkContent::Int(3)))
        );
    }

    #[test]
    fn type_mismatch_detected() {
        let mut store = MemoryGraph::new();
        let node = store.create_node(ElementType::NODE_CONST).expect("node");
        let templ = template(node);

        assert!(check_binding(&templ, &store, "_node", node).is_ok());
        assert!(matches!(
            check_binding(&templ, &store, "_edge", node),
            Err(StrandError::InvalidBinding(_))
        ));
    }
}
