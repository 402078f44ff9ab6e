//! # Textual Templates
//!
//! Compiler for the compact triple notation:
//!
//! ```text
//! concept_set _-> _item;;
//! _item _=>:_rel _other;;
//! ```
//!
//! Each statement is `source connector target;;`. Names starting with `_`
//! are variable nodes aliased by their name; any other name is a system
//! identifier resolved to a fixed element. Connectors:
//!
//! | Connector | Edge type                   |
//! |-----------|-----------------------------|
//! | `_->`     | variable access, pos, perm  |
//! | `_~>`     | variable access, pos, temp  |
//! | `_=>`     | variable directed common    |
//!
//! A connector may be suffixed with `:alias` to name the edge.

use crate::graph::GraphStore;
use crate::template::{Slot, Template, Triple};
use crate::{ElementType, StrandError};
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char as pchar, multispace0};
use nom::combinator::{all_consuming, map, opt, recognize, value};
use nom::multi::many1;
use nom::sequence::{delimited, preceded, terminated, tuple};
use std::collections::BTreeSet;

/// A parsed statement before identifier resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Statement {
    source: String,
    connector: ElementType,
    edge_alias: Option<String>,
    target: String,
}

/// Compile `source` into a template, resolving identifiers against `store`.
pub fn compile<G: GraphStore + ?Sized>(store: &G, source: &str) -> Result<Template, StrandError> {
    let (_, statements) = all_consuming(delimited(multispace0, many1(statement), multispace0))(
        source,
    )
    .map_err(|e| StrandError::InvalidTemplateSource(format!("failed to parse template: {e:?}")))?;

    let mut declared = BTreeSet::new();
    let mut triples = Vec::with_capacity(statements.len());
    for stmt in statements {
        let source = item_slot(store, &stmt.source, &mut declared)?;
        let edge = match stmt.edge_alias {
            Some(alias) => Slot::var(stmt.connector, alias),
            None => Slot::ty(stmt.connector),
        };
        let target = item_slot(store, &stmt.target, &mut declared)?;
        triples.push(Triple::new(source, edge, target));
    }
    Template::new(triples)
}

fn item_slot<G: GraphStore + ?Sized>(
    store: &G,
    name: &str,
    declared: &mut BTreeSet<String>,
) -> Result<Slot, StrandError> {
    if name.starts_with('_') {
        if declared.insert(name.to_string()) {
            return Ok(Slot::var(ElementType::NODE_VAR, name));
        }
        return Ok(Slot::alias(name));
    }
    store.find_by_idtf(name).map(Slot::addr).ok_or_else(|| {
        StrandError::InvalidTemplateSource(format!("identifier '{}' doesn't exist", name))
    })
}

// =============================================================================
// PARSERS
// =============================================================================

fn statement(input: &str) -> IResult<&str, Statement> {
    map(
        terminated(
            tuple((ws(name), ws(connector), ws(name))),
            ws(tag(";;")),
        ),
        |(source, (connector, edge_alias), target)| Statement {
            source,
            connector,
            edge_alias,
            target,
        },
    )(input)
}

fn connector(input: &str) -> IResult<&str, (ElementType, Option<String>)> {
    tuple((
        alt((
            value(ElementType::EDGE_ACCESS_VAR_POS_PERM, tag("_->")),
            value(ElementType::EDGE_ACCESS_VAR_POS_TEMP, tag("_~>")),
            value(ElementType::EDGE_DCOMMON_VAR, tag("_=>")),
        )),
        opt(preceded(pchar(':'), name)),
    ))(input)
}

fn name(input: &str) -> IResult<&str, String> {
    map(
        recognize(tuple((
            take_while1(is_name_start),
            take_while(is_name_continue),
        ))),
        |s: &str| s.to_string(),
    )(input)
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}
