//! # Core Type Definitions
//!
//! This module contains all core types for the Strand graph store:
//! - Element addresses (`Addr`)
//! - Element type descriptors (`ElementType`), which double as template
//!   slot constraints
//! - Link content (`LinkContent`)
//! - Error types (`StrandError`)
//!
//! ## Type Codes
//!
//! `ElementType` is a bitmask whose integer value is the wire type code.
//! Category bits (node, link, edge kinds) are mutually exclusive; the
//! remaining bits qualify constancy, positivity, permanency (edges) or
//! structural role (nodes).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ADDRESSES
// =============================================================================

/// Opaque, process-unique identifier of a graph element.
///
/// `Addr(0)` is never minted and is used on the wire to mean "no element".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Addr(pub u64);

impl Addr {
    /// The invalid address.
    pub const EMPTY: Self = Self(0);

    /// Whether this address could refer to an element.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Get the raw wire value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// ELEMENT TYPES
// =============================================================================

/// Element type descriptor.
///
/// Used both to classify concrete elements and to constrain template slots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ElementType(pub u16);

impl ElementType {
    // Category bits
    pub const NODE_BIT: u16 = 0x1;
    pub const LINK_BIT: u16 = 0x2;
    pub const UEDGE_COMMON_BIT: u16 = 0x4;
    pub const DEDGE_COMMON_BIT: u16 = 0x8;
    pub const EDGE_ACCESS_BIT: u16 = 0x10;

    // Constancy
    pub const CONST_BIT: u16 = 0x20;
    pub const VAR_BIT: u16 = 0x40;

    // Edge qualifiers
    pub const EDGE_POS_BIT: u16 = 0x80;
    pub const EDGE_NEG_BIT: u16 = 0x100;
    pub const EDGE_FUZ_BIT: u16 = 0x200;
    pub const EDGE_TEMP_BIT: u16 = 0x400;
    pub const EDGE_PERM_BIT: u16 = 0x800;

    // Node qualifiers (share bit values with edge qualifiers)
    pub const NODE_TUPLE_BIT: u16 = 0x80;
    pub const NODE_STRUCT_BIT: u16 = 0x100;
    pub const NODE_ROLE_BIT: u16 = 0x200;
    pub const NODE_NOROLE_BIT: u16 = 0x400;
    pub const NODE_CLASS_BIT: u16 = 0x800;
    pub const NODE_ABSTRACT_BIT: u16 = 0x1000;
    pub const NODE_MATERIAL_BIT: u16 = 0x2000;

    // Masks
    pub const ELEMENT_MASK: u16 = Self::NODE_BIT
        | Self::LINK_BIT
        | Self::UEDGE_COMMON_BIT
        | Self::DEDGE_COMMON_BIT
        | Self::EDGE_ACCESS_BIT;
    pub const EDGE_MASK: u16 =
        Self::UEDGE_COMMON_BIT | Self::DEDGE_COMMON_BIT | Self::EDGE_ACCESS_BIT;
    pub const CONSTANCY_MASK: u16 = Self::CONST_BIT | Self::VAR_BIT;
    pub const POSITIVITY_MASK: u16 = Self::EDGE_POS_BIT | Self::EDGE_NEG_BIT | Self::EDGE_FUZ_BIT;
    pub const PERMANENCY_MASK: u16 = Self::EDGE_TEMP_BIT | Self::EDGE_PERM_BIT;
    pub const NODE_STRUCT_MASK: u16 = Self::NODE_TUPLE_BIT
        | Self::NODE_STRUCT_BIT
        | Self::NODE_ROLE_BIT
        | Self::NODE_NOROLE_BIT
        | Self::NODE_CLASS_BIT
        | Self::NODE_ABSTRACT_BIT
        | Self::NODE_MATERIAL_BIT;

    pub const UNKNOWN: Self = Self(0);

    pub const NODE: Self = Self(Self::NODE_BIT);
    pub const NODE_CONST: Self = Self(Self::NODE_BIT | Self::CONST_BIT);
    pub const NODE_VAR: Self = Self(Self::NODE_BIT | Self::VAR_BIT);
    pub const NODE_CONST_STRUCT: Self = Self(Self::NODE_CONST.0 | Self::NODE_STRUCT_BIT);
    pub const NODE_CONST_CLASS: Self = Self(Self::NODE_CONST.0 | Self::NODE_CLASS_BIT);
    pub const NODE_CONST_ABSTRACT: Self = Self(Self::NODE_CONST.0 | Self::NODE_ABSTRACT_BIT);
    pub const NODE_CONST_TUPLE: Self = Self(Self::NODE_CONST.0 | Self::NODE_TUPLE_BIT);
    pub const NODE_CONST_ROLE: Self = Self(Self::NODE_CONST.0 | Self::NODE_ROLE_BIT);
    pub const NODE_VAR_STRUCT: Self = Self(Self::NODE_VAR.0 | Self::NODE_STRUCT_BIT);
    pub const NODE_VAR_CLASS: Self = Self(Self::NODE_VAR.0 | Self::NODE_CLASS_BIT);

    pub const LINK: Self = Self(Self::LINK_BIT);
    pub const LINK_CONST: Self = Self(Self::LINK_BIT | Self::CONST_BIT);
    pub const LINK_VAR: Self = Self(Self::LINK_BIT | Self::VAR_BIT);

    pub const EDGE_UCOMMON: Self = Self(Self::UEDGE_COMMON_BIT);
    pub const EDGE_DCOMMON: Self = Self(Self::DEDGE_COMMON_BIT);
    pub const EDGE_DCOMMON_CONST: Self = Self(Self::DEDGE_COMMON_BIT | Self::CONST_BIT);
    pub const EDGE_DCOMMON_VAR: Self = Self(Self::DEDGE_COMMON_BIT | Self::VAR_BIT);
    pub const EDGE_ACCESS: Self = Self(Self::EDGE_ACCESS_BIT);
    pub const EDGE_ACCESS_CONST_POS_PERM: Self = Self(
        Self::EDGE_ACCESS_BIT | Self::CONST_BIT | Self::EDGE_POS_BIT | Self::EDGE_PERM_BIT,
    );
    pub const EDGE_ACCESS_CONST_POS_TEMP: Self = Self(
        Self::EDGE_ACCESS_BIT | Self::CONST_BIT | Self::EDGE_POS_BIT | Self::EDGE_TEMP_BIT,
    );
    pub const EDGE_ACCESS_CONST_NEG_PERM: Self = Self(
        Self::EDGE_ACCESS_BIT | Self::CONST_BIT | Self::EDGE_NEG_BIT | Self::EDGE_PERM_BIT,
    );
    pub const EDGE_ACCESS_VAR_POS_PERM: Self = Self(
        Self::EDGE_ACCESS_BIT | Self::VAR_BIT | Self::EDGE_POS_BIT | Self::EDGE_PERM_BIT,
    );
    pub const EDGE_ACCESS_VAR_POS_TEMP: Self = Self(
        Self::EDGE_ACCESS_BIT | Self::VAR_BIT | Self::EDGE_POS_BIT | Self::EDGE_TEMP_BIT,
    );
    pub const EDGE_ACCESS_VAR_NEG_PERM: Self = Self(
        Self::EDGE_ACCESS_BIT | Self::VAR_BIT | Self::EDGE_NEG_BIT | Self::EDGE_PERM_BIT,
    );

    /// Create a type from its wire code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the raw wire code.
    #[must_use]
    pub const fn code(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn is_unknown(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_node(self) -> bool {
        self.0 & Self::NODE_BIT != 0
    }

    #[must_use]
    pub const fn is_link(self) -> bool {
        self.0 & Self::LINK_BIT != 0
    }

    #[must_use]
    pub const fn is_edge(self) -> bool {
        self.0 & Self::EDGE_MASK != 0
    }

    #[must_use]
    pub const fn is_const(self) -> bool {
        self.0 & Self::CONST_BIT != 0
    }

    #[must_use]
    pub const fn is_var(self) -> bool {
        self.0 & Self::VAR_BIT != 0
    }

    #[must_use]
    pub const fn is_struct(self) -> bool {
        self.is_node() && self.0 & Self::NODE_STRUCT_BIT != 0
    }

    /// Exactly one category bit is set.
    #[must_use]
    pub const fn has_single_category(self) -> bool {
        (self.0 & Self::ELEMENT_MASK).count_ones() == 1
    }

    /// The constant counterpart of this type: the var bit replaced by const.
    ///
    /// Types without the var bit are returned unchanged.
    #[must_use]
    pub const fn to_const(self) -> Self {
        if self.is_var() {
            Self((self.0 & !Self::VAR_BIT) | Self::CONST_BIT)
        } else {
            self
        }
    }

    /// Whether a concrete element of type `concrete` satisfies this type
    /// used as a template constraint.
    ///
    /// The concrete type must carry every bit of the constant form of the
    /// pattern; `UNKNOWN` matches anything.
    #[must_use]
    pub const fn matches(self, concrete: Self) -> bool {
        let required = self.to_const().0;
        concrete.0 & required == required
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

// =============================================================================
// LINK CONTENT
// =============================================================================

/// Scalar content carried by a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LinkContent {
    Int(i64),
    Float(f64),
    String(String),
}

impl LinkContent {
    /// Wire name of the content kind.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Strand engine.
///
/// Every variant is recoverable; callers surface them as failed replies.
#[derive(Debug, Error)]
pub enum StrandError {
    /// A struct or identifier used as template source cannot be used.
    #[error("Invalid template source: {0}")]
    InvalidTemplateSource(String),

    /// Triples are structurally inconsistent.
    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    /// A triple past the first has no slot bound by any earlier triple.
    #[error("Unsupported template shape: triple {0} has no bound slot")]
    UnsupportedTemplateShape(usize),

    /// A caller-supplied alias binding is unknown or has the wrong type.
    #[error("Invalid binding: {0}")]
    InvalidBinding(String),

    /// The address does not refer to a live element.
    #[error("Element not found: {0}")]
    ElementNotFound(Addr),

    /// A type code is not usable for the requested element kind.
    #[error("Invalid element type: {0}")]
    InvalidType(ElementType),

    /// The wire operation is not known.
    #[error("Unsupported request type: {0}")]
    UnsupportedRequest(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_addr_is_invalid() {
        assert!(!Addr::EMPTY.is_valid());
        assert!(Addr(7).is_valid());
    }

    #[test]
    fn var_pattern_matches_const_element() {
        assert!(ElementType::NODE_VAR.matches(ElementType::NODE_CONST));
        assert!(ElementType::NODE_VAR.matches(ElementType::NODE_CONST_CLASS));
        assert!(!ElementType::NODE_VAR.matches(ElementType::NODE_VAR));
        assert!(!ElementType::NODE_VAR.matches(ElementType::LINK_CONST));
    }

    #[test]
    fn edge_pattern_respects_permanency() {
        let pattern = ElementType::EDGE_ACCESS_VAR_POS_TEMP;
        assert!(pattern.matches(ElementType::EDGE_ACCESS_CONST_POS_TEMP));
        assert!(!pattern.matches(ElementType::EDGE_ACCESS_CONST_POS_PERM));
    }

    #[test]
    fn unknown_matches_anything() {
        assert!(ElementType::UNKNOWN.matches(ElementType::NODE_CONST));
        assert!(ElementType::UNKNOWN.matches(ElementType::EDGE_ACCESS_CONST_POS_PERM));
    }

    #[test]
    fn to_const_swaps_constancy() {
        assert_eq!(
            ElementType::EDGE_ACCESS_VAR_POS_PERM.to_const(),
            ElementType::EDGE_ACCESS_CONST_POS_PERM
        );
        assert_eq!(ElementType::NODE_CONST.to_const(), ElementType::NODE_CONST);
    }

    #[test]
    fn category_predicates() {
        assert!(ElementType::NODE_CONST_STRUCT.is_struct());
        assert!(!ElementType::EDGE_ACCESS_CONST_NEG_PERM.is_struct());
        assert!(ElementType::LINK_CONST.is_link());
        assert!(ElementType::EDGE_DCOMMON_CONST.is_edge());
        assert!(!ElementType::UNKNOWN.has_single_category());
        assert!(ElementType::NODE_VAR.has_single_category());
    }

    #[test]
    fn content_kind_names() {
        assert_eq!(LinkContent::Int(45).kind_name(), "int");
        assert_eq!(LinkContent::Float(1.5).kind_name(), "float");
        assert_eq!(LinkContent::String("x".into()).kind_name(), "string");
    }
}
