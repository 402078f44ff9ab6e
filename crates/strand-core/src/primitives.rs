//! # Engine Primitives
//!
//! Hardcoded runtime constants for the Strand engine.
//! These are compiled into the binary and are immutable at runtime.

use crate::ElementType;

/// Magic bytes for the Strand snapshot header.
///
/// - File Header = Magic Bytes ("STRD") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"STRD";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

/// Edge type connecting a struct node to each of its members.
pub const MEMBERSHIP_EDGE_TYPE: ElementType = ElementType::EDGE_ACCESS_CONST_POS_PERM;

/// Number of result positions contributed by one triple.
pub const TRIPLE_ARITY: usize = 3;

/// Maximum number of triples in one template.
pub const MAX_TEMPLATE_TRIPLES: usize = 256;

/// Maximum number of rows a single search may produce.
///
/// Search is exhaustive backtracking with no timeout; this cap bounds the
/// output of wildcard-heavy templates.
pub const MAX_SEARCH_RESULTS: usize = 100_000;

/// Maximum length of a system identifier.
pub const MAX_IDTF_LENGTH: usize = 1024;

/// Maximum length of string link content (1 MB).
pub const MAX_CONTENT_LENGTH: usize = 1024 * 1024;

/// Maximum number of items in one batch request.
pub const MAX_BATCH_ITEMS: usize = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"STRD");
    }

    #[test]
    fn membership_edge_is_const_access() {
        assert!(MEMBERSHIP_EDGE_TYPE.is_edge());
        assert!(MEMBERSHIP_EDGE_TYPE.is_const());
    }
}
