//! # Snapshot Format
//!
//! Binary serialization for Strand graph snapshots.
//!
//! File I/O lives in the app layer; this module only converts between
//! `MemoryGraph` and bytes.
//!
//! Format: Header (5 bytes) + postcard-serialized graph data.
//! - 4 bytes: Magic ("STRD")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is deserialized.

use crate::graph::{MemoryGraph, SerializableGraph};
use crate::{StrandError, primitives};

/// Maximum allowed snapshot size (500 MB).
pub const MAX_SNAPSHOT_SIZE: usize = 500 * 1024 * 1024;

const HEADER_LEN: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The snapshot header precedes all graph data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), StrandError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(StrandError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(StrandError::SerializationError(format!(
                "Unsupported snapshot version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StrandError> {
        let Some(head) = bytes.get(..HEADER_LEN) else {
            return Err(StrandError::SerializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&head[0..4]);
        Ok(Self {
            magic,
            version: head[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a graph to bytes (header + payload).
pub fn graph_to_bytes(graph: &MemoryGraph) -> Result<Vec<u8>, StrandError> {
    let header = PersistenceHeader::new();
    let payload = postcard::to_stdvec(&SerializableGraph::from(graph))
        .map_err(|e| StrandError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a graph from bytes.
///
/// Rejects data shorter than the header, larger than
/// [`MAX_SNAPSHOT_SIZE`], or carrying a foreign magic/version.
pub fn graph_from_bytes(bytes: &[u8]) -> Result<MemoryGraph, StrandError> {
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(StrandError::SerializationError(format!(
            "Snapshot size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(HEADER_LEN..).unwrap_or_default();
    let serializable: SerializableGraph = postcard::from_bytes(payload).map_err(|e| {
        StrandError::SerializationError(format!("Failed to deserialize snapshot: {}", e))
    })?;

    Ok(MemoryGraph::from(serializable))
}

// =============================================================================
// TESTS
// =============================================================================
