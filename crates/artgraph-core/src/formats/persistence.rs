//! # Snapshot Format
//!
//! Binary serialization for in-memory graphs.
//!
//! Format: Header (5 bytes) + postcard-serialized graph data.
//! - 4 bytes: Magic ("AGRF")
//! - 1 byte: Version
//!
//! File I/O lives in `Session`; this module only transforms bytes.
//! The payload size is validated before deserialization.

use crate::graph::{Graph, SerializableGraph};
use crate::{OgmError, primitives};

/// Maximum allowed payload size for the snapshot format (500 MB).
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 500 * 1024 * 1024;

/// Header length in bytes.
const HEADER_LEN: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The snapshot header precedes all graph data.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), OgmError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(OgmError::Serialization("Invalid magic bytes".to_string()));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(OgmError::Serialization(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OgmError> {
        if bytes.len() < HEADER_LEN {
            return Err(OgmError::Serialization("Header too short".to_string()));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a graph to bytes (header + payload).
pub fn graph_to_bytes(graph: &Graph) -> Result<Vec<u8>, OgmError> {
    let header = SnapshotHeader::new();
    let serializable = SerializableGraph::from(graph);

    let payload =
        postcard::to_stdvec(&serializable).map_err(|e| OgmError::Serialization(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);

    Ok(result)
}

/// Deserialize a graph from bytes.
///
/// Size and header are validated before the payload is touched.
pub fn graph_from_bytes(bytes: &[u8]) -> Result<Graph, OgmError> {
    if bytes.len() < HEADER_LEN {
        return Err(OgmError::Serialization(format!(
            "Data too short: minimum {HEADER_LEN} bytes required"
        )));
    }

    if bytes.len() > MAX_SNAPSHOT_PAYLOAD_SIZE {
        return Err(OgmError::Serialization(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_PAYLOAD_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let serializable: SerializableGraph = postcard::from_bytes(&bytes[HEADER_LEN..])
        .map_err(|e| OgmError::Serialization(format!("Failed to deserialize graph data: {e}")))?;

    Ok(Graph::from(serializable))
}

// =============================================================================
// TESTS
// =============================================================================
