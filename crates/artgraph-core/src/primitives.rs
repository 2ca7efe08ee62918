//! # Fixed Primitives
//!
//! Hardcoded runtime constants for the mapping layer.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Magic bytes for the artgraph snapshot header.
///
/// - File Header = Magic Bytes ("AGRF") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"AGRF";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum nesting of sub-traversals (`optional`, `project`, `map`, ...).
///
/// Adapters compose child adapters recursively; this bounds runaway
/// compositions instead of overflowing the stack.
pub const MAX_TRAVERSAL_DEPTH: usize = 64;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for property keys written through a patch.
pub const MAX_PROPERTY_KEY_LENGTH: usize = 256;

/// Maximum length for string property values written through a patch (64KB).
pub const MAX_STRING_VALUE_LENGTH: usize = 65536;

/// Maximum number of groups in a single batched cascade.
///
/// Batches longer than this are rejected before any traversal runs.
pub const MAX_CASCADE_BATCH: usize = 10000;
