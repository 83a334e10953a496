//! Host-side error types for the tether bridge.
//!
//! `HostError` is returned by the capability traits and by the memory
//! marshaling helpers. None of these errors ever cross into the guest:
//! host functions reject the offending call and log instead.

/// Host-side error type returned by capability implementations and
/// pointer/length marshaling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The range `[ptr, ptr + len)` does not fit in the guest's linear memory
    /// as it is sized at the time of the access.
    #[error("out of bounds: ptr={ptr} len={len} exceeds memory size {size}")]
    OutOfBounds {
        /// Guest pointer.
        ptr: u32,
        /// Requested length in bytes.
        len: u32,
        /// Linear memory size observed when the access was checked.
        size: usize,
    },

    /// A host function ran before the guest memory view was bound.
    #[error("guest memory view is not bound")]
    MemoryNotBound,

    /// The surface provider could not hand out a drawable target.
    #[error("surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// An internal host error with a descriptive message.
    #[error("internal host error: {0}")]
    Internal(String),
}

impl HostError {
    /// Create an out-of-bounds error for the given access.
    pub fn out_of_bounds(ptr: u32, len: u32, size: usize) -> Self {
        Self::OutOfBounds { ptr, len, size }
    }

    /// Returns true if this is a marshaling bounds failure.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }
}
