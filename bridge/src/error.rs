//! Bridge error types.

use tether_hostapi::HostError;

use crate::adapter::AdapterState;

/// Top-level error type for the bridge crate.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Wasmtime engine, compilation, or instantiation error.
    #[error("wasmtime error: {0}")]
    Wasmtime(#[from] anyhow::Error),

    /// Module validation failed (missing exports, foreign imports, etc.).
    #[error("validation error: {0}")]
    Validation(String),

    /// Host capability or marshaling error.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// The guest's `init` export trapped.
    #[error("guest init failed: {0}")]
    InitFailed(String),

    /// The guest trapped outside of the fail path.
    #[error("guest trapped: {0}")]
    GuestTrapped(String),

    /// The guest invoked `fail` and asked the host to halt.
    #[error("unrecoverable guest fault: {0}")]
    GuestFault(String),

    /// `init` was called on a guest that already signaled readiness.
    #[error("guest is already initialized")]
    AlreadyInitialized,

    /// A guest entry was invoked before the guest signaled readiness.
    #[error("guest has not signaled readiness")]
    NotReady,

    /// The guest faulted or trapped earlier; no further guest calls are made.
    #[error("guest is halted")]
    Halted,

    /// The bridge has been shut down.
    #[error("bridge is destroyed")]
    Destroyed,

    /// A call into the guest was attempted while another was in flight.
    #[error("reentrant guest call to '{0}' rejected")]
    Reentrancy(&'static str),

    /// The surface adapter was asked to make a transition it does not allow.
    #[error("invalid adapter transition from {from:?} to {to:?}")]
    InvalidTransition { from: AdapterState, to: AdapterState },

    /// The event queue is at capacity.
    #[error("event queue full")]
    QueueFull,

    /// The event queue no longer accepts events.
    #[error("event queue closed")]
    QueueClosed,
}
