//! `tether-bridge`: Wasmtime-based bridge between a sandboxed guest module
//! and the host's capabilities.
//!
//! The bridge loads a guest, checks it against the boundary ABI, and then
//! marshals traffic in both directions:
//!
//! - **Host calls:** console output, fatal diagnostics, a monotonic clock and
//!   surface control, each reading guest memory through a bounds-checked view
//! - **Guest calls:** input events and frame callbacks, delivered one at a
//!   time and never reentrantly
//! - **Surface lifecycle:** an adapter state machine owning the window
//!   surface, its scaled backing buffer and the pointer/fullscreen modes
//! - **Input:** a bounded queue that platform threads feed and the dispatch
//!   thread drains
//!
//! The primary entry point is [`Bridge`].

pub mod error;
pub mod config;
pub mod memory;
pub mod host_impl;
pub mod validation;
pub mod linker;
pub mod guest;
pub mod adapter;
pub mod queue;
pub mod runtime;

pub use adapter::AdapterState;
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use memory::MemoryView;
pub use queue::EventSender;
pub use runtime::{Bridge, FrameOutcome, GuestPhase};
