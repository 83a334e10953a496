//! `tether-hostapi`: host capability traits and types for the tether bridge.
//!
//! This crate defines the host side of the guest boundary without depending
//! on any wasm engine. It provides:
//!
//! - `LogSink`, `Clock`, `SurfaceProvider`: the capability traits
//! - `HostServices`: the bundle a bridge is constructed with
//! - `InputEvent`, `WindowSize`, `SurfaceHandle`: boundary data types
//! - `TracingSink`, `SystemClock`: production defaults
//! - `MemorySink`, `ManualClock`, `RecordingSurface`: in-memory test doubles
//! - `HostError`: host-side error type

pub mod error;
pub mod types;
pub mod traits;
pub mod clock;
pub mod sinks;
pub mod mem_surface;

// Re-export commonly used types at the crate root.
pub use error::HostError;
pub use types::{InputEvent, LogLevel, LogRecord, SurfaceHandle, WindowSize};
pub use traits::{Clock, EventCallback, HostServices, LogSink, SurfaceProvider};
pub use clock::{ManualClock, MonotonicClock, SystemClock};
pub use sinks::{MemorySink, TracingSink};
pub use mem_surface::{RecordingSurface, SurfaceCall};
