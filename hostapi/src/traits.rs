//! Capability traits: the host side of the guest boundary.
//!
//! Each trait is one external collaborator: the logging sink, the clock and
//! the window/surface provider. The bridge owns one of each through
//! [`HostServices`] and is the only caller; nothing here deals with raw guest
//! pointers, which are resolved by the bridge before a capability is invoked.

use std::sync::Arc;

use crate::clock::SystemClock;
use crate::error::HostError;
use crate::sinks::TracingSink;
use crate::types::{InputEvent, SurfaceHandle, WindowSize};

/// Receives decoded guest output.
pub trait LogSink {
    /// Routine output from the guest's `write` import.
    ///
    /// `text` has already been decoded; invalid UTF-8 arrives with
    /// replacement characters, never as an error.
    fn write(&mut self, text: &str);

    /// Fatal diagnostic from the guest's `fail` import.
    ///
    /// Implementations should make this visible to the user, not just log
    /// it. The bridge halts the guest after this returns.
    fn fail(&mut self, text: &str);
}

/// Source of time for the guest's `time_micros` import.
///
/// Readings are in microseconds since an unspecified epoch. The bridge
/// clamps them so the guest never observes time going backwards, so
/// implementations need not be monotonic.
pub trait Clock {
    fn now_micros(&self) -> u64;
}

/// Callback the surface provider invokes for each host-native input event.
///
/// May be called from any thread; the bridge funnels every call into its
/// single event queue.
pub type EventCallback = Arc<dyn Fn(InputEvent) + Send + Sync>;

/// Window/input and graphics surface provider.
///
/// All mode requests are commands: they return nothing and the bridge
/// never waits for them to take effect.
pub trait SurfaceProvider {
    /// Acquire a drawable target.
    fn acquire(&mut self) -> Result<SurfaceHandle, HostError>;

    /// Current host window size in logical (unscaled) pixels.
    fn window_size(&self) -> WindowSize;

    /// Resize the physical backing buffer of `surface`.
    fn set_backing_size(&mut self, surface: SurfaceHandle, size: WindowSize);

    /// Start delivering host-native input events to `callback`.
    fn attach_listeners(&mut self, callback: EventCallback);

    /// Stop delivering input events. After this returns the provider must
    /// not invoke the callback passed to `attach_listeners` again.
    fn detach_listeners(&mut self);

    /// Ask the platform to capture (`true`) or release (`false`) the pointer.
    fn request_pointer_lock(&mut self, locked: bool);

    /// Ask the platform to enter (`true`) or leave (`false`) fullscreen.
    fn request_fullscreen(&mut self, fullscreen: bool);

    /// Release a surface previously returned by `acquire`.
    fn release(&mut self, surface: SurfaceHandle);
}

/// The capability bundle a bridge is constructed with.
pub struct HostServices {
    pub log: Box<dyn LogSink>,
    pub clock: Box<dyn Clock>,
    pub surface: Box<dyn SurfaceProvider>,
}

impl HostServices {
    /// Bundle `surface` with the default sink (`tracing`) and the wall clock.
    pub fn new(surface: impl SurfaceProvider + 'static) -> Self {
        Self {
            log: Box::new(TracingSink),
            clock: Box::new(SystemClock),
            surface: Box::new(surface),
        }
    }

    /// Replace the log sink.
    pub fn with_log(mut self, log: impl LogSink + 'static) -> Self {
        self.log = Box::new(log);
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }
}
