//! Surface/input adapter: the state machine between the bridge and the
//! host's window/surface provider.
//!
//! ```text
//! Uninitialized ──init──▶ Ready ──suspend──▶ Suspended ──destroy──▶ Destroyed
//!        └────────────────────────destroy──────────────────────────────┘
//! ```
//!
//! The guest always sees logical (window) sizes. The physical backing
//! buffer is kept at `logical × multisample_scaling`.

use tether_hostapi::{EventCallback, InputEvent, SurfaceHandle, SurfaceProvider, WindowSize};

use crate::error::BridgeError;

/// Lifecycle state of the surface adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Uninitialized,
    Ready,
    Suspended,
    Destroyed,
}

/// Owns the surface provider and tracks the surface, its logical size and
/// the pointer-capture/fullscreen modes requested so far.
pub struct SurfaceAdapter {
    provider: Box<dyn SurfaceProvider>,
    state: AdapterState,
    scaling: u32,
    surface: Option<SurfaceHandle>,
    logical: WindowSize,
    grabbed: bool,
    fullscreen: bool,
}

impl SurfaceAdapter {
    pub fn new(provider: Box<dyn SurfaceProvider>, multisample_scaling: u32) -> Self {
        Self {
            provider,
            state: AdapterState::Uninitialized,
            scaling: multisample_scaling.max(1),
            surface: None,
            logical: WindowSize::default(),
            grabbed: false,
            fullscreen: false,
        }
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.surface
    }

    /// Size last forwarded to the guest.
    pub fn logical_size(&self) -> WindowSize {
        self.logical
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// `Uninitialized → Ready`.
    ///
    /// Acquires a surface, sizes its backing buffer, attaches `listener` to
    /// the provider and returns the synthetic resize event describing the
    /// current window, which must reach the guest before any other event.
    pub fn init(&mut self, listener: EventCallback) -> Result<InputEvent, BridgeError> {
        if self.state != AdapterState::Uninitialized {
            return Err(self.invalid(AdapterState::Ready));
        }

        let surface = self.provider.acquire()?;
        self.surface = Some(surface);
        self.provider.attach_listeners(listener);

        let window = self.provider.window_size();
        self.apply_size(surface, window);
        self.state = AdapterState::Ready;

        tracing::info!(surface = surface.id(), size = %window, "surface ready");
        Ok(InputEvent::Resize {
            width: window.width,
            height: window.height,
        })
    }

    /// `Ready → Ready` on a host-detected size change.
    ///
    /// Returns the logical size to forward to the guest, or `None` if the
    /// adapter is not ready.
    pub fn resize(&mut self, window: WindowSize) -> Option<WindowSize> {
        let surface = match (self.state, self.surface) {
            (AdapterState::Ready, Some(surface)) => surface,
            _ => return None,
        };
        if window != self.logical {
            self.apply_size(surface, window);
            tracing::debug!(size = %window, "surface resized");
        }
        Some(self.logical)
    }

    /// Request pointer capture or release.
    ///
    /// Idempotent: asking for the mode already requested issues nothing.
    /// Returns true when a request reached the provider.
    pub fn set_grab(&mut self, grab: bool) -> bool {
        if self.state != AdapterState::Ready || self.grabbed == grab {
            return false;
        }
        self.provider.request_pointer_lock(grab);
        self.grabbed = grab;
        true
    }

    /// Request fullscreen on or off. Same idempotence as [`set_grab`](Self::set_grab).
    pub fn set_fullscreen(&mut self, fullscreen: bool) -> bool {
        if self.state != AdapterState::Ready || self.fullscreen == fullscreen {
            return false;
        }
        self.provider.request_fullscreen(fullscreen);
        self.fullscreen = fullscreen;
        true
    }

    /// The platform dropped pointer capture on its own (e.g. the user
    /// pressed Escape). The next `set_grab(true)` is issued again.
    pub fn pointer_lock_lost(&mut self) {
        self.grabbed = false;
    }

    /// The platform left fullscreen on its own.
    pub fn fullscreen_exited(&mut self) {
        self.fullscreen = false;
    }

    /// `Ready → Suspended`: detach input listeners.
    pub fn suspend(&mut self) -> Result<(), BridgeError> {
        if self.state != AdapterState::Ready {
            return Err(self.invalid(AdapterState::Suspended));
        }
        self.provider.detach_listeners();
        self.state = AdapterState::Suspended;
        Ok(())
    }

    /// `Suspended | Uninitialized → Destroyed`: drop any active modes and
    /// release the surface. Destroying twice is a no-op.
    pub fn destroy(&mut self) -> Result<(), BridgeError> {
        match self.state {
            AdapterState::Destroyed => return Ok(()),
            AdapterState::Ready => return Err(self.invalid(AdapterState::Destroyed)),
            AdapterState::Uninitialized | AdapterState::Suspended => {}
        }
        if self.grabbed {
            self.provider.request_pointer_lock(false);
            self.grabbed = false;
        }
        if self.fullscreen {
            self.provider.request_fullscreen(false);
            self.fullscreen = false;
        }
        if let Some(surface) = self.surface.take() {
            self.provider.release(surface);
            tracing::info!(surface = surface.id(), "surface released");
        }
        self.state = AdapterState::Destroyed;
        Ok(())
    }

    fn apply_size(&mut self, surface: SurfaceHandle, window: WindowSize) {
        self.provider
            .set_backing_size(surface, window.scaled_up(self.scaling));
        self.logical = window;
    }

    fn invalid(&self, to: AdapterState) -> BridgeError {
        BridgeError::InvalidTransition {
            from: self.state,
            to,
        }
    }
}
