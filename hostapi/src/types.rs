//! Plain data types shared between the host capabilities and the bridge.

use std::fmt;

/// A host-native input event, funnelled through the bridge's event queue
/// before it is delivered to the guest.
///
/// Sizes carried by [`InputEvent::Resize`] are window sizes as reported by
/// the window provider, i.e. logical (unscaled) units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A key was pressed or released.
    Key { code: u32, pressed: bool },
    /// The pointer moved. `dx`/`dy` are relative motion, which stays
    /// meaningful while the pointer is captured.
    MouseMove { x: f32, y: f32, dx: f32, dy: f32 },
    /// A mouse button was pressed or released.
    MouseButton { button: u32, pressed: bool },
    /// The host window changed size.
    Resize { width: u32, height: u32 },
}

impl InputEvent {
    /// Short name of the event kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Key { .. } => "key",
            Self::MouseMove { .. } => "mouse_move",
            Self::MouseButton { .. } => "mouse_button",
            Self::Resize { .. } => "resize",
        }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Multiply both dimensions by `factor`, saturating at `u32::MAX`.
    pub fn scaled_up(self, factor: u32) -> Self {
        Self {
            width: self.width.saturating_mul(factor),
            height: self.height.saturating_mul(factor),
        }
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Opaque identity of a drawable target handed out by a surface provider.
///
/// A resize never changes the handle; only acquiring a new surface does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(u64);

impl SurfaceHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Severity of a guest log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Routine output from the guest's `write` import.
    Info,
    /// Fatal diagnostic from the guest's `fail` import.
    Fatal,
}

/// A single line of guest output as seen by a log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}
