//! In-memory surface provider for testing.
//!
//! `RecordingSurface` implements `SurfaceProvider` without any windowing
//! system. It records every call made to it, lets a test change the window
//! size, and can inject input events through the attached listener the same
//! way a real window provider would.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::HostError;
use crate::traits::{EventCallback, SurfaceProvider};
use crate::types::{InputEvent, SurfaceHandle, WindowSize};

/// One call observed by a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Acquire(SurfaceHandle),
    SetBackingSize(SurfaceHandle, WindowSize),
    AttachListeners,
    DetachListeners,
    PointerLock(bool),
    Fullscreen(bool),
    Release(SurfaceHandle),
}

#[derive(Default)]
struct Inner {
    window: WindowSize,
    next_id: u64,
    fail_acquire: bool,
    callback: Option<EventCallback>,
    calls: Vec<SurfaceCall>,
}

/// Recording `SurfaceProvider`. Clones share the same state, so a test can
/// keep one clone while the bridge owns another.
#[derive(Clone)]
pub struct RecordingSurface {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingSurface {
    /// Create a surface whose window currently has the given size.
    pub fn new(window: WindowSize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                window,
                next_id: 1,
                ..Inner::default()
            })),
        }
    }

    /// Make subsequent `acquire` calls fail.
    pub fn fail_acquire(&self, fail: bool) {
        self.lock().fail_acquire = fail;
    }

    /// Change the window size. Does not emit a resize event by itself.
    pub fn set_window_size(&self, size: WindowSize) {
        self.lock().window = size;
    }

    /// Simulate the platform reporting a window resize: update the size and
    /// emit the matching event.
    pub fn resize(&self, size: WindowSize) -> bool {
        self.set_window_size(size);
        self.emit(InputEvent::Resize {
            width: size.width,
            height: size.height,
        })
    }

    /// Deliver `event` to the attached listener. Returns false when no
    /// listener is attached, in which case the event is lost.
    pub fn emit(&self, event: InputEvent) -> bool {
        let callback = self.lock().callback.clone();
        match callback {
            Some(cb) => {
                cb(event);
                true
            }
            None => false,
        }
    }

    /// True while a listener is attached.
    pub fn has_listeners(&self) -> bool {
        self.lock().callback.is_some()
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&SurfaceCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// The most recent backing size set for any surface.
    pub fn backing_size(&self) -> Option<WindowSize> {
        self.lock().calls.iter().rev().find_map(|c| match c {
            SurfaceCall::SetBackingSize(_, size) => Some(*size),
            _ => None,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SurfaceProvider for RecordingSurface {
    fn acquire(&mut self) -> Result<SurfaceHandle, HostError> {
        let mut inner = self.lock();
        if inner.fail_acquire {
            return Err(HostError::SurfaceUnavailable("acquire disabled".into()));
        }
        let handle = SurfaceHandle::new(inner.next_id);
        inner.next_id += 1;
        inner.calls.push(SurfaceCall::Acquire(handle));
        Ok(handle)
    }

    fn window_size(&self) -> WindowSize {
        self.lock().window
    }

    fn set_backing_size(&mut self, surface: SurfaceHandle, size: WindowSize) {
        self.lock().calls.push(SurfaceCall::SetBackingSize(surface, size));
    }

    fn attach_listeners(&mut self, callback: EventCallback) {
        let mut inner = self.lock();
        inner.callback = Some(callback);
        inner.calls.push(SurfaceCall::AttachListeners);
    }

    fn detach_listeners(&mut self) {
        let mut inner = self.lock();
        inner.callback = None;
        inner.calls.push(SurfaceCall::DetachListeners);
    }

    fn request_pointer_lock(&mut self, locked: bool) {
        self.lock().calls.push(SurfaceCall::PointerLock(locked));
    }

    fn request_fullscreen(&mut self, fullscreen: bool) {
        self.lock().calls.push(SurfaceCall::Fullscreen(fullscreen));
    }

    fn release(&mut self, surface: SurfaceHandle) {
        self.lock().calls.push(SurfaceCall::Release(surface));
    }
}
