//! Guest call table: typed handles to the guest's exported entry points.
//!
//! Entries are resolved once after instantiation and never change. Every
//! call goes through [`call_guarded`], which enforces the single busy flag:
//! the guest is never entered while a previous call into it is running.

use tether_hostapi::InputEvent;
use wasmtime::{Instance, Store, Trap, TypedFunc, WasmParams, WasmResults};

use crate::error::BridgeError;
use crate::host_impl::BridgeState;
use crate::linker::GuestFaultTrap;

pub const INIT: &str = "init";
pub const ON_KEY: &str = "on_key";
pub const ON_MOUSE_MOVE: &str = "on_mouse_move";
pub const ON_MOUSE_BUTTON: &str = "on_mouse_button";
pub const ON_RESIZE: &str = "on_resize";
pub const FRAME_BEGIN: &str = "frame_begin";
pub const FRAME: &str = "frame";
pub const FRAME_END: &str = "frame_end";
pub const QUIT: &str = "quit";

/// Resolved guest exports. Only `init` is mandatory.
pub struct GuestEntrypoints {
    init: TypedFunc<(), ()>,
    on_key: Option<TypedFunc<(i32, i32), ()>>,
    on_mouse_move: Option<TypedFunc<(f32, f32, f32, f32), ()>>,
    on_mouse_button: Option<TypedFunc<(i32, i32), ()>>,
    on_resize: Option<TypedFunc<(i32, i32), ()>>,
    frame_begin: Option<TypedFunc<(), ()>>,
    frame: Option<TypedFunc<(), i64>>,
    frame_end: Option<TypedFunc<(), ()>>,
    quit: Option<TypedFunc<(), ()>>,
}

impl GuestEntrypoints {
    /// Look up every entry on `instance`. Signatures are checked by
    /// `validation` beforehand, so a type error here is a wasmtime error.
    pub fn resolve(
        instance: &Instance,
        store: &mut Store<BridgeState>,
    ) -> Result<Self, BridgeError> {
        Ok(Self {
            init: instance.get_typed_func(&mut *store, INIT)?,
            on_key: optional(instance, store, ON_KEY)?,
            on_mouse_move: optional(instance, store, ON_MOUSE_MOVE)?,
            on_mouse_button: optional(instance, store, ON_MOUSE_BUTTON)?,
            on_resize: optional(instance, store, ON_RESIZE)?,
            frame_begin: optional(instance, store, FRAME_BEGIN)?,
            frame: optional(instance, store, FRAME)?,
            frame_end: optional(instance, store, FRAME_END)?,
            quit: optional(instance, store, QUIT)?,
        })
    }

    pub fn init(&self, store: &mut Store<BridgeState>) -> Result<(), BridgeError> {
        call_guarded(store, INIT, &self.init, ())
    }

    /// Deliver one input event. Returns `Ok(false)` when the guest does not
    /// export a handler for it.
    ///
    /// Resize events must already carry logical dimensions.
    pub fn deliver(
        &self,
        store: &mut Store<BridgeState>,
        event: InputEvent,
    ) -> Result<bool, BridgeError> {
        match event {
            InputEvent::Key { code, pressed } => match &self.on_key {
                Some(f) => call_guarded(store, ON_KEY, f, (code as i32, pressed as i32)),
                None => return Ok(false),
            },
            InputEvent::MouseMove { x, y, dx, dy } => match &self.on_mouse_move {
                Some(f) => call_guarded(store, ON_MOUSE_MOVE, f, (x, y, dx, dy)),
                None => return Ok(false),
            },
            InputEvent::MouseButton { button, pressed } => match &self.on_mouse_button {
                Some(f) => call_guarded(store, ON_MOUSE_BUTTON, f, (button as i32, pressed as i32)),
                None => return Ok(false),
            },
            InputEvent::Resize { width, height } => match &self.on_resize {
                Some(f) => call_guarded(store, ON_RESIZE, f, (width as i32, height as i32)),
                None => return Ok(false),
            },
        }?;
        Ok(true)
    }

    pub fn frame_begin(&self, store: &mut Store<BridgeState>) -> Result<(), BridgeError> {
        call_optional(store, FRAME_BEGIN, self.frame_begin.as_ref())
    }

    /// Run the guest's frame body. Returns the requested sleep in
    /// microseconds, or `None` if the guest has no `frame` export.
    pub fn frame(&self, store: &mut Store<BridgeState>) -> Result<Option<i64>, BridgeError> {
        match &self.frame {
            Some(f) => call_guarded(store, FRAME, f, ()).map(Some),
            None => Ok(None),
        }
    }

    pub fn frame_end(&self, store: &mut Store<BridgeState>) -> Result<(), BridgeError> {
        call_optional(store, FRAME_END, self.frame_end.as_ref())
    }

    pub fn quit(&self, store: &mut Store<BridgeState>) -> Result<(), BridgeError> {
        call_optional(store, QUIT, self.quit.as_ref())
    }

    pub fn has_quit(&self) -> bool {
        self.quit.is_some()
    }
}

fn optional<P, R>(
    instance: &Instance,
    store: &mut Store<BridgeState>,
    name: &str,
) -> Result<Option<TypedFunc<P, R>>, BridgeError>
where
    P: WasmParams,
    R: WasmResults,
{
    match instance.get_func(&mut *store, name) {
        Some(func) => Ok(Some(func.typed::<P, R>(&*store)?)),
        None => Ok(None),
    }
}

fn call_optional(
    store: &mut Store<BridgeState>,
    name: &'static str,
    func: Option<&TypedFunc<(), ()>>,
) -> Result<(), BridgeError> {
    match func {
        Some(f) => call_guarded(store, name, f, ()),
        None => Ok(()),
    }
}

/// Call into the guest with the reentrancy guard held.
///
/// A call attempted while another guest call is in flight is rejected with
/// `BridgeError::Reentrancy` and never reaches the guest.
pub fn call_guarded<P, R>(
    store: &mut Store<BridgeState>,
    name: &'static str,
    func: &TypedFunc<P, R>,
    params: P,
) -> Result<R, BridgeError>
where
    P: WasmParams,
    R: WasmResults,
{
    if let Some(active) = store.data().in_guest {
        tracing::error!(entry = name, active, "reentrant guest call rejected");
        return Err(BridgeError::Reentrancy(name));
    }

    store.data_mut().in_guest = Some(name);
    let result = func.call(&mut *store, params);
    store.data_mut().in_guest = None;

    result.map_err(|e| classify_trap(store.data(), name, e))
}

/// Map a failed guest call to a bridge error. A recorded `fail` message
/// takes precedence over the engine's trap description.
fn classify_trap(state: &BridgeState, entry: &'static str, err: anyhow::Error) -> BridgeError {
    if let Some(message) = &state.fault {
        return BridgeError::GuestFault(message.clone());
    }
    if let Some(fault) = err.downcast_ref::<GuestFaultTrap>() {
        return BridgeError::GuestFault(fault.0.clone());
    }
    let description = match err.downcast_ref::<Trap>() {
        Some(trap) => trap.to_string(),
        None => format!("{:#}", err),
    };
    tracing::warn!(entry, trap = %description, "guest trapped");
    BridgeError::GuestTrapped(description)
}
