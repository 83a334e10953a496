//! Host function registration via Wasmtime linker.
//!
//! Registers the host call table under the configured import module. Each
//! function that takes a pointer/length pair:
//! 1. Fetches the bound memory view from `BridgeState`
//! 2. Validates the range against the memory as it is sized right now
//! 3. Decodes the bytes (lossy UTF-8)
//! 4. Forwards to the host capability
//!
//! A bad range or an unbound view rejects the call and logs it; nothing is
//! reported back into the guest. The one exception is `fail`, which always
//! traps so the guest halts.

use wasmtime::{Caller, Linker};

use tether_hostapi::HostError;

use crate::error::BridgeError;
use crate::host_impl::BridgeState;

/// Names of every host function the guest may import.
pub const HOST_FUNCTIONS: &[&str] = &[
    "write",
    "fail",
    "time_micros",
    "gfx_init",
    "gfx_set_grab",
    "gfx_set_fullscreen",
];

/// Trap payload raised by the `fail` import.
#[derive(Debug, thiserror::Error)]
#[error("guest requested halt: {0}")]
pub struct GuestFaultTrap(pub String);

/// Register all host functions with the linker under `module`.
pub fn register_host_functions(
    linker: &mut Linker<BridgeState>,
    module: &str,
) -> Result<(), BridgeError> {
    register_write(linker, module)?;
    register_fail(linker, module)?;
    register_time_micros(linker, module)?;
    register_gfx_init(linker, module)?;
    register_gfx_set_grab(linker, module)?;
    register_gfx_set_fullscreen(linker, module)?;
    Ok(())
}

/// Decode `[ptr, ptr+len)` of the caller's memory as text.
fn read_text(caller: &Caller<'_, BridgeState>, ptr: u32, len: u32) -> Result<String, HostError> {
    let view = caller.data().memory()?;
    view.read_utf8(caller, ptr, len)
}

// ── Console ──

fn register_write(linker: &mut Linker<BridgeState>, module: &str) -> Result<(), BridgeError> {
    linker.func_wrap(
        module,
        "write",
        |mut caller: Caller<'_, BridgeState>, ptr: u32, len: u32| {
            match read_text(&caller, ptr, len) {
                Ok(text) => caller.data_mut().write_log(&text),
                Err(e) => caller.data_mut().reject("write", &e),
            }
        },
    )?;
    Ok(())
}

fn register_fail(linker: &mut Linker<BridgeState>, module: &str) -> Result<(), BridgeError> {
    linker.func_wrap(
        module,
        "fail",
        |mut caller: Caller<'_, BridgeState>, ptr: u32, len: u32| -> anyhow::Result<()> {
            let message = match read_text(&caller, ptr, len) {
                Ok(text) => text,
                Err(e) => {
                    caller.data_mut().reject("fail", &e);
                    format!("guest fault with unreadable message ({})", e)
                }
            };
            tracing::error!(message = %message, "guest requested halt");
            caller.data_mut().record_fault(message.clone());
            Err(GuestFaultTrap(message).into())
        },
    )?;
    Ok(())
}

// ── Clock ──

fn register_time_micros(
    linker: &mut Linker<BridgeState>,
    module: &str,
) -> Result<(), BridgeError> {
    linker.func_wrap(
        module,
        "time_micros",
        |mut caller: Caller<'_, BridgeState>| -> i64 {
            let now = caller.data_mut().time_micros();
            i64::try_from(now).unwrap_or(i64::MAX)
        },
    )?;
    Ok(())
}

// ── Surface ──

fn register_gfx_init(linker: &mut Linker<BridgeState>, module: &str) -> Result<(), BridgeError> {
    linker.func_wrap(module, "gfx_init", |mut caller: Caller<'_, BridgeState>| {
        if let Err(e) = caller.data_mut().init_surface() {
            tracing::error!(error = %e, "gfx_init failed");
        }
    })?;
    Ok(())
}

fn register_gfx_set_grab(
    linker: &mut Linker<BridgeState>,
    module: &str,
) -> Result<(), BridgeError> {
    linker.func_wrap(
        module,
        "gfx_set_grab",
        |mut caller: Caller<'_, BridgeState>, grab: i32| {
            if !caller.data_mut().adapter.set_grab(grab != 0) {
                tracing::trace!(grab = grab != 0, "pointer capture request was a no-op");
            }
        },
    )?;
    Ok(())
}

fn register_gfx_set_fullscreen(
    linker: &mut Linker<BridgeState>,
    module: &str,
) -> Result<(), BridgeError> {
    linker.func_wrap(
        module,
        "gfx_set_fullscreen",
        |mut caller: Caller<'_, BridgeState>, fullscreen: i32| {
            if !caller.data_mut().adapter.set_fullscreen(fullscreen != 0) {
                tracing::trace!(fullscreen = fullscreen != 0, "fullscreen request was a no-op");
            }
        },
    )?;
    Ok(())
}
