//! Bridge runtime: Wasmtime engine, module loading, lifecycle and the
//! dispatch loop.
//!
//! The `Bridge` struct is the bridge context. It is constructed once per
//! guest instance, owns the store (and through it the memory view, the
//! capabilities and the surface adapter), and ends at [`Bridge::shutdown`].
//!
//! Lifecycle:
//!
//! ```text
//! new ─▶ Instantiated ─init─▶ Ready ─shutdown─▶ Destroyed
//!                │               │
//!                └──trap/fail────┴──▶ Halted ─shutdown─▶ Destroyed
//! ```

use std::path::Path;
use std::thread;
use std::time::Duration;

use tether_hostapi::{HostServices, InputEvent, SurfaceHandle, WindowSize};
use wasmtime::{Config, Engine, Instance, Linker, Module, Store};

use crate::adapter::AdapterState;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::guest::GuestEntrypoints;
use crate::host_impl::BridgeState;
use crate::linker::register_host_functions;
use crate::memory::MemoryView;
use crate::queue::EventSender;
use crate::validation::validate_module;

/// Where the guest is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestPhase {
    /// Instantiated; `init` has not completed.
    Instantiated,
    /// `init` returned; entries may be invoked.
    Ready,
    /// The guest trapped or called `fail`; no further guest calls.
    Halted,
    /// Shut down; nothing may be invoked.
    Destroyed,
}

/// Result of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Input events delivered during this frame.
    pub events: usize,
    /// How long the host should wait before the next frame.
    pub sleep: Duration,
}

/// The bridge context for one guest instance.
pub struct Bridge {
    store: Store<BridgeState>,
    instance: Instance,
    guest: GuestEntrypoints,
    config: BridgeConfig,
    phase: GuestPhase,
}

impl Bridge {
    /// Create a bridge from wasm bytecode (or WAT text).
    ///
    /// Validates the module's ABI, registers the host call table,
    /// instantiates the guest and binds its memory view. The guest is not
    /// initialized yet; call [`init`](Self::init).
    pub fn new(
        wasm_bytes: &[u8],
        config: BridgeConfig,
        services: HostServices,
    ) -> Result<Self, BridgeError> {
        let engine = create_engine()?;
        let module = Module::new(&engine, wasm_bytes)?;
        Self::instantiate(&engine, &module, config, services)
    }

    /// Load from a `.wasm` or `.wat` file path.
    pub fn from_file(
        path: &Path,
        config: BridgeConfig,
        services: HostServices,
    ) -> Result<Self, BridgeError> {
        let engine = create_engine()?;
        let module = Module::from_file(&engine, path)?;
        Self::instantiate(&engine, &module, config, services)
    }

    fn instantiate(
        engine: &Engine,
        module: &Module,
        config: BridgeConfig,
        services: HostServices,
    ) -> Result<Self, BridgeError> {
        validate_module(module, &config.import_module)?;

        let mut store = Store::new(engine, BridgeState::new(services, &config));
        store.limiter(|state| &mut state.limits);

        let mut linker = Linker::new(engine);
        register_host_functions(&mut linker, &config.import_module)?;

        let instance = linker.instantiate(&mut store, module)?;

        let view = MemoryView::from_instance(&instance, &mut store)
            .ok_or_else(|| BridgeError::Validation("no memory export".into()))?;
        store.data_mut().memory = Some(view);

        let guest = GuestEntrypoints::resolve(&instance, &mut store)?;

        tracing::debug!(
            import_module = %config.import_module,
            memory_bytes = view.size(&store),
            "guest instantiated"
        );

        Ok(Self {
            store,
            instance,
            guest,
            config,
            phase: GuestPhase::Instantiated,
        })
    }

    /// Run the guest's `init` export. Its successful return is the
    /// readiness signal; input entries are only invoked afterwards.
    pub fn init(&mut self) -> Result<(), BridgeError> {
        match self.phase {
            GuestPhase::Instantiated => {}
            GuestPhase::Ready => return Err(BridgeError::AlreadyInitialized),
            GuestPhase::Halted => return Err(BridgeError::Halted),
            GuestPhase::Destroyed => return Err(BridgeError::Destroyed),
        }

        match self.guest.init(&mut self.store) {
            Ok(()) => {
                self.phase = GuestPhase::Ready;
                tracing::info!(surface = ?self.adapter_state(), "guest ready");
                Ok(())
            }
            Err(e) => {
                self.phase = GuestPhase::Halted;
                Err(match e {
                    BridgeError::GuestTrapped(msg) => BridgeError::InitFailed(msg),
                    other => other,
                })
            }
        }
    }

    /// Deliver the input events queued when the call starts, in order.
    ///
    /// Returns the number of events handled (including events the guest
    /// has no handler for).
    pub fn pump(&mut self) -> Result<usize, BridgeError> {
        self.ensure_ready()?;

        // Events sent while this pump runs wait for the next one.
        let budget = self.store.data_mut().queue.len();
        let mut handled = 0;
        for _ in 0..budget {
            let event = match self.store.data_mut().queue.pop() {
                Some(e) => e,
                None => break,
            };
            let event = match self.to_guest_event(event) {
                Some(e) => e,
                None => continue,
            };
            let delivered = self.guest.deliver(&mut self.store, event);
            match delivered {
                Ok(true) => {}
                Ok(false) => tracing::trace!(kind = event.kind(), "no guest handler, event dropped"),
                Err(e) => return Err(self.halt(e)),
            }
            handled += 1;
        }
        Ok(handled)
    }

    /// Run one frame: pump input, then `frame_begin`, `frame`, `frame_end`.
    pub fn frame(&mut self) -> Result<FrameOutcome, BridgeError> {
        let events = self.pump()?;

        let requested = match self.run_frame_body() {
            Ok(r) => r,
            Err(e) => return Err(self.halt(e)),
        };

        let sleep = match requested {
            Some(micros) if micros >= 0 => Duration::from_micros(micros as u64),
            _ => self.config.default_frame_interval,
        };
        Ok(FrameOutcome { events, sleep })
    }

    /// The dispatch loop: run frames until `should_stop` returns true,
    /// sleeping for the requested interval between frames.
    ///
    /// Returns the number of frames run.
    pub fn run(
        &mut self,
        mut should_stop: impl FnMut(&FrameOutcome) -> bool,
    ) -> Result<u64, BridgeError> {
        let mut frames = 0;
        loop {
            let outcome = self.frame()?;
            frames += 1;
            if should_stop(&outcome) {
                return Ok(frames);
            }
            if !outcome.sleep.is_zero() {
                thread::sleep(outcome.sleep);
            }
        }
    }

    /// Tear the bridge down.
    ///
    /// Input stops first (`Ready → Suspended`), then the guest's `quit` runs
    /// if it is healthy, then the surface is released (`Destroyed`). Calling
    /// this again is a no-op.
    pub fn shutdown(&mut self) -> Result<(), BridgeError> {
        if self.phase == GuestPhase::Destroyed {
            return Ok(());
        }

        if self.adapter_state() == AdapterState::Ready {
            self.store.data_mut().suspend_surface()?;
        }

        if self.phase == GuestPhase::Ready && self.guest.has_quit() {
            if let Err(e) = self.guest.quit(&mut self.store) {
                tracing::warn!(error = %e, "guest quit failed");
            }
        }

        self.store.data_mut().adapter.destroy()?;
        self.store.data_mut().memory = None;
        self.phase = GuestPhase::Destroyed;
        tracing::info!("bridge destroyed");
        Ok(())
    }

    /// Producer handle for input events. May be moved to other threads.
    pub fn event_sender(&self) -> EventSender {
        self.store.data().queue.sender()
    }

    /// Queue an input event from the dispatch thread.
    pub fn submit(&self, event: InputEvent) -> Result<(), BridgeError> {
        self.event_sender().send(event)
    }

    /// Number of undelivered input events.
    pub fn pending_events(&mut self) -> usize {
        self.store.data_mut().queue.len()
    }

    /// The platform dropped pointer capture on its own.
    pub fn notify_pointer_lock_lost(&mut self) {
        self.store.data_mut().adapter.pointer_lock_lost();
    }

    /// The platform left fullscreen on its own.
    pub fn notify_fullscreen_exited(&mut self) {
        self.store.data_mut().adapter.fullscreen_exited();
    }

    /// Copy `[ptr, ptr+len)` out of guest memory.
    pub fn read_guest(&self, ptr: u32, len: u32) -> Result<Vec<u8>, BridgeError> {
        let view = self.store.data().memory()?;
        Ok(view.slice(&self.store, ptr, len)?.to_vec())
    }

    /// Decode `[ptr, ptr+len)` of guest memory as UTF-8 (lossy).
    pub fn read_guest_utf8(&self, ptr: u32, len: u32) -> Result<String, BridgeError> {
        let view = self.store.data().memory()?;
        Ok(view.read_utf8(&self.store, ptr, len)?)
    }

    /// Copy `data` into guest memory at `ptr`.
    pub fn write_guest(&mut self, ptr: u32, data: &[u8]) -> Result<(), BridgeError> {
        let view = self.store.data().memory()?;
        Ok(view.write(&mut self.store, ptr, data)?)
    }

    /// Current size of guest memory in bytes, if still bound.
    pub fn memory_size(&self) -> Option<usize> {
        self.store.data().memory.map(|view| view.size(&self.store))
    }

    pub fn phase(&self) -> GuestPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == GuestPhase::Ready
    }

    pub fn adapter_state(&self) -> AdapterState {
        self.store.data().adapter.state()
    }

    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.store.data().adapter.surface()
    }

    /// Size last forwarded to the guest.
    pub fn logical_size(&self) -> WindowSize {
        self.store.data().adapter.logical_size()
    }

    /// Message of the guest's first `fail` call, if any.
    pub fn fault(&self) -> Option<&str> {
        self.store.data().fault.as_deref()
    }

    /// Host calls rejected so far because of bad pointers.
    pub fn rejected_calls(&self) -> u64 {
        self.store.data().rejected_calls
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    fn run_frame_body(&mut self) -> Result<Option<i64>, BridgeError> {
        self.guest.frame_begin(&mut self.store)?;
        let requested = self.guest.frame(&mut self.store)?;
        self.guest.frame_end(&mut self.store)?;
        Ok(requested)
    }

    fn ensure_ready(&self) -> Result<(), BridgeError> {
        match self.phase {
            GuestPhase::Ready => Ok(()),
            GuestPhase::Instantiated => Err(BridgeError::NotReady),
            GuestPhase::Halted => Err(BridgeError::Halted),
            GuestPhase::Destroyed => Err(BridgeError::Destroyed),
        }
    }

    /// Turn a queued host event into what the guest receives. Resizes pass
    /// through the adapter, which rescales the backing buffer and yields
    /// the logical size.
    fn to_guest_event(&mut self, event: InputEvent) -> Option<InputEvent> {
        match event {
            InputEvent::Resize { width, height } => {
                let logical = self
                    .store
                    .data_mut()
                    .adapter
                    .resize(WindowSize::new(width, height))?;
                Some(InputEvent::Resize {
                    width: logical.width,
                    height: logical.height,
                })
            }
            other => Some(other),
        }
    }

    /// Record that the guest can no longer be called. Reentrancy errors
    /// leave the guest itself intact and do not halt it.
    fn halt(&mut self, err: BridgeError) -> BridgeError {
        if !matches!(err, BridgeError::Reentrancy(_)) {
            tracing::error!(error = %err, "guest halted");
            self.phase = GuestPhase::Halted;
        }
        err
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "shutdown on drop failed");
        }
    }
}

/// Create a Wasmtime engine for a single-threaded guest.
fn create_engine() -> Result<Engine, BridgeError> {
    let mut wasm_config = Config::new();

    // The guest has no concurrency primitives of its own.
    wasm_config.wasm_threads(false);

    Ok(Engine::new(&wasm_config)?)
}
