//! Per-instance mutable state held in the Wasmtime `Store`.
//!
//! `BridgeState` combines the bound memory view, the host capabilities, the
//! surface adapter and the event queue into a single struct that lives
//! inside `Store<BridgeState>` for the lifetime of one bridge. Host
//! functions reach it through `Caller::data_mut`.

use tether_hostapi::{Clock, HostError, HostServices, LogSink};
use wasmtime::{StoreLimits, StoreLimitsBuilder};

use crate::adapter::{AdapterState, SurfaceAdapter};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::memory::MemoryView;
use crate::queue::EventQueue;

/// Per-instance mutable state held in the Wasmtime `Store`.
pub struct BridgeState {
    /// Guest memory view. `None` until instantiation completes and again
    /// after shutdown; host functions that marshal memory reject calls
    /// while unbound.
    pub memory: Option<MemoryView>,
    /// Sink for guest output.
    pub log: Box<dyn LogSink>,
    /// Time source for `time_micros`.
    pub clock: Box<dyn Clock>,
    /// Surface/input adapter.
    pub adapter: SurfaceAdapter,
    /// Pending input events for the guest.
    pub queue: EventQueue,
    /// Linear memory growth limits.
    pub limits: StoreLimits,
    /// Name of the guest entry currently executing, if any.
    pub in_guest: Option<&'static str>,
    /// Message of the first `fail` call.
    pub fault: Option<String>,
    /// Host calls rejected because of bad pointers or an unbound view.
    pub rejected_calls: u64,
    enable_guest_logs: bool,
    last_time_micros: u64,
}

impl BridgeState {
    pub fn new(services: HostServices, config: &BridgeConfig) -> Self {
        let HostServices {
            log,
            clock,
            surface,
        } = services;
        Self {
            memory: None,
            log,
            clock,
            adapter: SurfaceAdapter::new(surface, config.scaling()),
            queue: EventQueue::bounded(config.event_queue_capacity),
            limits: StoreLimitsBuilder::new()
                .memory_size(config.max_memory_bytes())
                .build(),
            in_guest: None,
            fault: None,
            rejected_calls: 0,
            enable_guest_logs: config.enable_guest_logs,
            last_time_micros: 0,
        }
    }

    /// The bound memory view.
    pub fn memory(&self) -> Result<MemoryView, HostError> {
        self.memory.ok_or(HostError::MemoryNotBound)
    }

    /// Clock reading that never goes backwards within this bridge.
    pub fn time_micros(&mut self) -> u64 {
        let now = self.clock.now_micros();
        if now < self.last_time_micros {
            tracing::trace!(now, last = self.last_time_micros, "clock went backwards, clamped");
        }
        self.last_time_micros = self.last_time_micros.max(now);
        self.last_time_micros
    }

    /// Forward routine guest output to the sink.
    pub fn write_log(&mut self, text: &str) {
        if self.enable_guest_logs {
            self.log.write(text);
        }
    }

    /// Surface a fatal guest diagnostic and remember it. Only the first
    /// fault is kept; the guest is halted after it.
    pub fn record_fault(&mut self, message: String) {
        self.log.fail(&message);
        if self.fault.is_none() {
            self.fault = Some(message);
        }
    }

    /// Reject a host call and log why.
    pub fn reject(&mut self, call: &'static str, err: &HostError) {
        self.rejected_calls += 1;
        tracing::warn!(call, error = %err, "host call rejected");
    }

    /// Bring the surface up on the guest's request.
    ///
    /// Opens the event queue, drops anything that slipped in before, and
    /// queues the synthetic resize at the front so it is the first event
    /// the guest sees. A repeated request is refused without touching the
    /// queue of a surface that is already up.
    pub fn init_surface(&mut self) -> Result<(), BridgeError> {
        let state = self.adapter.state();
        if state != AdapterState::Uninitialized {
            return Err(BridgeError::InvalidTransition {
                from: state,
                to: AdapterState::Ready,
            });
        }

        self.queue.open();
        let listener = self.queue.sender().into_callback();
        let resize = match self.adapter.init(listener) {
            Ok(event) => event,
            Err(e) => {
                self.queue.close();
                return Err(e);
            }
        };
        let stale = self.queue.clear();
        if stale > 0 {
            tracing::debug!(stale, "dropped events queued before surface init");
        }
        self.queue.push_front(resize);
        Ok(())
    }

    /// `Ready → Suspended`: stop accepting input and drop undelivered events.
    pub fn suspend_surface(&mut self) -> Result<(), BridgeError> {
        self.queue.close();
        self.adapter.suspend()?;
        let dropped = self.queue.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "undelivered events discarded at suspend");
        }
        Ok(())
    }
}
