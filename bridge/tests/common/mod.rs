//! Shared test helpers for integration tests.
//!
//! Provides an inline WAT guest that records every call it receives into
//! its own linear memory, plus bridge factories wired to in-memory host
//! capabilities.

#![allow(dead_code)]

use tether_bridge::{Bridge, BridgeConfig};
use tether_hostapi::{HostServices, InputEvent, ManualClock, MemorySink, RecordingSurface, WindowSize};

// ── Guest memory layout ──

/// i64 the guest returns from `frame` as its requested sleep.
pub const FRAME_SLEEP_ADDR: u32 = 4072;
/// i64 written by the `time_micros` command.
pub const TIME_ADDR: u32 = 4080;
/// i32 result of the `memory.grow` command.
pub const GROW_ADDR: u32 = 4088;
/// i32 number of recorded calls.
pub const COUNT_ADDR: u32 = 4092;
/// Start of the (kind, a, b) i32 records.
pub const RECORDS_ADDR: u32 = 4096;

pub const GREETING_ADDR: u32 = 16;
pub const GREETING: &str = "hello from guest";

// ── Record kinds ──

pub const KIND_KEY: i32 = 1;
pub const KIND_MOUSE_MOVE: i32 = 2;
pub const KIND_MOUSE_BUTTON: i32 = 3;
pub const KIND_RESIZE: i32 = 4;
pub const KIND_FRAME: i32 = 5;

// ── Key codes the guest treats as commands ──

pub const CMD_WRITE: u32 = 100;
pub const CMD_WRITE_INVALID_UTF8: u32 = 101;
pub const CMD_FAIL: u32 = 102;
pub const CMD_WRITE_OUT_OF_BOUNDS: u32 = 103;
pub const CMD_GRAB: u32 = 104;
pub const CMD_FULLSCREEN: u32 = 105;
pub const CMD_TIME: u32 = 106;
pub const CMD_GROW: u32 = 107;
pub const CMD_TRAP: u32 = 108;
pub const CMD_FAIL_OUT_OF_BOUNDS: u32 = 109;
/// `write(65536, 5)`: just past the first page.
pub const CMD_WRITE_SECOND_PAGE: u32 = 110;

/// The recording guest. `init` brings the surface up; `on_key` records the
/// key and then runs the command the key code names, with `pressed` as the
/// argument for the mode toggles.
pub const GUEST: &str = r#"
(module
    (import "env" "write" (func $write (param i32 i32)))
    (import "env" "fail" (func $fail (param i32 i32)))
    (import "env" "time_micros" (func $time_micros (result i64)))
    (import "env" "gfx_init" (func $gfx_init))
    (import "env" "gfx_set_grab" (func $gfx_set_grab (param i32)))
    (import "env" "gfx_set_fullscreen" (func $gfx_set_fullscreen (param i32)))

    (memory (export "memory") 1)
    (data (i32.const 16) "hello from guest")
    (data (i32.const 64) "ok\ff\fe")
    (data (i32.const 80) "boom")
    (data (i32.const 96) "bye")

    (func $record (param $kind i32) (param $a i32) (param $b i32)
        (local $n i32)
        (local $addr i32)
        (local.set $n (i32.load (i32.const 4092)))
        (local.set $addr
            (i32.add (i32.const 4096) (i32.mul (local.get $n) (i32.const 12))))
        (i32.store (local.get $addr) (local.get $kind))
        (i32.store offset=4 (local.get $addr) (local.get $a))
        (i32.store offset=8 (local.get $addr) (local.get $b))
        (i32.store (i32.const 4092) (i32.add (local.get $n) (i32.const 1))))

    (func (export "init")
        (call $gfx_init))

    (func (export "on_key") (param $code i32) (param $pressed i32)
        (call $record (i32.const 1) (local.get $code) (local.get $pressed))
        (if (i32.eq (local.get $code) (i32.const 100))
            (then (call $write (i32.const 16) (i32.const 16))))
        (if (i32.eq (local.get $code) (i32.const 101))
            (then (call $write (i32.const 64) (i32.const 4))))
        (if (i32.eq (local.get $code) (i32.const 102))
            (then (call $fail (i32.const 80) (i32.const 4))))
        (if (i32.eq (local.get $code) (i32.const 103))
            (then (call $write (i32.const 65530) (i32.const 100))))
        (if (i32.eq (local.get $code) (i32.const 104))
            (then (call $gfx_set_grab (local.get $pressed))))
        (if (i32.eq (local.get $code) (i32.const 105))
            (then (call $gfx_set_fullscreen (local.get $pressed))))
        (if (i32.eq (local.get $code) (i32.const 106))
            (then (i64.store (i32.const 4080) (call $time_micros))))
        (if (i32.eq (local.get $code) (i32.const 107))
            (then (i32.store (i32.const 4088) (memory.grow (i32.const 1)))))
        (if (i32.eq (local.get $code) (i32.const 108))
            (then unreachable))
        (if (i32.eq (local.get $code) (i32.const 109))
            (then (call $fail (i32.const -16) (i32.const 32))))
        (if (i32.eq (local.get $code) (i32.const 110))
            (then (call $write (i32.const 65536) (i32.const 5)))))

    (func (export "on_mouse_move") (param $x f32) (param $y f32) (param $dx f32) (param $dy f32)
        (call $record (i32.const 2)
            (i32.trunc_f32_s (local.get $x))
            (i32.trunc_f32_s (local.get $y))))

    (func (export "on_mouse_button") (param $button i32) (param $pressed i32)
        (call $record (i32.const 3) (local.get $button) (local.get $pressed)))

    (func (export "on_resize") (param $w i32) (param $h i32)
        (call $record (i32.const 4) (local.get $w) (local.get $h)))

    (func (export "frame_begin"))

    (func (export "frame") (result i64)
        (call $record (i32.const 5) (i32.const 0) (i32.const 0))
        (i64.load (i32.const 4072)))

    (func (export "frame_end"))

    (func (export "quit")
        (call $write (i32.const 96) (i32.const 3)))
)
"#;

/// A guest that never asks for a surface and handles nothing but keys.
pub const HEADLESS_GUEST: &str = r#"
(module
    (memory (export "memory") 1)
    (func (export "init"))
    (func (export "on_key") (param i32 i32)
        (i32.store (i32.const 0) (i32.add (i32.load (i32.const 0)) (i32.const 1))))
)
"#;

/// A guest whose `init` traps.
pub const TRAPPING_INIT_GUEST: &str = r#"
(module
    (memory (export "memory") 1)
    (func (export "init") unreachable)
)
"#;

/// A guest whose `init` calls `fail`.
pub const FAILING_INIT_GUEST: &str = r#"
(module
    (import "env" "fail" (func $fail (param i32 i32)))
    (memory (export "memory") 1)
    (data (i32.const 0) "missing asset")
    (func (export "init")
        (call $fail (i32.const 0) (i32.const 13)))
)
"#;

pub const WINDOW: WindowSize = WindowSize {
    width: 640,
    height: 480,
};

/// A bridge plus handles to the in-memory host capabilities behind it.
pub struct Harness {
    pub bridge: Bridge,
    pub surface: RecordingSurface,
    pub sink: MemorySink,
    pub clock: ManualClock,
}

/// Instantiate `wat` against fresh in-memory capabilities.
pub fn harness_with(wat: &str, config: BridgeConfig) -> Harness {
    let surface = RecordingSurface::new(WINDOW);
    let sink = MemorySink::new();
    let clock = ManualClock::new(1_000_000);
    let services = HostServices::new(surface.clone())
        .with_log(sink.clone())
        .with_clock(clock.clone());
    let bridge = Bridge::new(wat.as_bytes(), config, services).expect("failed to create bridge");
    Harness {
        bridge,
        surface,
        sink,
        clock,
    }
}

/// The recording guest with the default config, not yet initialized.
pub fn harness() -> Harness {
    harness_with(GUEST, BridgeConfig::default())
}

/// The recording guest, initialized and with the startup resize delivered.
pub fn ready_harness() -> Harness {
    let mut h = harness();
    h.bridge.init().expect("guest init failed");
    h.bridge.pump().expect("startup pump failed");
    h
}

/// Every (kind, a, b) record the guest has written so far.
pub fn recorded_events(bridge: &Bridge) -> Vec<(i32, i32, i32)> {
    let count = read_i32(bridge, COUNT_ADDR);
    (0..count as u32)
        .map(|i| {
            let base = RECORDS_ADDR + i * 12;
            (
                read_i32(bridge, base),
                read_i32(bridge, base + 4),
                read_i32(bridge, base + 8),
            )
        })
        .collect()
}

pub fn read_i32(bridge: &Bridge, ptr: u32) -> i32 {
    let bytes = bridge.read_guest(ptr, 4).expect("read i32");
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub fn read_i64(bridge: &Bridge, ptr: u32) -> i64 {
    let bytes = bridge.read_guest(ptr, 8).expect("read i64");
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes);
    i64::from_le_bytes(buf)
}

pub fn key(code: u32) -> InputEvent {
    InputEvent::Key {
        code,
        pressed: true,
    }
}

pub fn key_with(code: u32, pressed: bool) -> InputEvent {
    InputEvent::Key { code, pressed }
}

/// Submit `event` and pump it through to the guest.
pub fn deliver(h: &mut Harness, event: InputEvent) -> Result<usize, tether_bridge::BridgeError> {
    h.bridge.submit(event)?;
    h.bridge.pump()
}
