//! Property tests for memory marshaling bounds and resize scaling.

mod common;

use std::sync::Arc;

use proptest::prelude::*;
use tether_bridge::adapter::SurfaceAdapter;
use tether_bridge::memory::{check_range, decode_utf8, read_bytes};
use tether_hostapi::{InputEvent, RecordingSurface, WindowSize};

use common::*;

proptest! {
    #[test]
    fn check_range_accepts_exactly_in_bounds(
        size in 0usize..200_000,
        ptr in any::<u32>(),
        len in any::<u32>(),
    ) {
        let in_bounds = ptr as u64 + len as u64 <= size as u64;
        match check_range(size, ptr, len) {
            Ok(range) => {
                prop_assert!(in_bounds);
                prop_assert_eq!(range.start, ptr as usize);
                prop_assert_eq!(range.len(), len as usize);
            }
            Err(e) => {
                prop_assert!(!in_bounds);
                prop_assert!(e.is_out_of_bounds());
            }
        }
    }

    #[test]
    fn read_bytes_matches_slice(
        mem in proptest::collection::vec(any::<u8>(), 0..512),
        ptr in 0u32..600,
        len in 0u32..600,
    ) {
        let end = ptr as usize + len as usize;
        match read_bytes(&mem, ptr, len) {
            Ok(bytes) => prop_assert_eq!(bytes, &mem[ptr as usize..end]),
            Err(_) => prop_assert!(end > mem.len()),
        }
    }

    #[test]
    fn decode_never_fails(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let text = decode_utf8(&bytes);
        if let Ok(valid) = std::str::from_utf8(&bytes) {
            prop_assert_eq!(text.as_ref(), valid);
        }
    }

    #[test]
    fn resize_forwards_backing_divided_by_factor(
        width in 1u32..10_000,
        height in 1u32..10_000,
        factor in 0u32..8,
    ) {
        let surface = RecordingSurface::new(WindowSize::new(100, 100));
        let mut adapter = SurfaceAdapter::new(Box::new(surface.clone()), factor);
        adapter.init(Arc::new(|_: InputEvent| {})).unwrap();

        let logical = adapter.resize(WindowSize::new(width, height)).unwrap();
        let backing = surface.backing_size().unwrap();
        prop_assert_eq!(logical, WindowSize::new(width, height));
        let factor = factor.max(1);
        prop_assert_eq!(
            WindowSize::new(backing.width / factor, backing.height / factor),
            logical
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn guest_text_round_trips(text in "[a-zA-Z0-9 àéîõü]{0,64}", ptr in 1024u32..60_000) {
        let mut h = ready_harness();
        h.bridge.write_guest(ptr, text.as_bytes()).unwrap();
        let read = h.bridge.read_guest_utf8(ptr, text.len() as u32).unwrap();
        prop_assert_eq!(read, text);
    }
}
