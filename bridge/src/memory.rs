//! Guest linear memory marshaling with bounds checking.
//!
//! All helpers validate pointer and length arguments against the guest's
//! linear memory size at the moment of the access. Out-of-bounds access
//! returns `HostError::OutOfBounds`.
//!
//! [`MemoryView`] wraps a wasmtime `Memory` handle rather than a slice, so
//! every access re-reads the current base and length. A guest that grows
//! its memory between two calls never sees a stale view.

use std::borrow::Cow;
use std::ops::Range;

use tether_hostapi::HostError;
use wasmtime::{AsContext, AsContextMut, Instance, Memory, StoreContext, StoreContextMut};

/// Name of the memory export every guest must provide.
pub const MEMORY_EXPORT: &str = "memory";

/// Validate that `[ptr, ptr+len)` lies within a memory of `size` bytes and
/// return the range as host indices.
pub fn check_range(size: usize, ptr: u32, len: u32) -> Result<Range<usize>, HostError> {
    let start = ptr as usize;
    let end = start
        .checked_add(len as usize)
        .ok_or_else(|| HostError::out_of_bounds(ptr, len, size))?;
    if end > size {
        return Err(HostError::out_of_bounds(ptr, len, size));
    }
    Ok(start..end)
}

/// Borrow `len` bytes of `mem` starting at `ptr`.
pub fn read_bytes(mem: &[u8], ptr: u32, len: u32) -> Result<&[u8], HostError> {
    let range = check_range(mem.len(), ptr, len)?;
    Ok(&mem[range])
}

/// Write `data` into `mem` starting at `ptr`.
pub fn write_bytes(mem: &mut [u8], ptr: u32, data: &[u8]) -> Result<(), HostError> {
    let len = u32::try_from(data.len())
        .map_err(|_| HostError::out_of_bounds(ptr, u32::MAX, mem.len()))?;
    let range = check_range(mem.len(), ptr, len)?;
    mem[range].copy_from_slice(data);
    Ok(())
}

/// Decode guest bytes as UTF-8, substituting U+FFFD for invalid sequences.
///
/// Invalid input is reported at `debug` level and never surfaces as an
/// error to the caller.
pub fn decode_utf8(bytes: &[u8]) -> Cow<'_, str> {
    let text = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = text {
        tracing::debug!(len = bytes.len(), "invalid UTF-8 from guest, replacement characters substituted");
    }
    text
}

/// Typed view over the guest's exported linear memory.
///
/// Holds only the engine handle; the base address and length are looked up
/// from the store on every call.
#[derive(Debug, Clone, Copy)]
pub struct MemoryView {
    memory: Memory,
}

impl MemoryView {
    pub fn new(memory: Memory) -> Self {
        Self { memory }
    }

    /// Bind to the instance's `memory` export, if it has one.
    pub fn from_instance(instance: &Instance, store: impl AsContextMut) -> Option<Self> {
        instance.get_memory(store, MEMORY_EXPORT).map(Self::new)
    }

    /// Current size of the linear memory in bytes.
    pub fn size(&self, store: impl AsContext) -> usize {
        self.memory.data_size(store)
    }

    /// Borrow `[ptr, ptr+len)` from the current linear memory.
    pub fn slice<'a, T: 'a>(
        &self,
        store: impl Into<StoreContext<'a, T>>,
        ptr: u32,
        len: u32,
    ) -> Result<&'a [u8], HostError> {
        read_bytes(self.memory.data(store), ptr, len)
    }

    /// Decode `[ptr, ptr+len)` as UTF-8 text (lossy).
    pub fn read_utf8<'a, T: 'a>(
        &self,
        store: impl Into<StoreContext<'a, T>>,
        ptr: u32,
        len: u32,
    ) -> Result<String, HostError> {
        let bytes = self.slice(store, ptr, len)?;
        Ok(decode_utf8(bytes).into_owned())
    }

    /// Copy `data` into the current linear memory at `ptr`.
    pub fn write<'a, T: 'a>(
        &self,
        store: impl Into<StoreContextMut<'a, T>>,
        ptr: u32,
        data: &[u8],
    ) -> Result<(), HostError> {
        write_bytes(self.memory.data_mut(store), ptr, data)
    }

    /// The underlying engine handle.
    pub fn memory(&self) -> Memory {
        self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmtime::{Engine, MemoryType, Store};

    #[test]
    fn test_read_bytes_basic() {
        let mem = vec![10, 20, 30, 40, 50];
        assert_eq!(read_bytes(&mem, 1, 3).unwrap(), &[20, 30, 40]);
    }

    #[test]
    fn test_read_bytes_out_of_bounds() {
        let mem = vec![10, 20, 30];
        assert!(read_bytes(&mem, 1, 3).unwrap_err().is_out_of_bounds());
        assert!(read_bytes(&mem, 4, 0).is_err());
        assert!(read_bytes(&mem, u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn test_zero_length_at_end_is_valid() {
        let mem = vec![1, 2, 3];
        assert_eq!(read_bytes(&mem, 3, 0).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn test_write_bytes_basic() {
        let mut mem = vec![0; 8];
        write_bytes(&mut mem, 2, &[0xAA, 0xBB]).unwrap();
        assert_eq!(mem[2], 0xAA);
        assert_eq!(mem[3], 0xBB);
    }

    #[test]
    fn test_write_bytes_out_of_bounds() {
        let mut mem = vec![0; 4];
        assert!(write_bytes(&mut mem, 2, &[1, 2, 3]).is_err());
        assert_eq!(mem, vec![0; 4]);
    }

    #[test]
    fn test_check_range() {
        assert_eq!(check_range(100, 0, 100).unwrap(), 0..100);
        assert!(check_range(100, 0, 101).is_err());
        assert!(check_range(100, 101, 0).is_err());
    }

    #[test]
    fn test_decode_utf8_valid_is_borrowed() {
        assert!(matches!(decode_utf8(b"hello"), Cow::Borrowed("hello")));
    }

    #[test]
    fn test_decode_utf8_invalid_is_replaced() {
        let text = decode_utf8(&[0x68, 0x69, 0xFF, 0xFE]);
        assert_eq!(text, "hi\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_view_sees_growth() {
        let engine = Engine::default();
        let mut store = Store::new(&engine, ());
        let memory = Memory::new(&mut store, MemoryType::new(1, None)).unwrap();
        let view = MemoryView::new(memory);

        assert_eq!(view.size(&store), 65536);
        assert!(view.slice(&store, 65536, 4).is_err());

        memory.grow(&mut store, 1).unwrap();
        assert_eq!(view.size(&store), 131072);
        view.write(&mut store, 65536, b"grow").unwrap();
        assert_eq!(view.read_utf8(&store, 65536, 4).unwrap(), "grow");
    }
}
