//! A fixed-size, page-aligned, zero-filled write buffer.
use std::collections::TryReserveError;

/// Size of every write issued by the engine (1 MiB).
pub const BUFFER_SIZE: usize = 1024 * 1024;

/// Alignment of the buffer's first byte. Raw devices opened for synchronous
/// or direct I/O expect page-aligned memory.
pub const BUFFER_ALIGN: usize = 4096;

/// Zero-filled scratch region reused for every write of a session.
///
/// The backing allocation is over-sized by `align` bytes and the usable
/// window starts at the first aligned address inside it. The buffer is never
/// resized, and its contents are only ever written out, never read back.
pub struct ZeroBuffer {
    storage: Vec<u8>,
    offset: usize,
    len: usize,
}

impl ZeroBuffer {
    /// Allocates a `len`-byte window aligned to `align` bytes.
    ///
    /// Allocation failure is reported instead of aborting the process, so a
    /// caller can refuse to start rather than die mid-way.
    pub fn new(len: usize, align: usize) -> Result<Self, TryReserveError> {
        debug_assert!(align.is_power_of_two());

        let mut storage = Vec::new();
        storage.try_reserve_exact(len + align)?;
        storage.resize(len + align, 0);

        let offset = storage.as_ptr().align_offset(align);
        Ok(Self {
            storage,
            offset,
            len,
        })
    }

    /// Allocates the engine's standard 1 MiB, 4096-aligned buffer.
    pub fn standard() -> Result<Self, TryReserveError> {
        Self::new(BUFFER_SIZE, BUFFER_ALIGN)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.offset..self.offset + self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_buffer_is_aligned_and_zeroed() {
        let buf = ZeroBuffer::standard().unwrap();
        assert_eq!(buf.len(), BUFFER_SIZE);
        assert_eq!(buf.as_slice().as_ptr() as usize % BUFFER_ALIGN, 0);
        assert!(buf.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn small_alignment_still_yields_requested_length() {
        let buf = ZeroBuffer::new(1000, 512).unwrap();
        assert_eq!(buf.as_slice().len(), 1000);
        assert_eq!(buf.as_slice().as_ptr() as usize % 512, 0);
    }

    #[test]
    fn absurd_allocation_is_reported() {
        assert!(ZeroBuffer::new(usize::MAX - 8192, 4096).is_err());
    }
}
