//! Grow-only image buffer
//!
//! The session materializes frames into reusable scratch buffers. Capacity
//! only ever grows, so steady-state acquisition at a fixed resolution does
//! no per-frame allocation; a resolution change pays one reallocation and
//! later smaller frames reuse the larger allocation.

/// A reusable byte buffer whose capacity never shrinks
///
/// Slices handed out by [`ensure`](ImageBuffer::ensure) and
/// [`filled`](ImageBuffer::filled) are overwritten by the next frame, which
/// is what scopes a [`FrameView`](crate::types::FrameView) to "valid until
/// the next retrieval call."
#[derive(Debug, Default)]
pub struct ImageBuffer {
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Create an empty buffer; the first frame sizes it
    pub fn new() -> Self {
        Self::default()
    }

    /// Current capacity in bytes
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Make at least `size` bytes available and return them for writing
    ///
    /// Grows the allocation when needed, never shrinks it.
    pub fn ensure(&mut self, size: usize) -> &mut [u8] {
        if self.data.len() < size {
            self.data.resize(size, 0);
        }
        &mut self.data[..size]
    }

    /// Read back the first `size` bytes
    ///
    /// Callers pass the byte count the producing step reported. A count
    /// beyond what [`ensure`](ImageBuffer::ensure) provisioned is clamped
    /// to capacity rather than read out of bounds.
    pub fn filled(&self, size: usize) -> &[u8] {
        &self.data[..size.min(self.data.len())]
    }

    /// Copy `src` into the buffer, growing as needed, and return the stored bytes
    pub fn store(&mut self, src: &[u8]) -> &[u8] {
        let dst = self.ensure(src.len());
        dst.copy_from_slice(src);
        &self.data[..src.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_starts_empty() {
        let buf = ImageBuffer::new();
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn test_ensure_grows_to_request() {
        let mut buf = ImageBuffer::new();
        let slice = buf.ensure(1024);
        assert_eq!(slice.len(), 1024);
        assert_eq!(buf.capacity(), 1024);
    }

    #[test]
    fn test_smaller_request_keeps_capacity() {
        let mut buf = ImageBuffer::new();
        buf.ensure(4096);
        let slice = buf.ensure(16);
        assert_eq!(slice.len(), 16);
        assert_eq!(buf.capacity(), 4096);
    }

    #[test]
    fn test_store_round_trip() {
        let mut buf = ImageBuffer::new();
        let stored = buf.store(&[1, 2, 3, 4]);
        assert_eq!(stored, &[1, 2, 3, 4]);
        assert_eq!(buf.filled(4), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_filled_clamps_to_capacity() {
        let mut buf = ImageBuffer::new();
        buf.store(&[7; 16]);
        // An over-reported byte count reads back to capacity, not past it
        assert_eq!(buf.filled(1024), &[7; 16]);
    }

    #[test]
    fn test_store_overwrites_previous_frame() {
        let mut buf = ImageBuffer::new();
        buf.store(&[0xAA; 8]);
        let stored = buf.store(&[0x55; 4]);
        assert_eq!(stored, &[0x55; 4]);
        // Bytes past the new frame are stale, capacity is unchanged
        assert_eq!(buf.capacity(), 8);
    }

    proptest! {
        #[test]
        fn capacity_is_monotonic(sizes in proptest::collection::vec(0usize..65_536, 1..64)) {
            let mut buf = ImageBuffer::new();
            let mut high_water = 0usize;
            for size in sizes {
                buf.ensure(size);
                high_water = high_water.max(size);
                prop_assert_eq!(buf.capacity(), high_water);
            }
        }
    }
}
