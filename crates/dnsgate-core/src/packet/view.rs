//! Bounds-checked read-only view over a byte range
//!
//! Every header type in this crate reads through a [`ByteView`], so no call
//! site does raw index arithmetic on packet buffers.

/// A read-only window into a packet buffer
///
/// All accessors validate the requested range first and return `None`
/// instead of panicking when it falls outside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteView<'a> {
    data: &'a [u8],
}

impl<'a> ByteView<'a> {
    /// View the whole slice
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// View `length` bytes of `buffer` starting at `offset`
    ///
    /// The window is clamped to the buffer, so an offset or length that
    /// overshoots yields a shorter (possibly empty) view.
    pub fn window(buffer: &'a [u8], offset: usize, length: usize) -> Self {
        let start = offset.min(buffer.len());
        let end = start.saturating_add(length).min(buffer.len());
        Self {
            data: &buffer[start..end],
        }
    }

    /// Number of bytes in the view
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the view is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The viewed bytes
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Read one byte
    pub fn u8_at(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    /// Read a big-endian u16
    pub fn u16_at(&self, offset: usize) -> Option<u16> {
        self.array_at::<2>(offset).map(u16::from_be_bytes)
    }

    /// Read a fixed number of bytes
    pub fn array_at<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        self.slice(offset, N)?.try_into().ok()
    }

    /// Borrow `len` bytes starting at `offset`
    pub fn slice(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        let end = offset.checked_add(len)?;
        self.data.get(offset..end)
    }

    /// Narrow to `len` bytes starting at `offset`
    pub fn subview(&self, offset: usize, len: usize) -> Option<ByteView<'a>> {
        self.slice(offset, len).map(ByteView::new)
    }

    /// Everything from `offset` to the end of the view
    pub fn tail(&self, offset: usize) -> Option<ByteView<'a>> {
        self.data.get(offset..).map(ByteView::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_clamps() {
        let buf = [1u8, 2, 3, 4];
        assert_eq!(ByteView::window(&buf, 1, 2).as_bytes(), &[2, 3]);
        assert_eq!(ByteView::window(&buf, 2, 100).as_bytes(), &[3, 4]);
        assert!(ByteView::window(&buf, 9, 1).is_empty());
        assert_eq!(ByteView::window(&buf, 1, usize::MAX).len(), 3);
    }

    #[test]
    fn test_reads_in_bounds() {
        let buf = [0x12u8, 0x34, 0x56];
        let view = ByteView::new(&buf);
        assert_eq!(view.u8_at(2), Some(0x56));
        assert_eq!(view.u16_at(0), Some(0x1234));
        assert_eq!(view.u16_at(1), Some(0x3456));
        assert_eq!(view.array_at::<3>(0), Some([0x12, 0x34, 0x56]));
    }

    #[test]
    fn test_reads_out_of_bounds() {
        let buf = [0x12u8, 0x34];
        let view = ByteView::new(&buf);
        assert_eq!(view.u8_at(2), None);
        assert_eq!(view.u16_at(1), None);
        assert_eq!(view.slice(1, 2), None);
        assert_eq!(view.slice(usize::MAX, 2), None);
        assert!(view.subview(3, 0).is_none());
        assert_eq!(view.tail(2).map(|v| v.len()), Some(0));
    }
}
