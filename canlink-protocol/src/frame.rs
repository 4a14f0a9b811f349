//! Frame boundary detection for the bridge byte stream.
//!
//! A frame ends at the first byte with bit 7 set. Everything before it, back
//! to the previous boundary, belongs to the frame:
//! - BODY (1-15 bytes): identifier, data and carry, all with bit 7 clear
//! - FRAMING (1 byte): bit 7 set, low nibble = BODY length

use canlink_hal::UartRx;
use heapless::Vec;

/// Bit that marks the framing byte
pub const BOUNDARY_BIT: u8 = 0x80;

/// Largest BODY length the 4-bit length field can declare
pub const MAX_BODY_LEN: usize = 0x0F;

/// Maximum complete frame size (BODY + FRAMING)
pub const MAX_RAW_FRAME_SIZE: usize = MAX_BODY_LEN + 1;

/// Returns true if `byte` terminates a frame
#[inline]
pub const fn is_boundary(byte: u8) -> bool {
    byte & BOUNDARY_BIT != 0
}

/// Errors that can occur while framing, decoding or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Declared BODY length does not match the bytes received
    LengthMismatch { declared: u8, received: u8 },
    /// Declared length leaves no room for the identifier and carry byte
    Truncated,
    /// More data bytes than the carry bits can restore
    PayloadTooLarge,
    /// Identifier does not fit the 34-bit wire encoding
    IdentifierTooWide,
    /// More than [`MAX_BODY_LEN`] bytes arrived without a boundary
    Overrun,
}

/// Failure while pulling a frame (or line) out of a byte source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError<E, P = FrameError> {
    /// The source failed; `pending` bytes of a partial frame were buffered
    Source { error: E, pending: usize },
    /// The bytes read did not form a valid unit
    Protocol(P),
}

impl<E> From<FrameError> for ReadError<E, FrameError> {
    fn from(e: FrameError) -> Self {
        ReadError::Protocol(e)
    }
}

/// Bytes of one frame, framing byte last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Vec<u8, MAX_RAW_FRAME_SIZE>,
}

impl RawFrame {
    /// Build a frame from captured bytes
    ///
    /// Returns `None` unless the last byte, and only the last byte, is a
    /// boundary marker.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&last, body) = bytes.split_last()?;
        if !is_boundary(last) || body.iter().any(|&b| is_boundary(b)) {
            return None;
        }
        let bytes = Vec::from_slice(bytes).ok()?;
        Some(Self { bytes })
    }

    pub(crate) fn from_vec(bytes: Vec<u8, MAX_RAW_FRAME_SIZE>) -> Self {
        Self { bytes }
    }

    /// All bytes including the framing byte
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The trailing framing byte
    pub fn framing_byte(&self) -> u8 {
        // Every constructor guarantees at least the framing byte
        self.bytes.last().copied().unwrap_or(BOUNDARY_BIT)
    }

    /// Bytes before the framing byte
    pub fn body(&self) -> &[u8] {
        match self.bytes.split_last() {
            Some((_, body)) => body,
            None => &[],
        }
    }

    /// Total length including the framing byte
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a frame holds at least its framing byte
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Splits a byte stream into [`RawFrame`]s
///
/// A pure delimiter scanner: it looks at bit 7 and nothing else. Decoding
/// the contents is left to [`crate::decode`].
#[derive(Debug, Clone, Default)]
pub struct FrameAccumulator {
    buffer: Vec<u8, MAX_RAW_FRAME_SIZE>,
    /// Bytes thrown away since the buffer overflowed
    discarded: usize,
    overrun: bool,
}

impl FrameAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            discarded: 0,
            overrun: false,
        }
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarded = 0;
        self.overrun = false;
    }

    /// Bytes received since the last boundary
    pub fn pending(&self) -> usize {
        self.buffer.len() + self.discarded
    }

    /// Feed a single byte
    ///
    /// Returns `Ok(Some(frame))` when `byte` is a boundary marker,
    /// `Ok(None)` when more bytes are needed, or `Err(Overrun)` at the
    /// boundary that ends an over-long run. The accumulator is ready for the
    /// next frame after any `Ok(Some(_))` or `Err(_)`.
    pub fn feed(&mut self, byte: u8) -> Result<Option<RawFrame>, FrameError> {
        if is_boundary(byte) {
            if self.overrun {
                self.reset();
                return Err(FrameError::Overrun);
            }
            // The buffer holds at most MAX_BODY_LEN bytes here
            let _ = self.buffer.push(byte);
            let frame = RawFrame::from_vec(core::mem::take(&mut self.buffer));
            return Ok(Some(frame));
        }

        if self.overrun {
            self.discarded = self.discarded.saturating_add(1);
        } else if self.buffer.len() == MAX_BODY_LEN {
            // Keep scanning for the next boundary, but this frame is lost
            self.overrun = true;
            self.discarded = self.buffer.len() + 1;
            self.buffer.clear();
        } else {
            let _ = self.buffer.push(byte);
        }
        Ok(None)
    }

    /// Read bytes from `rx` until one complete frame has been accumulated
    ///
    /// Blocks for as many reads as the source needs. There is no timeout.
    pub fn read_frame<R: UartRx>(&mut self, rx: &mut R) -> Result<RawFrame, ReadError<R::Error>> {
        loop {
            let byte = rx.read_byte().map_err(|error| ReadError::Source {
                error,
                pending: self.pending(),
            })?;
            if let Some(frame) = self.feed(byte)? {
                return Ok(frame);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canlink_hal::{SliceRx, SliceRxError};

    #[test]
    fn test_is_boundary() {
        assert!(is_boundary(0x80));
        assert!(is_boundary(0xFF));
        assert!(!is_boundary(0x7F));
        assert!(!is_boundary(0x00));
    }

    #[test]
    fn test_feed_returns_frame_at_boundary() {
        let mut acc = FrameAccumulator::new();
        assert_eq!(acc.feed(0x05), Ok(None));
        assert_eq!(acc.feed(0x01), Ok(None));
        assert_eq!(acc.feed(0x00), Ok(None));
        assert_eq!(acc.pending(), 3);

        let frame = acc.feed(0x83).unwrap().unwrap();
        assert_eq!(frame.as_bytes(), &[0x05, 0x01, 0x00, 0x83]);
        assert_eq!(frame.framing_byte(), 0x83);
        assert_eq!(frame.body(), &[0x05, 0x01, 0x00]);
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn test_lone_boundary_is_a_frame() {
        let mut acc = FrameAccumulator::new();
        let frame = acc.feed(0x80).unwrap().unwrap();
        assert_eq!(frame.len(), 1);
        assert!(frame.body().is_empty());
    }

    #[test]
    fn test_overrun_reported_at_next_boundary() {
        let mut acc = FrameAccumulator::new();
        for _ in 0..20 {
            assert_eq!(acc.feed(0x11), Ok(None));
        }
        assert_eq!(acc.pending(), 20);
        assert_eq!(acc.feed(0x8F), Err(FrameError::Overrun));
        assert_eq!(acc.pending(), 0);

        // Scanning resumes cleanly
        assert_eq!(acc.feed(0x01), Ok(None));
        let frame = acc.feed(0x81).unwrap().unwrap();
        assert_eq!(frame.as_bytes(), &[0x01, 0x81]);
    }

    #[test]
    fn test_max_body_is_not_an_overrun() {
        let mut acc = FrameAccumulator::new();
        for i in 0..MAX_BODY_LEN as u8 {
            assert_eq!(acc.feed(i), Ok(None));
        }
        let frame = acc.feed(0x8F).unwrap().unwrap();
        assert_eq!(frame.len(), MAX_RAW_FRAME_SIZE);
    }

    #[test]
    fn test_read_frame_from_source() {
        let mut rx = SliceRx::new(&[0x01, 0x02, 0x82, 0x03, 0x81]);
        let mut acc = FrameAccumulator::new();

        let first = acc.read_frame(&mut rx).unwrap();
        assert_eq!(first.as_bytes(), &[0x01, 0x02, 0x82]);
        let second = acc.read_frame(&mut rx).unwrap();
        assert_eq!(second.as_bytes(), &[0x03, 0x81]);
    }

    #[test]
    fn test_read_frame_source_closed_mid_frame() {
        let mut rx = SliceRx::new(&[0x01, 0x81, 0x05, 0x06]);
        let mut acc = FrameAccumulator::new();

        acc.read_frame(&mut rx).unwrap();
        let err = acc.read_frame(&mut rx).unwrap_err();
        assert_eq!(
            err,
            ReadError::Source {
                error: SliceRxError,
                pending: 2
            }
        );
    }

    #[test]
    fn test_read_frame_source_closed_between_frames() {
        let mut rx = SliceRx::new(&[0x81]);
        let mut acc = FrameAccumulator::new();

        acc.read_frame(&mut rx).unwrap();
        let err = acc.read_frame(&mut rx).unwrap_err();
        assert!(matches!(err, ReadError::Source { pending: 0, .. }));
    }

    #[test]
    fn test_raw_frame_from_bytes() {
        assert!(RawFrame::from_bytes(&[0x01, 0x81]).is_some());
        assert!(RawFrame::from_bytes(&[]).is_none());
        // Not terminated
        assert!(RawFrame::from_bytes(&[0x01, 0x02]).is_none());
        // Boundary in the middle
        assert!(RawFrame::from_bytes(&[0x81, 0x02, 0x81]).is_none());
        // Too long
        let mut long = [0u8; MAX_RAW_FRAME_SIZE + 1];
        long[MAX_RAW_FRAME_SIZE] = 0x80;
        assert!(RawFrame::from_bytes(&long).is_none());
    }
}
