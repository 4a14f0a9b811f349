//! Recovering identifier and payload from a raw frame
//!
//! The identifier is a little-endian variable-width integer: the first byte
//! carries the extended flag (bit 6) and the low 6 bits, every following
//! byte contributes 7 more bits. The payload bytes arrive with bit 7
//! cleared; their real MSBs are packed into an 8-bit carry value made of
//! framing bit 6 (as bit 7) and the carry byte (bits 6-0). The last data
//! byte owns carry bit 7, the one before it bit 6, and so on.

use core::fmt;

use heapless::Vec;

use crate::frame::{FrameError, RawFrame};

/// Maximum payload bytes in one bus frame
pub const MAX_DATA_LEN: usize = 8;

/// Shortest identifier encoding in bytes
pub const MIN_ID_LEN: usize = 2;

/// Longest identifier encoding in bytes
pub const MAX_ID_LEN: usize = 5;

/// Bits in the widest encodable identifier (6 + 7 * 4)
pub const IDENTIFIER_BITS: u32 = 34;

/// Largest identifier value the wire encoding can carry
pub const MAX_IDENTIFIER: u64 = (1 << IDENTIFIER_BITS) - 1;

/// Identifier bit 6 of the first byte: extended frame format
pub(crate) const EXTENDED_FLAG: u8 = 0x40;

/// Framing bit 6: MSB of the carry value
pub(crate) const FRAMING_CARRY_BIT: u8 = 0x40;

pub(crate) const LENGTH_MASK: u8 = 0x0F;
pub(crate) const ID_LENGTH_SHIFT: u8 = 4;
pub(crate) const ID_LENGTH_MASK: u8 = 0x03;

/// Bus frame identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameId {
    /// Identifier value
    pub value: u64,
    /// Extended (29-bit) frame format
    pub extended: bool,
}

impl FrameId {
    /// Standard format identifier
    pub const fn standard(value: u64) -> Self {
        Self {
            value,
            extended: false,
        }
    }

    /// Extended format identifier
    pub const fn extended(value: u64) -> Self {
        Self {
            value,
            extended: true,
        }
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extended {
            write!(f, "{:08X}", self.value)
        } else {
            write!(f, "{:03X}", self.value)
        }
    }
}

/// A frame as it appeared on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodedFrame {
    /// Frame identifier
    pub id: FrameId,
    /// Payload bytes in bus order
    pub data: Vec<u8, MAX_DATA_LEN>,
}

impl DecodedFrame {
    /// Create a frame, rejecting payloads longer than [`MAX_DATA_LEN`]
    pub fn new(id: FrameId, data: &[u8]) -> Result<Self, FrameError> {
        let data = Vec::from_slice(data).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self { id, data })
    }

    /// Encode this frame the way the bridge sends it
    pub fn encode(&self) -> Result<RawFrame, FrameError> {
        crate::encode::encode(self)
    }
}

/// Decode one raw frame
///
/// Fails with [`FrameError::LengthMismatch`] when the body length differs
/// from the length declared in the framing byte. Nothing cross-checks the
/// declared identifier width: a corrupted framing byte whose length still
/// matches decodes into a plausible but wrong identifier/data split.
pub fn decode(raw: RawFrame) -> Result<DecodedFrame, FrameError> {
    let framing = raw.framing_byte();
    let body = raw.body();

    let declared = framing & LENGTH_MASK;
    let id_len = (((framing >> ID_LENGTH_SHIFT) & ID_LENGTH_MASK) as usize) + MIN_ID_LEN;

    if body.len() != declared as usize {
        return Err(FrameError::LengthMismatch {
            declared,
            received: body.len() as u8,
        });
    }

    // Identifier bytes plus the carry byte
    if body.len() < id_len + 1 {
        return Err(FrameError::Truncated);
    }

    let (id_bytes, rest) = body.split_at(id_len);
    let (data_bytes, carry_byte) = rest.split_at(rest.len() - 1);

    if data_bytes.len() > MAX_DATA_LEN {
        return Err(FrameError::PayloadTooLarge);
    }

    let id = decode_identifier(id_bytes);

    let mut data = Vec::<u8, MAX_DATA_LEN>::new();
    data.extend_from_slice(data_bytes)
        .map_err(|_| FrameError::PayloadTooLarge)?;

    let mut carry = ((framing & FRAMING_CARRY_BIT) << 1) | (carry_byte[0] & 0x7F);
    for byte in data.iter_mut().rev() {
        *byte |= carry & 0x80;
        carry <<= 1;
    }

    Ok(DecodedFrame { id, data })
}

/// Least-significant group first: 6 bits, then 7 bits per byte
fn decode_identifier(bytes: &[u8]) -> FrameId {
    let Some((&first, rest)) = bytes.split_first() else {
        return FrameId::standard(0);
    };

    let mut value = (first & 0x3F) as u64;
    let mut shift = 6;
    for &byte in rest {
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
    }

    FrameId {
        value,
        extended: first & EXTENDED_FLAG != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use crate::frame::{FrameAccumulator, MAX_RAW_FRAME_SIZE};
    use proptest::prelude::*;

    fn raw(bytes: &[u8]) -> RawFrame {
        RawFrame::from_bytes(bytes).unwrap()
    }

    #[test]
    fn test_decode_empty_payload() {
        // id_length 2, no data, carry, total_length 3
        let frame = decode(raw(&[0x05, 0x01, 0x00, 0x83])).unwrap();
        assert_eq!(frame.id, FrameId::standard(0x45));
        assert!(frame.data.is_empty());
    }

    #[test]
    fn test_decode_restores_msbs() {
        let frame = decode(raw(&[0x23, 0x04, 0x00, 0x01, 0x7F, 0x20, 0xC6])).unwrap();
        assert_eq!(frame.id, FrameId::standard(0x123));
        assert_eq!(&frame.data[..], &[0x80, 0x01, 0xFF]);
    }

    #[test]
    fn test_decode_extended_full_payload() {
        let bytes = [
            0x50, 0x44, 0x57, 0x0D, 0x03, // identifier
            0x02, 0x10, 0x03, 0x2A, 0x3B, 0x4C, 0x5D, 0x6E, // data
            0x78, // carry
            0xFE, // framing
        ];
        let frame = decode(raw(&bytes)).unwrap();
        assert_eq!(frame.id, FrameId::extended(0x18DA_F110));
        assert_eq!(
            &frame.data[..],
            &[0x02, 0x10, 0x03, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE]
        );
    }

    #[test]
    fn test_decode_length_mismatch() {
        // Declares 4 body bytes but carries 3
        let result = decode(raw(&[0x05, 0x01, 0x00, 0x84]));
        assert_eq!(
            result,
            Err(FrameError::LengthMismatch {
                declared: 4,
                received: 3
            })
        );
    }

    #[test]
    fn test_decode_truncated() {
        // Declared and received lengths agree, but a 2-byte identifier
        // leaves no room for the carry byte
        assert_eq!(decode(raw(&[0x05, 0x01, 0x82])), Err(FrameError::Truncated));
        assert_eq!(decode(raw(&[0x80])), Err(FrameError::Truncated));
    }

    #[test]
    fn test_decode_too_many_data_bytes() {
        // id_length 2, 9 data bytes, carry: 12 body bytes
        let mut bytes = [0u8; 13];
        bytes[12] = 0x80 | 12;
        assert_eq!(decode(raw(&bytes)), Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_corrupted_id_length_goes_undetected() {
        let good = encode(&DecodedFrame::new(FrameId::standard(0x123), &[1, 2]).unwrap()).unwrap();
        let mut bytes = [0u8; MAX_RAW_FRAME_SIZE];
        let len = good.len();
        bytes[..len].copy_from_slice(good.as_bytes());
        // Claim a 3-byte identifier; total length still matches
        bytes[len - 1] |= 0x10;

        let frame = decode(raw(&bytes[..len])).unwrap();
        assert_ne!(frame.id, FrameId::standard(0x123));
        assert_eq!(frame.data.len(), 1);
    }

    #[test]
    fn test_resync_after_malformed_frame() {
        let good = encode(&DecodedFrame::new(FrameId::standard(0x7FF), &[0xDE, 0xAD]).unwrap())
            .unwrap();

        let mut stream = heapless::Vec::<u8, 32>::new();
        // Wrong declared length
        stream.extend_from_slice(&[0x01, 0x02, 0x00, 0x85]).unwrap();
        stream.extend_from_slice(good.as_bytes()).unwrap();

        let mut acc = FrameAccumulator::new();
        let mut results = heapless::Vec::<Result<DecodedFrame, FrameError>, 4>::new();
        for &byte in &stream {
            if let Some(frame) = acc.feed(byte).unwrap() {
                results.push(decode(frame)).unwrap();
            }
        }

        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(FrameError::LengthMismatch { .. })));
        let frame = results[1].as_ref().unwrap();
        assert_eq!(frame.id, FrameId::standard(0x7FF));
        assert_eq!(&frame.data[..], &[0xDE, 0xAD]);
    }

    #[test]
    fn test_frame_id_display() {
        assert_eq!(FrameId::standard(0x12).to_string(), "012");
        assert_eq!(FrameId::extended(0x18DA_F110).to_string(), "18DAF110");
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            value in 0u64..(1 << 29),
            extended in any::<bool>(),
            data in proptest::collection::vec(any::<u8>(), 0..=MAX_DATA_LEN),
        ) {
            let original = DecodedFrame::new(FrameId { value, extended }, &data).unwrap();
            let encoded = encode(&original).unwrap();

            prop_assert!(encoded.body().iter().all(|&b| b & 0x80 == 0));
            prop_assert_eq!(decode(encoded).unwrap(), original);
        }

        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(0u8..0x80, 0..MAX_RAW_FRAME_SIZE), framing in 0x80u8..=0xFF) {
            let mut all = bytes.clone();
            all.push(framing);
            let _ = decode(RawFrame::from_bytes(&all).unwrap());
        }
    }
}
