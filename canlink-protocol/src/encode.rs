//! Bridge-side encoding
//!
//! Inverse of [`crate::decode`]. The monitor never transmits, but the
//! encoder documents the format exactly and builds canned captures for
//! tests.

use heapless::Vec;

use crate::decode::{
    DecodedFrame, EXTENDED_FLAG, ID_LENGTH_SHIFT, MAX_IDENTIFIER, MIN_ID_LEN,
};
use crate::frame::{FrameError, RawFrame, BOUNDARY_BIT, MAX_RAW_FRAME_SIZE};

/// Encode a frame for the wire
///
/// Uses the shortest identifier width that holds the value (never fewer
/// than [`MIN_ID_LEN`] bytes).
pub fn encode(frame: &DecodedFrame) -> Result<RawFrame, FrameError> {
    let id = frame.id;
    if id.value > MAX_IDENTIFIER {
        return Err(FrameError::IdentifierTooWide);
    }

    let mut bytes = Vec::<u8, MAX_RAW_FRAME_SIZE>::new();

    let mut first = (id.value & 0x3F) as u8;
    if id.extended {
        first |= EXTENDED_FLAG;
    }
    push(&mut bytes, first)?;

    let mut remaining = id.value >> 6;
    loop {
        push(&mut bytes, (remaining & 0x7F) as u8)?;
        remaining >>= 7;
        if remaining == 0 {
            break;
        }
    }
    let id_len = bytes.len();

    // Last data byte's MSB lands in carry bit 7, the one before in bit 6...
    let mut carry = 0u8;
    for (k, &byte) in frame.data.iter().rev().enumerate() {
        carry |= (byte & 0x80) >> k;
    }

    for &byte in &frame.data {
        push(&mut bytes, byte & 0x7F)?;
    }
    push(&mut bytes, carry & 0x7F)?;

    let framing = BOUNDARY_BIT
        | ((carry & 0x80) >> 1)
        | (((id_len - MIN_ID_LEN) as u8) << ID_LENGTH_SHIFT)
        | bytes.len() as u8;
    push(&mut bytes, framing)?;

    Ok(RawFrame::from_vec(bytes))
}

fn push(bytes: &mut Vec<u8, MAX_RAW_FRAME_SIZE>, byte: u8) -> Result<(), FrameError> {
    bytes.push(byte).map_err(|_| FrameError::PayloadTooLarge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{FrameId, MAX_ID_LEN};

    #[test]
    fn test_encode_known_frame() {
        let frame = DecodedFrame::new(FrameId::standard(0x123), &[0x80, 0x01, 0xFF]).unwrap();
        let raw = encode(&frame).unwrap();
        assert_eq!(raw.as_bytes(), &[0x23, 0x04, 0x00, 0x01, 0x7F, 0x20, 0xC6]);
    }

    #[test]
    fn test_encode_small_id_uses_two_bytes() {
        let frame = DecodedFrame::new(FrameId::standard(0x05), &[]).unwrap();
        let raw = encode(&frame).unwrap();
        assert_eq!(raw.as_bytes(), &[0x05, 0x00, 0x00, 0x83]);
    }

    #[test]
    fn test_encode_extended_flag() {
        let frame = DecodedFrame::new(FrameId::extended(0x01), &[]).unwrap();
        let raw = encode(&frame).unwrap();
        assert_eq!(raw.as_bytes()[0], 0x41);
    }

    #[test]
    fn test_encode_widest_identifier() {
        let frame = DecodedFrame::new(FrameId::extended(MAX_IDENTIFIER), &[0xFF; 8]).unwrap();
        let raw = encode(&frame).unwrap();
        // 5 id + 8 data + carry + framing
        assert_eq!(raw.len(), MAX_ID_LEN + 8 + 2);
        assert_eq!(raw.framing_byte(), 0x80 | 0x40 | 0x30 | 14);
        assert_eq!(crate::decode(raw).unwrap(), frame);
    }

    #[test]
    fn test_encode_identifier_too_wide() {
        let frame = DecodedFrame::new(FrameId::standard(MAX_IDENTIFIER + 1), &[]).unwrap();
        assert_eq!(encode(&frame), Err(FrameError::IdentifierTooWide));
    }

    #[test]
    fn test_payload_too_large() {
        let result = DecodedFrame::new(FrameId::standard(1), &[0u8; 9]);
        assert_eq!(result, Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_encode_via_method() {
        let frame = DecodedFrame::new(FrameId::standard(0x7FF), &[]).unwrap();
        assert_eq!(frame.encode().unwrap().as_bytes(), &[0x3F, 0x1F, 0x00, 0x83]);
    }
}
