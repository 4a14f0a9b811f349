//! Text line variant of the bridge protocol
//!
//! Line format (newline terminated, whitespace separated):
//! - IDENTIFIER: opaque token, used as the cache key
//! - COUNT: decimal number of fields that follow
//! - FIELD_1 … FIELD_COUNT: opaque tokens
//!
//! A line is only accepted when COUNT matches the fields actually present.
//! Anything else is discarded; the next newline starts over.

use canlink_hal::UartRx;
use heapless::Vec;

use crate::frame::ReadError;

/// Longest accepted line, excluding the newline
pub const MAX_LINE_LEN: usize = 256;

/// Most fields a single line may carry
pub const MAX_TEXT_FIELDS: usize = 64;

/// Reasons a line is discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line is not valid UTF-8
    Encoding,
    /// Line exceeded [`MAX_LINE_LEN`] before its newline
    TooLong,
    /// Missing tokens, bad COUNT, or COUNT disagrees with the fields
    Invalid,
}

/// One line's bytes, without the newline
pub type RawLine = Vec<u8, MAX_LINE_LEN>;

/// A validated text line, borrowing from the raw line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord<'a> {
    pub identifier: &'a str,
    pub fields: Vec<&'a str, MAX_TEXT_FIELDS>,
}

/// Parse and validate one line
pub fn parse_line(line: &[u8]) -> Result<TextRecord<'_>, LineError> {
    let text = core::str::from_utf8(line).map_err(|_| LineError::Encoding)?;
    let mut tokens = text.split_whitespace();

    let identifier = tokens.next().ok_or(LineError::Invalid)?;
    let count: usize = tokens
        .next()
        .ok_or(LineError::Invalid)?
        .parse()
        .map_err(|_| LineError::Invalid)?;

    let mut fields = Vec::new();
    for token in tokens {
        fields.push(token).map_err(|_| LineError::Invalid)?;
    }

    // A record needs at least one field
    if fields.is_empty() || fields.len() != count {
        return Err(LineError::Invalid);
    }

    Ok(TextRecord { identifier, fields })
}

/// Splits a byte stream into newline-terminated lines
#[derive(Debug, Clone, Default)]
pub struct LineAccumulator {
    buffer: RawLine,
    /// Bytes thrown away since the buffer overflowed
    discarded: usize,
    overflow: bool,
}

impl LineAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            discarded: 0,
            overflow: false,
        }
    }

    /// Bytes received since the last newline, including discarded ones
    pub fn pending(&self) -> usize {
        self.buffer.len() + self.discarded
    }

    /// Feed a single byte
    ///
    /// Returns `Ok(Some(line))` at a newline, `Ok(None)` while a line is in
    /// progress, or `Err(TooLong)` at the newline ending an over-long line.
    pub fn feed(&mut self, byte: u8) -> Result<Option<RawLine>, LineError> {
        if byte == b'\n' {
            if self.overflow {
                self.overflow = false;
                self.discarded = 0;
                self.buffer.clear();
                return Err(LineError::TooLong);
            }
            return Ok(Some(core::mem::take(&mut self.buffer)));
        }

        if self.overflow {
            self.discarded = self.discarded.saturating_add(1);
        } else if self.buffer.push(byte).is_err() {
            self.overflow = true;
            self.discarded = self.buffer.len() + 1;
            self.buffer.clear();
        }
        Ok(None)
    }

    /// Read bytes from `rx` until a complete line is available
    pub fn read_line<R: UartRx>(
        &mut self,
        rx: &mut R,
    ) -> Result<RawLine, ReadError<R::Error, LineError>> {
        loop {
            let byte = rx.read_byte().map_err(|error| ReadError::Source {
                error,
                pending: self.pending(),
            })?;
            if let Some(line) = self.feed(byte).map_err(ReadError::Protocol)? {
                return Ok(line);
            }
        }
    }
}
