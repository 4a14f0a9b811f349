//! Field formatting
//!
//! Binary payload bytes are shown in hex or decimal; text fields are shown
//! as received.

use alloc::string::{String, ToString};
use core::fmt::{self, Write};

use canlink_core::config::Radix;
use canlink_core::FrameUpdate;

/// A value that can be shown in one table cell
pub trait FieldFormat {
    /// Write the cell text for this field
    fn write_field<W: Write>(&self, out: &mut W, radix: Radix) -> fmt::Result;
}

impl FieldFormat for u8 {
    fn write_field<W: Write>(&self, out: &mut W, radix: Radix) -> fmt::Result {
        match radix {
            Radix::Hex => write!(out, "{:02X}", self),
            Radix::Decimal => write!(out, "{:>3}", self),
        }
    }
}

impl FieldFormat for String {
    fn write_field<W: Write>(&self, out: &mut W, _radix: Radix) -> fmt::Result {
        write!(out, "{:>2}", self)
    }
}

/// Format an update as a single log line
///
/// Changed fields are marked with a trailing `*`.
pub fn log_line<K, F>(update: &FrameUpdate<K, F>, radix: Radix) -> String
where
    K: fmt::Display,
    F: FieldFormat,
{
    let mut line = String::new();
    // Key impls need not honour width, so pad the rendered string
    let key = update.key.to_string();
    // Writing to a String cannot fail
    let _ = write!(line, "{:>8} [{}]", key, update.data.len());
    for (field, &changed) in update.data.iter().zip(&update.mask) {
        line.push(' ');
        let _ = field.write_field(&mut line, radix);
        if changed {
            line.push('*');
        }
    }
    line
}
