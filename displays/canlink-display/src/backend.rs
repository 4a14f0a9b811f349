//! Display backend trait
//!
//! Defines the interface for anything the frame table can be drawn on.

/// Display backend errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Communication error with the display (terminal write failed)
    Communication,
    /// Invalid coordinates or dimensions
    InvalidCoordinates,
    /// Text could not be formatted
    Format,
}

/// Display backend trait
///
/// A grid of character cells. Implementations may buffer everything until
/// [`DisplayBackend::flush`].
pub trait DisplayBackend {
    /// Clear the entire display
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Draw text at the specified row and column
    ///
    /// - `row`: Row number (0-based)
    /// - `col`: Column number in characters (0-based)
    /// - `text`: Text to display
    fn draw_text(&mut self, row: u16, col: u16, text: &str) -> Result<(), DisplayError>;

    /// Highlight a region on the specified row (changed fields)
    ///
    /// - `row`: Row number
    /// - `start_col`: Starting column
    /// - `end_col`: Ending column (exclusive)
    fn invert_region(&mut self, row: u16, start_col: u16, end_col: u16)
        -> Result<(), DisplayError>;

    /// Flush buffered content to the display
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Get the display dimensions
    ///
    /// Returns (columns, rows) in character units
    fn dimensions(&self) -> (u16, u16);
}
