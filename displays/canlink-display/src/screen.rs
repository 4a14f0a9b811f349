//! Screen buffer
//!
//! A character grid with per-row highlight regions. The terminal renderer
//! draws the frame table into a `Screen` and then paints it in one go.

use alloc::string::String;
use alloc::vec::Vec;

use crate::backend::{DisplayBackend, DisplayError};

/// Screen buffer for text-mode displays
#[derive(Debug, Clone)]
pub struct Screen {
    cols: u16,
    /// Current display content
    lines: Vec<String>,
    /// Highlight regions per row (start_col, end_col)
    highlights: Vec<Vec<(u16, u16)>>,
    /// Whether the screen needs to be redrawn
    dirty: bool,
}

impl Screen {
    /// Create an empty screen of `cols` x `rows` characters
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            lines: (0..rows).map(|_| String::new()).collect(),
            highlights: (0..rows).map(|_| Vec::new()).collect(),
            dirty: true,
        }
    }

    /// Change the size, keeping content that still fits
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.lines.resize_with(rows as usize, String::new);
        self.highlights.resize_with(rows as usize, Vec::new);
        for line in &mut self.lines {
            truncate_chars(line, cols as usize);
        }
        self.dirty = true;
    }

    /// Get the content of a specific row
    pub fn get_line(&self, row: usize) -> Option<&str> {
        self.lines.get(row).map(|s| s.as_str())
    }

    /// Get highlight regions for a row
    pub fn get_highlights(&self, row: usize) -> &[(u16, u16)] {
        self.highlights.get(row).map(|h| h.as_slice()).unwrap_or(&[])
    }

    /// Check if screen needs redrawing
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark screen as clean (after painting)
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Get all lines as an iterator
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|s| s.as_str())
    }

    /// Split a row into (text, highlighted) segments for painting
    pub fn segments(&self, row: usize) -> Vec<(&str, bool)> {
        let Some(line) = self.lines.get(row) else {
            return Vec::new();
        };

        let mut regions: Vec<(usize, usize)> = self
            .get_highlights(row)
            .iter()
            .map(|&(s, e)| (s as usize, e as usize))
            .collect();
        regions.sort_unstable();

        // Regions are in columns; slice on char boundaries
        let to_byte = |col: usize| {
            line.char_indices()
                .nth(col)
                .map(|(i, _)| i)
                .unwrap_or(line.len())
        };

        let mut out = Vec::new();
        let mut pos = 0;
        for (start, end) in regions {
            let start = to_byte(start).max(pos);
            let end = to_byte(end);
            if start >= end {
                continue;
            }
            if start > pos {
                out.push((&line[pos..start], false));
            }
            out.push((&line[start..end], true));
            pos = end;
        }
        if pos < line.len() {
            out.push((&line[pos..], false));
        }
        out
    }
}

/// Cut `line` to at most `max` characters
fn truncate_chars(line: &mut String, max: usize) {
    if let Some((idx, _)) = line.char_indices().nth(max) {
        line.truncate(idx);
    }
}

impl DisplayBackend for Screen {
    fn clear(&mut self) -> Result<(), DisplayError> {
        for line in &mut self.lines {
            line.clear();
        }
        for highlight in &mut self.highlights {
            highlight.clear();
        }
        self.dirty = true;
        Ok(())
    }

    fn draw_text(&mut self, row: u16, col: u16, text: &str) -> Result<(), DisplayError> {
        let cols = self.cols as usize;
        let line = self
            .lines
            .get_mut(row as usize)
            .ok_or(DisplayError::InvalidCoordinates)?;

        let col = col as usize;
        if col >= cols {
            return Err(DisplayError::InvalidCoordinates);
        }

        // Pad up to the column, replace whatever was there
        let mut chars: Vec<char> = line.chars().collect();
        if chars.len() < col {
            chars.resize(col, ' ');
        }
        for (i, c) in text.chars().enumerate() {
            let at = col + i;
            if at >= cols {
                break;
            }
            if at < chars.len() {
                chars[at] = c;
            } else {
                chars.push(c);
            }
        }
        *line = chars.into_iter().collect();
        self.dirty = true;
        Ok(())
    }

    fn invert_region(&mut self, row: u16, start_col: u16, end_col: u16) -> Result<(), DisplayError> {
        if start_col > end_col {
            return Err(DisplayError::InvalidCoordinates);
        }
        let regions = self
            .highlights
            .get_mut(row as usize)
            .ok_or(DisplayError::InvalidCoordinates)?;
        regions.push((start_col, end_col.min(self.cols)));
        self.dirty = true;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    fn dimensions(&self) -> (u16, u16) {
        (self.cols, self.lines.len() as u16)
    }
}
