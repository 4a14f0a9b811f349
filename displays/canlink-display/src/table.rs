//! Presentation-visible frame table
//!
//! One row per key, holding the last update received for it. A field is
//! drawn highlighted only while its mask bit is set and the row was updated
//! within the staleness window; afterwards it is drawn plain, but the mask
//! itself is left untouched.

use alloc::collections::btree_map::{self, BTreeMap};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::{self, Write};

use canlink_core::config::Radix;
use canlink_core::{DiffMask, FrameUpdate};

use crate::backend::{DisplayBackend, DisplayError};
use crate::format::FieldFormat;

/// Narrowest key column
const MIN_KEY_WIDTH: usize = 4;

/// Last update shown for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow<F> {
    data: Vec<F>,
    mask: DiffMask,
    last_seen_ms: u64,
}

impl<F> TableRow<F> {
    /// Field values
    pub fn data(&self) -> &[F] {
        &self.data
    }

    /// Stored diff mask, without decay applied
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// When the row last changed
    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms
    }
}

/// Identifier → latest update, with staleness decay
#[derive(Debug, Clone)]
pub struct FrameTable<K, F> {
    rows: BTreeMap<K, TableRow<F>>,
    staleness_window_ms: u64,
}

impl<K: Ord, F> FrameTable<K, F> {
    /// Create an empty table
    pub fn new(staleness_window_ms: u64) -> Self {
        Self {
            rows: BTreeMap::new(),
            staleness_window_ms,
        }
    }

    /// Replace the row for the update's key
    pub fn apply(&mut self, update: FrameUpdate<K, F>) {
        let FrameUpdate {
            key,
            data,
            mask,
            timestamp_ms,
        } = update;
        self.rows.insert(
            key,
            TableRow {
                data,
                mask,
                last_seen_ms: timestamp_ms,
            },
        );
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True before the first update
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for `key`
    pub fn get(&self, key: &K) -> Option<&TableRow<F>> {
        self.rows.get(key)
    }

    /// Rows in key order
    pub fn iter(&self) -> btree_map::Iter<'_, K, TableRow<F>> {
        self.rows.iter()
    }

    /// True while the row's changes are still fresh
    pub fn is_fresh(&self, row: &TableRow<F>, now_ms: u64) -> bool {
        now_ms.saturating_sub(row.last_seen_ms) <= self.staleness_window_ms
    }

    /// Whether field `index` of `row` should be drawn as changed
    pub fn is_highlighted(&self, row: &TableRow<F>, index: usize, now_ms: u64) -> bool {
        row.mask.get(index).copied().unwrap_or(false) && self.is_fresh(row, now_ms)
    }

    /// Number of fields currently drawn as changed
    ///
    /// Highlights only appear through [`FrameTable::apply`], so a drop in
    /// this count between two polls means decay changed the picture.
    pub fn highlighted_count(&self, now_ms: u64) -> usize {
        self.rows
            .values()
            .filter(|row| self.is_fresh(row, now_ms))
            .map(|row| row.mask.iter().filter(|&&changed| changed).count())
            .sum()
    }
}

impl<K, F> FrameTable<K, F>
where
    K: Ord + fmt::Display,
    F: FieldFormat,
{
    /// Draw the table, one row per key in key order
    ///
    /// Rows that do not fit the backend are skipped.
    pub fn render<B: DisplayBackend>(
        &self,
        backend: &mut B,
        radix: Radix,
        now_ms: u64,
    ) -> Result<(), DisplayError> {
        backend.clear()?;
        let (_, max_rows) = backend.dimensions();

        let keys: Vec<String> = self.rows.keys().map(|k| k.to_string()).collect();
        let key_width = keys
            .iter()
            .map(|k| k.chars().count())
            .max()
            .unwrap_or(0)
            .max(MIN_KEY_WIDTH);

        for (row_idx, (key, row)) in keys.iter().zip(self.rows.values()).enumerate() {
            if row_idx >= max_rows as usize {
                break;
            }
            let row_idx = row_idx as u16;

            let mut line = String::new();
            write!(line, "{:>width$} -", key, width = key_width)
                .map_err(|_| DisplayError::Format)?;

            let mut regions = Vec::new();
            for (i, field) in row.data.iter().enumerate() {
                line.push(' ');
                let start = line.chars().count();
                field
                    .write_field(&mut line, radix)
                    .map_err(|_| DisplayError::Format)?;
                if self.is_highlighted(row, i, now_ms) {
                    regions.push((start, line.chars().count()));
                }
            }

            backend.draw_text(row_idx, 0, &line)?;
            for (start, end) in regions {
                backend.invert_region(row_idx, start as u16, end as u16)?;
            }
        }

        backend.flush()
    }
}
