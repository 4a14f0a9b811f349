//! Records handed from the ingest flow to the display flow

use alloc::string::String;
use alloc::vec::Vec;

use canlink_protocol::FrameId;

use crate::cache::DiffMask;

/// One observed change for a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameUpdate<K, F> {
    /// Cache key (frame identifier or text identifier token)
    pub key: K,
    /// Full field values after the change
    pub data: Vec<F>,
    /// Which fields changed; same length as `data`
    pub mask: DiffMask,
    /// When the change was observed, ms since monitor start
    pub timestamp_ms: u64,
}

impl<K, F> FrameUpdate<K, F> {
    /// Number of fields flagged as changed
    pub fn changed_count(&self) -> usize {
        self.mask.iter().filter(|&&changed| changed).count()
    }
}

/// Update from the binary frame pipeline
pub type BinaryUpdate = FrameUpdate<FrameId, u8>;

/// Update from the text line pipeline
pub type TextUpdate = FrameUpdate<String, String>;
