//! Ingest to display hand-off
//!
//! A bounded embassy-sync channel between the ingest thread (producer) and
//! the render loop (consumer). The host links the `std` critical-section
//! implementation, so the channel is shared across threads by reference.
//!
//! The capacity is fixed at build time. It holds more than one poll of
//! back-to-back minimum-size frames on the default link (115200 baud,
//! 100 ms polls); [`frames_per_poll`] tells the monitor at start-up whether
//! a faster link or slower poll could outrun it.

use canlink_protocol::decode::MIN_ID_LEN;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

/// Channel capacity for frame updates
pub const DISPATCH_CHANNEL_SIZE: usize = 1024;

/// Smallest frame on the wire: identifier, carry and framing byte
const MIN_FRAME_BYTES: u64 = MIN_ID_LEN as u64 + 2;

/// Bits per byte on an 8N1 link
const BITS_PER_BYTE: u64 = 10;

/// Worst-case number of frames the link can deliver between two polls
pub fn frames_per_poll(baudrate: u32, poll_interval_ms: u64) -> u64 {
    let frames_per_sec = baudrate as u64 / BITS_PER_BYTE / MIN_FRAME_BYTES;
    (frames_per_sec * poll_interval_ms).div_ceil(1000)
}

/// Bounded FIFO of updates
pub struct Dispatcher<T> {
    channel: Channel<CriticalSectionRawMutex, T, DISPATCH_CHANNEL_SIZE>,
}

impl<T> Dispatcher<T> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Queue an update without blocking
    ///
    /// Hands the update back when the channel is full.
    pub fn try_dispatch(&self, update: T) -> Result<(), T> {
        self.channel
            .try_send(update)
            .map_err(|TrySendError::Full(update)| update)
    }

    /// Oldest queued update, if any
    pub fn try_next(&self) -> Option<T> {
        self.channel.try_receive().ok()
    }

    /// Number of queued updates
    pub fn len(&self) -> usize {
        self.channel.len()
    }
}
