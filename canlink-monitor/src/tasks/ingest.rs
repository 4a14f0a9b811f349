//! Ingest loops
//!
//! Read bytes from the bridge, split them into frames or lines, run them
//! through the change cache and queue every change for the display. Each
//! loop owns its accumulator and cache; the dispatcher is the only thing
//! shared with the render loop.
//!
//! The loops only return when the byte source fails.

use canlink_core::{BinaryUpdate, ChangeCache, FrameUpdate, TextUpdate};
use canlink_hal::UartRx;
use canlink_protocol::{decode, parse_line, FrameAccumulator, LineAccumulator, ReadError};
use tracing::{debug, error, info, trace, warn};

use crate::channels::Dispatcher;
use crate::error::MonitorError;
use crate::tasks::tick::Clock;

/// Ingest counters, logged when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Frames or lines accepted
    pub received: u64,
    /// Frames or lines that changed something
    pub changed: u64,
    /// Frames or lines dropped as malformed
    pub malformed: u64,
    /// Updates lost to a full dispatcher
    pub overflowed: u64,
}

/// Binary frame ingest
///
/// Returns the error that ended the stream together with the counters.
pub fn binary_ingest<R, C>(
    rx: &mut R,
    dispatcher: &Dispatcher<BinaryUpdate>,
    clock: &C,
) -> (MonitorError, IngestStats)
where
    R: UartRx,
    R::Error: Into<MonitorError>,
    C: Clock,
{
    info!("Binary ingest started");

    let mut accumulator = FrameAccumulator::new();
    let mut cache = ChangeCache::new();
    let mut stats = IngestStats::default();

    loop {
        let raw = match accumulator.read_frame(rx) {
            Ok(raw) => raw,
            Err(ReadError::Protocol(e)) => {
                stats.malformed += 1;
                debug!("Frame dropped: {:?}", e);
                continue;
            }
            Err(ReadError::Source { error, pending }) => {
                return stop(MonitorError::from_source(error, pending), stats);
            }
        };

        let frame = match decode(raw) {
            Ok(frame) => frame,
            Err(e) => {
                stats.malformed += 1;
                debug!("Frame dropped: {:?}", e);
                continue;
            }
        };
        stats.received += 1;
        trace!("RX: {} [{}]", frame.id, frame.data.len());

        let now_ms = clock.now_ms();
        if let Some(mask) = cache.observe_frame(&frame, now_ms) {
            stats.changed += 1;
            let update = FrameUpdate {
                key: frame.id,
                data: frame.data.to_vec(),
                mask,
                timestamp_ms: now_ms,
            };
            publish(&mut cache, dispatcher, update, &mut stats);
        }
    }
}

/// Text line ingest
///
/// Malformed lines are discarded without a trace at the default level.
pub fn text_ingest<R, C>(
    rx: &mut R,
    dispatcher: &Dispatcher<TextUpdate>,
    clock: &C,
) -> (MonitorError, IngestStats)
where
    R: UartRx,
    R::Error: Into<MonitorError>,
    C: Clock,
{
    info!("Text ingest started");

    let mut accumulator = LineAccumulator::new();
    let mut cache = ChangeCache::new();
    let mut stats = IngestStats::default();

    loop {
        let line = match accumulator.read_line(rx) {
            Ok(line) => line,
            Err(ReadError::Protocol(e)) => {
                stats.malformed += 1;
                trace!("Line dropped: {:?}", e);
                continue;
            }
            Err(ReadError::Source { error, pending }) => {
                return stop(MonitorError::from_source(error, pending), stats);
            }
        };

        let record = match parse_line(&line) {
            Ok(record) => record,
            Err(e) => {
                stats.malformed += 1;
                trace!("Line dropped: {:?}", e);
                continue;
            }
        };
        stats.received += 1;

        let fields: Vec<String> = record.fields.iter().map(|f| String::from(*f)).collect();
        let key = String::from(record.identifier);

        let now_ms = clock.now_ms();
        if let Some(mask) = cache.observe(key.clone(), &fields, now_ms) {
            stats.changed += 1;
            let update = FrameUpdate {
                key,
                data: fields,
                mask,
                timestamp_ms: now_ms,
            };
            publish(&mut cache, dispatcher, update, &mut stats);
        }
    }
}

/// Queue an update, dropping it if the display is behind
///
/// A dropped update never reaches the table, so the key is forgotten: its
/// next frame is reported again in full instead of being swallowed as
/// unchanged.
pub(crate) fn publish<K, F>(
    cache: &mut ChangeCache<K, F>,
    dispatcher: &Dispatcher<FrameUpdate<K, F>>,
    update: FrameUpdate<K, F>,
    stats: &mut IngestStats,
) where
    K: Ord + core::fmt::Display,
{
    trace!(
        "{}: {} of {} fields changed",
        update.key,
        update.changed_count(),
        update.data.len()
    );
    if let Err(update) = dispatcher.try_dispatch(update) {
        stats.overflowed += 1;
        warn!(
            "Dispatch channel full ({} queued), dropping update for {}",
            dispatcher.len(),
            update.key
        );
        cache.forget(&update.key);
    }
}

fn stop(err: MonitorError, stats: IngestStats) -> (MonitorError, IngestStats) {
    if err.is_clean_close() {
        info!("Ingest stopped: {}", err);
    } else {
        error!("Ingest stopped: {}", err);
    }
    info!(
        "  {} received, {} changed, {} malformed, {} overflowed",
        stats.received, stats.changed, stats.malformed, stats.overflowed
    );
    (err, stats)
}
