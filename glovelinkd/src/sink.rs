//! Headless presentation: every pipeline event becomes a log line.

use glovelink::link::LinkStatus;
use glovelink::sink::PresentationSink;
use glovelink::tracker::Snapshot;
use tracing::{debug, info};

/// Sink for running without a UI attached. Status transitions are worth
/// seeing at info level; per-frame snapshots would flood it, so they go
/// to debug.
pub struct LogSink;

impl PresentationSink for LogSink {
    fn status(&self, status: LinkStatus) {
        info!(status = status.label(), "link status changed");
    }

    fn update(&self, snapshot: &Snapshot) {
        debug!(
            samples = snapshot.sample_count,
            rate = %format!("{:.1}", snapshot.prediction_rate),
            gesture = %snapshot.display.gesture,
            confidence = %format!("{:.0}%", snapshot.display.confidence_pct),
            "snapshot updated"
        );
    }
}
