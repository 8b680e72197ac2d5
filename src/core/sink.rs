use std::sync::Arc;

use crate::link::LinkStatus;
use crate::tracker::Snapshot;

/// Inbound contract of the presentation layer.
///
/// The pipeline reports every status transition and every ingested frame;
/// implementations decide what (and whether) to draw. Kept as a trait so
/// the core stays free of any rendering dependency.
pub trait PresentationSink: Send + Sync + 'static {
    fn status(&self, status: LinkStatus);
    fn update(&self, snapshot: &Snapshot);
}

/// Convenient alias for passing around shared sinks.
pub type SharedSink = Arc<dyn PresentationSink>;
