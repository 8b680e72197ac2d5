#[path = "core/frame.rs"]
pub mod frame;

#[path = "core/link.rs"]
pub mod link;

#[path = "core/sink.rs"]
pub mod sink;

#[path = "core/tracker.rs"]
pub mod tracker;
