use std::time::Duration;

// Reconnect delays, fixed rather than exponential: the device is a single
// local peer, not a remote fleet.
pub const RECONNECT_AFTER_CLOSE: Duration = Duration::from_millis(3000);
pub const RECONNECT_AFTER_ERROR: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl LinkStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LinkStatus::Connecting => "Connecting",
            LinkStatus::Connected => "Connected",
            LinkStatus::Disconnected => "Disconnected",
            LinkStatus::Error => "Connection Error",
        }
    }
}

/// Pure state machine for the primary channel.
///
/// The monitor owns the transition rules and tells the caller what delay to
/// schedule; the async runtime owns the actual timers and sockets and
/// reports events back here. At most one reconnect is armed at a time.
#[derive(Debug)]
pub struct LinkMonitor {
    status: LinkStatus,
    channel_up: bool,
    reconnect_armed: bool,
}

impl LinkMonitor {
    pub fn new() -> Self {
        Self {
            status: LinkStatus::Connecting,
            channel_up: false,
            reconnect_armed: false,
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    /// True only while the channel itself is established. Unlike `status`,
    /// this is never forced by data arrival, so the fallback poller can
    /// tell a live socket from a link merely presumed alive.
    pub fn channel_up(&self) -> bool {
        self.channel_up
    }

    /// Channel established. Disarms any pending reconnect.
    pub fn on_open(&mut self) {
        self.status = LinkStatus::Connected;
        self.channel_up = true;
        self.reconnect_armed = false;
    }

    /// Channel closed, peer-initiated or network failure. Returns the
    /// reconnect delay to schedule, or None if one is already armed.
    pub fn on_close(&mut self) -> Option<Duration> {
        self.status = LinkStatus::Disconnected;
        self.channel_up = false;
        self.arm(RECONNECT_AFTER_CLOSE)
    }

    /// Channel construction failed outright.
    pub fn on_connect_error(&mut self) -> Option<Duration> {
        self.status = LinkStatus::Error;
        self.channel_up = false;
        self.arm(RECONNECT_AFTER_ERROR)
    }

    /// An armed reconnect attempt is now running.
    pub fn on_reconnect(&mut self) {
        self.status = LinkStatus::Connecting;
        self.reconnect_armed = false;
    }

    /// A valid frame arrived. Data is proof of liveness even if the open
    /// event was missed or racy; returns true when this forced the status
    /// to Connected.
    pub fn on_frame(&mut self) -> bool {
        if self.status == LinkStatus::Connected {
            return false;
        }
        self.status = LinkStatus::Connected;
        true
    }

    fn arm(&mut self, delay: Duration) -> Option<Duration> {
        if self.reconnect_armed {
            return None;
        }
        self.reconnect_armed = true;
        Some(delay)
    }
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new()
    }
}
