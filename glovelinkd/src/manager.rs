//! Channel lifecycle around the pure link monitor.
//!
//! Primary path: persistent WebSocket with fixed-delay reconnects.
//! Fallback path: fixed-interval HTTP polling, armed when the channel is
//! not up after a grace period. Both paths feed the same decode -> ingest
//! pipeline; teardown aborts every task the manager spawned.

use std::sync::Arc;

use chrono::Local;
use futures_util::{SinkExt, StreamExt};
use glovelink::frame::decode_frame;
use glovelink::link::LinkMonitor;
use glovelink::sink::SharedSink;
use glovelink::tracker::AggregateTracker;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;

// ═══════════════════════════════════════════════════════════════════════════
// Shared Pipeline State
// ═══════════════════════════════════════════════════════════════════════════

/// State both producers converge on. Each stimulus (channel message, poll
/// response, reconnect expiry, rate tick) runs to completion under the
/// write lock, so handlers never interleave mid-update.
pub struct ClientState {
    pub monitor: LinkMonitor,
    pub tracker: AggregateTracker,
}

/// Decode one raw payload and fold it into the aggregates. The channel
/// receive loop and the fallback poller both land here, in arrival order.
async fn ingest_payload(state: &Arc<RwLock<ClientState>>, sink: &SharedSink, payload: &str) {
    let frame = match decode_frame(payload) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "discarding malformed frame");
            return;
        }
    };

    let mut s = state.write().await;
    if s.monitor.on_frame() {
        info!("data arrival marked link connected");
        sink.status(s.monitor.status());
    }
    s.tracker.ingest(&frame, Local::now());
    sink.update(&s.tracker.snapshot());
}

// ═══════════════════════════════════════════════════════════════════════════
// Connection Manager
// ═══════════════════════════════════════════════════════════════════════════

pub struct ConnectionManager {
    config: ClientConfig,
    state: Arc<RwLock<ClientState>>,
    sink: SharedSink,
    fallback: Option<JoinHandle<()>>,
    rate_ticker: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn new(config: ClientConfig, sink: SharedSink) -> Self {
        let state = ClientState {
            monitor: LinkMonitor::new(),
            tracker: AggregateTracker::new(Local::now()),
        };

        Self {
            config,
            state: Arc::new(RwLock::new(state)),
            sink,
            fallback: None,
            rate_ticker: None,
        }
    }

    /// Drive the primary channel until the future is dropped. Dropping it
    /// closes the socket; `shutdown` reaps the helper tasks afterwards.
    pub async fn run(&mut self) {
        self.spawn_rate_ticker();
        self.arm_fallback();
        self.sink.status(self.state.read().await.monitor.status());

        loop {
            let dial = tokio::time::timeout(
                self.config.connect_timeout,
                connect_async(self.config.channel_url.as_str()),
            )
            .await;

            let delay = match dial {
                Ok(Ok((stream, _))) => {
                    info!(url = %self.config.channel_url, "channel established");
                    {
                        let mut s = self.state.write().await;
                        s.monitor.on_open();
                        self.sink.status(s.monitor.status());
                    }

                    self.pump_channel(stream).await;

                    warn!("channel closed");
                    let mut s = self.state.write().await;
                    let delay = s.monitor.on_close();
                    self.sink.status(s.monitor.status());
                    delay
                }
                Ok(Err(e)) => {
                    warn!(error = %e, url = %self.config.channel_url, "channel dial failed");
                    let mut s = self.state.write().await;
                    let delay = s.monitor.on_connect_error();
                    self.sink.status(s.monitor.status());
                    delay
                }
                Err(_) => {
                    warn!(
                        timeout_ms = self.config.connect_timeout.as_millis() as u64,
                        "channel dial timed out"
                    );
                    let mut s = self.state.write().await;
                    let delay = s.monitor.on_connect_error();
                    self.sink.status(s.monitor.status());
                    delay
                }
            };

            // The channel is down; give the poller its chance again.
            self.arm_fallback();

            if let Some(delay) = delay {
                debug!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
                tokio::time::sleep(delay).await;
            }

            let mut s = self.state.write().await;
            s.monitor.on_reconnect();
            self.sink.status(s.monitor.status());
        }
    }

    /// Abort every helper task the manager spawned. Safe to call after the
    /// `run` future has been dropped.
    pub fn shutdown(&mut self) {
        for handle in [self.fallback.take(), self.rate_ticker.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
        info!("connection manager stopped");
    }

    async fn pump_channel(&self, stream: WebSocketStream<MaybeTlsStream<TcpStream>>) {
        let (mut write, mut read) = stream.split();

        while let Some(item) = read.next().await {
            match item {
                Ok(Message::Text(payload)) => {
                    ingest_payload(&self.state, &self.sink, &payload).await;
                }
                Ok(Message::Ping(data)) => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        warn!(error = %e, "pong failed");
                        return;
                    }
                }
                Ok(Message::Close(_)) => return,
                // Binary and pong frames are not telemetry.
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "channel receive error");
                    return;
                }
            }
        }
    }

    /// One-shot grace timer that turns into the poller when it expires
    /// with the channel still down. Re-armed after every channel loss;
    /// idempotent while a previous task is still running.
    fn arm_fallback(&mut self) {
        if self.fallback.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let config = self.config.clone();
        let state = Arc::clone(&self.state);
        let sink = Arc::clone(&self.sink);
        self.fallback = Some(tokio::spawn(fallback_task(config, state, sink)));
    }

    fn spawn_rate_ticker(&mut self) {
        let interval = self.config.rate_interval;
        let state = Arc::clone(&self.state);
        let sink = Arc::clone(&self.sink);

        self.rate_ticker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately and measures nothing.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let mut s = state.write().await;
                s.tracker.rate_tick(Local::now());
                sink.update(&s.tracker.snapshot());
            }
        }));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Fallback Poller
// ═══════════════════════════════════════════════════════════════════════════

async fn fallback_task(config: ClientConfig, state: Arc<RwLock<ClientState>>, sink: SharedSink) {
    tokio::time::sleep(config.fallback_grace).await;

    if state.read().await.monitor.channel_up() {
        debug!("channel up within grace period, fallback not needed");
        return;
    }

    info!(
        url = %config.poll_url,
        interval_ms = config.poll_interval.as_millis() as u64,
        "channel not up after grace period, falling back to polling"
    );

    let client = reqwest::Client::new();
    let mut ticker = tokio::time::interval(config.poll_interval);

    loop {
        ticker.tick().await;

        // channel_up, not the frame-forced status: frames arriving through
        // this very poller must not convince us the socket recovered.
        if config.suppress_poll_when_connected && state.read().await.monitor.channel_up() {
            info!("primary channel recovered, stopping fallback polling");
            return;
        }

        match client.get(config.poll_url.as_str()).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => ingest_payload(&state, &sink, &body).await,
                Err(e) => debug!(error = %e, "poll body read failed"),
            },
            Ok(resp) => debug!(status = %resp.status(), "poll returned non-success"),
            Err(e) => debug!(error = %e, "poll request failed"),
        }
    }
}
