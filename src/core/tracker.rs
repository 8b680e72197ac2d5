use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::frame::Frame;

/// Bounded length of the recognized-gesture log.
pub const MAX_HISTORY: usize = 20;

/// One recognized gesture with its local arrival time, most-recent-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub gesture: String,
    pub time: String,
}

/// Derived display values.
///
/// Each field only moves when the corresponding frame field is present; an
/// absent field keeps whatever was displayed last tick. No interpolation,
/// no decay.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayState {
    pub gesture: String,
    pub confidence_pct: f64,

    // Motion metric: raw value to one decimal plus a bar percentage that
    // is upper-clamped only. A negative reading yields a negative bar.
    pub motion_value: String,
    pub motion_pct: f64,

    // Flex channels thumb..pinky: bar percentage in [0, 100] and the
    // rounded label derived from the clamped value.
    pub flex_pct: [f64; 5],
    pub flex_label: [String; 5],

    // IMU pass-through: two decimals for acceleration, one for angular
    // rate. No smoothing.
    pub accel: [String; 3],
    pub gyro: [String; 3],
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            gesture: String::new(),
            confidence_pct: 0.0,
            motion_value: "0.0".to_string(),
            motion_pct: 0.0,
            flex_pct: [0.0; 5],
            flex_label: std::array::from_fn(|_| "0%".to_string()),
            accel: std::array::from_fn(|_| "0.00".to_string()),
            gyro: std::array::from_fn(|_| "0.0".to_string()),
        }
    }
}

/// Everything the presentation layer needs for one repaint.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub sample_count: u64,
    pub prediction_rate: f64,
    pub display: DisplayState,
    pub history: Vec<HistoryEntry>,
}

/// Running aggregates over the frame stream.
///
/// `ingest` is called once per decoded frame in receipt order, from either
/// producer (channel or poller). `rate_tick` runs on its own fixed
/// interval and measures the actual elapsed wall clock, so timer drift
/// does not skew the rate.
#[derive(Debug)]
pub struct AggregateTracker {
    sample_count: u64,
    pred_count: u32,
    prediction_rate: f64,
    last_rate_tick: DateTime<Local>,
    history: VecDeque<HistoryEntry>,
    display: DisplayState,
}

impl AggregateTracker {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            sample_count: 0,
            pred_count: 0,
            prediction_rate: 0.0,
            last_rate_tick: now,
            history: VecDeque::with_capacity(MAX_HISTORY + 1),
            display: DisplayState::default(),
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn prediction_rate(&self) -> f64 {
        self.prediction_rate
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    /// Fold one frame into the aggregates. Every effect is independently
    /// gated on field presence.
    pub fn ingest(&mut self, frame: &Frame, now: DateTime<Local>) {
        self.sample_count += 1;

        if let Some(gesture) = frame.prediction() {
            self.pred_count += 1;
            self.display.gesture = gesture.to_string();
            self.display.confidence_pct = confidence_pct(frame.mean_d);
            self.push_history(gesture, now);
        }

        if let Some(gdp) = frame.gdp {
            self.display.motion_value = format!("{gdp:.1}");
            self.display.motion_pct = motion_pct(gdp);
        }

        for (slot, value) in frame.flex().into_iter().enumerate() {
            if let Some(value) = value {
                let pct = (value * 100.0).clamp(0.0, 100.0);
                self.display.flex_pct[slot] = pct;
                self.display.flex_label[slot] = format!("{pct:.0}%");
            }
        }

        for (slot, axis) in [frame.ax, frame.ay, frame.az].into_iter().enumerate() {
            if let Some(axis) = axis {
                self.display.accel[slot] = format!("{axis:.2}");
            }
        }
        for (slot, axis) in [frame.gx, frame.gy, frame.gz].into_iter().enumerate() {
            if let Some(axis) = axis {
                self.display.gyro[slot] = format!("{axis:.1}");
            }
        }
    }

    /// Recompute the prediction rate from the wall clock actually elapsed
    /// since the previous tick, then reset the interval counter.
    ///
    /// A non-positive interval (clock anomaly) skips the update without
    /// resetting the counter; the next sane tick absorbs the backlog.
    pub fn rate_tick(&mut self, now: DateTime<Local>) {
        let elapsed = (now - self.last_rate_tick).num_milliseconds() as f64 / 1000.0;
        if elapsed <= 0.0 {
            return;
        }

        self.prediction_rate = f64::from(self.pred_count) / elapsed;
        self.pred_count = 0;
        self.last_rate_tick = now;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            sample_count: self.sample_count,
            prediction_rate: self.prediction_rate,
            display: self.display.clone(),
            history: self.history.iter().cloned().collect(),
        }
    }

    fn push_history(&mut self, gesture: &str, now: DateTime<Local>) {
        self.history.push_front(HistoryEntry {
            gesture: gesture.to_string(),
            time: now.format("%H:%M:%S").to_string(),
        });
        self.history.truncate(MAX_HISTORY);
    }
}

fn confidence_pct(mean_d: Option<f64>) -> f64 {
    match mean_d {
        Some(d) => (100.0 - d * 10.0).clamp(0.0, 100.0),
        None => 0.0,
    }
}

// Upper clamp only: the caller decides whether a negative reading is worth
// flooring for display.
fn motion_pct(gdp: f64) -> f64 {
    (gdp / 50.0 * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::decode_frame;
    use chrono::TimeZone;

    fn t0() -> DateTime<Local> {
        Local.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn at(seconds_later: i64) -> DateTime<Local> {
        t0() + chrono::Duration::seconds(seconds_later)
    }

    fn labeled(gesture: &str) -> Frame {
        Frame {
            label: Some(gesture.to_string()),
            ..Frame::default()
        }
    }

    #[test]
    fn sample_count_counts_every_frame() {
        let mut tracker = AggregateTracker::new(t0());

        tracker.ingest(&Frame::default(), t0());
        tracker.ingest(&labeled("fist"), t0());
        tracker.ingest(&decode_frame(r#"{"gdp":1.0}"#).unwrap(), t0());
        tracker.ingest(&decode_frame(r#"{"label":"unknown"}"#).unwrap(), t0());

        assert_eq!(tracker.sample_count(), 4);
    }

    #[test]
    fn history_is_bounded_and_most_recent_first() {
        let mut tracker = AggregateTracker::new(t0());

        for i in 0..25 {
            tracker.ingest(&labeled(&format!("gesture{i}")), t0());
        }

        let history: Vec<_> = tracker.history().collect();
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history[0].gesture, "gesture24");
        assert_eq!(history[MAX_HISTORY - 1].gesture, "gesture5");
    }

    #[test]
    fn unknown_label_updates_nothing() {
        let mut tracker = AggregateTracker::new(t0());
        tracker.ingest(&decode_frame(r#"{"label":"unknown","meanD":1.0}"#).unwrap(), t0());

        assert_eq!(tracker.history().count(), 0);
        assert_eq!(tracker.display().gesture, "");
        assert_eq!(tracker.sample_count(), 1);
    }

    #[test]
    fn confidence_is_clamped() {
        let mut tracker = AggregateTracker::new(t0());

        tracker.ingest(&decode_frame(r#"{"label":"fist","meanD":-50.0}"#).unwrap(), t0());
        assert_eq!(tracker.display().confidence_pct, 100.0);

        tracker.ingest(&decode_frame(r#"{"label":"fist","meanD":20.0}"#).unwrap(), t0());
        assert_eq!(tracker.display().confidence_pct, 0.0);

        // Absent distance metric means no confidence claim at all.
        tracker.ingest(&labeled("fist"), t0());
        assert_eq!(tracker.display().confidence_pct, 0.0);
    }

    #[test]
    fn flex_channels_clamp_and_label() {
        let mut tracker = AggregateTracker::new(t0());
        tracker.ingest(&decode_frame(r#"{"f1":1.5,"f2":-0.2,"f3":0.42}"#).unwrap(), t0());

        let display = tracker.display();
        assert_eq!(display.flex_pct[0], 100.0);
        assert_eq!(display.flex_label[0], "100%");
        assert_eq!(display.flex_pct[1], 0.0);
        assert_eq!(display.flex_label[1], "0%");
        assert!((display.flex_pct[2] - 42.0).abs() < 1e-9);
        assert_eq!(display.flex_label[2], "42%");

        // Untouched channels keep their defaults.
        assert_eq!(display.flex_pct[3], 0.0);
        assert_eq!(display.flex_label[4], "0%");
    }

    #[test]
    fn absent_fields_keep_previous_values() {
        let mut tracker = AggregateTracker::new(t0());
        tracker.ingest(
            &decode_frame(r#"{"label":"fist","meanD":2.0,"gdp":25.0,"f1":0.5,"ax":1.234}"#).unwrap(),
            t0(),
        );
        tracker.ingest(&decode_frame(r#"{"f2":0.9}"#).unwrap(), t0());

        let display = tracker.display();
        assert_eq!(display.gesture, "fist");
        assert_eq!(display.confidence_pct, 80.0);
        assert_eq!(display.motion_value, "25.0");
        assert_eq!(display.motion_pct, 50.0);
        assert_eq!(display.flex_pct[0], 50.0);
        assert!((display.flex_pct[1] - 90.0).abs() < 1e-9);
        assert_eq!(display.accel[0], "1.23");
    }

    #[test]
    fn motion_bar_is_upper_clamped_only() {
        let mut tracker = AggregateTracker::new(t0());

        tracker.ingest(&decode_frame(r#"{"gdp":100.0}"#).unwrap(), t0());
        assert_eq!(tracker.display().motion_pct, 100.0);

        tracker.ingest(&decode_frame(r#"{"gdp":-10.0}"#).unwrap(), t0());
        assert_eq!(tracker.display().motion_pct, -20.0);
        assert_eq!(tracker.display().motion_value, "-10.0");
    }

    #[test]
    fn imu_axes_are_formatted_passthrough() {
        let mut tracker = AggregateTracker::new(t0());
        tracker.ingest(
            &decode_frame(r#"{"ax":0.015,"ay":-9.806,"gz":123.456}"#).unwrap(),
            t0(),
        );

        let display = tracker.display();
        assert_eq!(display.accel[0], "0.01");
        assert_eq!(display.accel[1], "-9.81");
        assert_eq!(display.accel[2], "0.00");
        assert_eq!(display.gyro[2], "123.5");
    }

    #[test]
    fn rate_uses_measured_elapsed_time() {
        let mut tracker = AggregateTracker::new(t0());

        for _ in 0..5 {
            tracker.ingest(&labeled("fist"), t0());
        }
        tracker.rate_tick(at(2));
        assert_eq!(tracker.prediction_rate(), 2.5);

        // No predictions in the next 1s window.
        tracker.rate_tick(at(3));
        assert_eq!(tracker.prediction_rate(), 0.0);
    }

    #[test]
    fn rate_skips_clock_anomaly_without_resetting() {
        let mut tracker = AggregateTracker::new(t0());

        for _ in 0..4 {
            tracker.ingest(&labeled("wave"), t0());
        }

        // Clock went backwards: keep the counter and the old rate.
        tracker.rate_tick(at(-5));
        assert_eq!(tracker.prediction_rate(), 0.0);

        tracker.rate_tick(at(2));
        assert_eq!(tracker.prediction_rate(), 2.0);
    }

    #[test]
    fn end_to_end_single_frame() {
        let mut tracker = AggregateTracker::new(t0());
        tracker.ingest(
            &decode_frame(r#"{"label":"fist","meanD":2.0,"gdp":25.0,"f1":0.5}"#).unwrap(),
            t0(),
        );

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.sample_count, 1);
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].gesture, "fist");
        assert!(!snapshot.history[0].time.is_empty());
        assert_eq!(snapshot.display.confidence_pct, 80.0);
        assert_eq!(snapshot.display.motion_pct, 50.0);
        assert_eq!(snapshot.display.flex_pct[0], 50.0);
        assert_eq!(snapshot.display.flex_label[1], "0%");
    }
}
