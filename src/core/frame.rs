use serde::Deserialize;
use thiserror::Error;

/// Sentinel label the classifier emits when no gesture fired this tick.
pub const NO_PREDICTION: &str = "unknown";

/// One telemetry sample from the glove.
///
/// Every field is optional: absence means "no update for this channel this
/// tick", never "value is zero". Unknown wire fields are ignored so the
/// device firmware can grow its payload without breaking older clients.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Frame {
    pub label: Option<String>,

    // Classifier distance metric; lower = higher confidence.
    #[serde(rename = "meanD")]
    pub mean_d: Option<f64>,

    // Aggregate motion metric, nominally non-negative.
    pub gdp: Option<f64>,

    // Flex sensors, thumb through pinky, nominally in [0, 1] but the
    // source does not guarantee the bound.
    pub f1: Option<f64>,
    pub f2: Option<f64>,
    pub f3: Option<f64>,
    pub f4: Option<f64>,
    pub f5: Option<f64>,

    // Accelerometer axes.
    pub ax: Option<f64>,
    pub ay: Option<f64>,
    pub az: Option<f64>,

    // Gyroscope axes.
    pub gx: Option<f64>,
    pub gy: Option<f64>,
    pub gz: Option<f64>,
}

impl Frame {
    /// The recognized gesture for this tick, if the classifier fired.
    pub fn prediction(&self) -> Option<&str> {
        match self.label.as_deref() {
            None | Some(NO_PREDICTION) => None,
            Some(label) => Some(label),
        }
    }

    /// Flex channels in display order (thumb..pinky).
    pub fn flex(&self) -> [Option<f64>; 5] {
        [self.f1, self.f2, self.f3, self.f4, self.f5]
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse one raw inbound payload into a validated frame.
///
/// A payload that fails structural parsing is an error for the caller to
/// log and discard; it never aborts the stream.
pub fn decode_frame(payload: &str) -> Result<Frame, DecodeError> {
    Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_full_frame() {
        let frame = decode_frame(
            r#"{"label":"fist","meanD":2.0,"gdp":25.0,"f1":0.5,"f2":0.1,"f3":0.2,"f4":0.3,"f5":0.4,"ax":0.01,"ay":-0.02,"az":9.81,"gx":1.5,"gy":-2.5,"gz":0.0}"#,
        )
        .unwrap();

        assert_eq!(frame.label.as_deref(), Some("fist"));
        assert_eq!(frame.prediction(), Some("fist"));
        assert_eq!(frame.mean_d, Some(2.0));
        assert_eq!(frame.gdp, Some(25.0));
        assert_eq!(frame.flex(), [Some(0.5), Some(0.1), Some(0.2), Some(0.3), Some(0.4)]);
        assert_eq!(frame.az, Some(9.81));
        assert_eq!(frame.gy, Some(-2.5));
    }

    #[test]
    fn decode_partial_frame() {
        let frame = decode_frame(r#"{"gdp":3.5}"#).unwrap();
        assert_eq!(frame.gdp, Some(3.5));
        assert!(frame.label.is_none());
        assert!(frame.prediction().is_none());
        assert_eq!(frame.flex(), [None; 5]);
    }

    #[test]
    fn decode_empty_object() {
        let frame = decode_frame("{}").unwrap();
        assert!(frame.prediction().is_none());
        assert!(frame.mean_d.is_none());
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let frame = decode_frame(r#"{"label":"wave","battery_mv":3700}"#).unwrap();
        assert_eq!(frame.prediction(), Some("wave"));
    }

    #[test]
    fn unknown_label_is_not_a_prediction() {
        let frame = decode_frame(r#"{"label":"unknown","meanD":1.0}"#).unwrap();
        assert!(frame.prediction().is_none());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(decode_frame("not json").is_err());
        assert!(decode_frame(r#"{"label":"#).is_err());

        // A bad payload must not poison later decodes.
        assert!(decode_frame(r#"{"label":"point"}"#).is_ok());
    }
}
