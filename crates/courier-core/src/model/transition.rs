use serde::{Deserialize, Serialize};

/// Direction of a region transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionEvent {
    Enter,
    Leave,
}

/// A region enter/leave event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTransition {
    pub event: TransitionEvent,
    pub lat: f64,
    pub lon: f64,

    /// Event timestamp, epoch seconds.
    pub tst: i64,

    /// Accuracy of the triggering fix, in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acc: Option<f32>,

    /// Region description as configured by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    /// Two-character tracker id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,

    /// What produced the event ("l" for a location-triggered region
    /// check, "c" for a beacon/circular region).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,

    /// Timestamp of the region definition, epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wtst: Option<i64>,
}

impl MessageTransition {
    pub fn new(event: TransitionEvent, lat: f64, lon: f64, tst: i64) -> Self {
        Self {
            event,
            lat,
            lon,
            tst,
            acc: None,
            desc: None,
            tid: None,
            trigger: None,
            wtst: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_lowercase() {
        let m = MessageTransition::new(TransitionEvent::Enter, 52.12, 0.56, 1136214245);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["event"], "enter");
    }
}
