use serde::{Deserialize, Serialize};

/// A location fix.
///
/// Field names follow the wire format (short keys, epoch-second
/// timestamps). Optional fields are omitted from the JSON entirely when
/// unset rather than serialized as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLocation {
    pub lat: f64,
    pub lon: f64,

    /// Fix timestamp, epoch seconds.
    pub tst: i64,

    /// Horizontal accuracy in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acc: Option<u32>,

    /// Altitude above sea level in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub al: Option<i32>,

    /// Battery level percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batt: Option<u8>,

    /// Battery status (0 unknown, 1 unplugged, 2 charging, 3 full).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bs: Option<u8>,

    /// Connectivity at fix time ("w" wifi, "m" mobile, "o" offline).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conn: Option<String>,

    /// When the message was created, if it differs from the fix time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,

    /// Two-character tracker id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,

    /// Vertical accuracy in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vac: Option<u32>,

    /// Velocity in km/h.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vel: Option<u32>,
}

impl MessageLocation {
    pub fn new(lat: f64, lon: f64, tst: i64) -> Self {
        Self {
            lat,
            lon,
            tst,
            acc: None,
            al: None,
            batt: None,
            bs: None,
            conn: None,
            created_at: None,
            tid: None,
            vac: None,
            vel: None,
        }
    }
}
