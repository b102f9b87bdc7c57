//! Wire codec: `DomainMessage` <-> payload bytes.
//!
//! The wire format is `_type`-tagged JSON, with one exception: a clear
//! message is a zero-length payload (the broker-side contract for
//! clearing a retained contact is an empty retained publish, and we keep
//! the codec consistent with that on every transport).
//!
//! Pure functions, no state. `decode(encode(m)) == m` holds for every
//! message kind, including `Unknown` passthrough of foreign `_type`s.

use serde::Serialize;
use serde_json::Value;

use crate::error::CodecError;
use crate::model::{DomainMessage, MessageLocation, MessageTransition};

/// Serialize a domain message to its wire payload.
pub fn encode(message: &DomainMessage) -> Result<Vec<u8>, CodecError> {
    match message {
        DomainMessage::Clear => Ok(Vec::new()),
        DomainMessage::Location(m) => tagged("location", m),
        DomainMessage::Transition(m) => tagged("transition", m),
        DomainMessage::Unknown(value) => {
            serde_json::to_vec(value).map_err(|e| CodecError::MalformedPayload(e.to_string()))
        }
    }
}

/// Parse a wire payload into a domain message.
///
/// Empty input is a clear. Anything else must be a JSON object; an
/// unknown or missing `_type` is preserved as [`DomainMessage::Unknown`]
/// rather than rejected, so only genuinely unparseable input fails.
pub fn decode(bytes: &[u8]) -> Result<DomainMessage, CodecError> {
    if bytes.is_empty() {
        return Ok(DomainMessage::Clear);
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| CodecError::MalformedPayload(e.to_string()))?;
    let Some(object) = value.as_object() else {
        return Err(CodecError::MalformedPayload(
            "payload is not a JSON object".to_string(),
        ));
    };

    match object.get("_type").and_then(Value::as_str) {
        Some("location") => {
            let m: MessageLocation = serde_json::from_value(value.clone())
                .map_err(|e| CodecError::MalformedPayload(e.to_string()))?;
            Ok(DomainMessage::Location(m))
        }
        Some("transition") => {
            let m: MessageTransition = serde_json::from_value(value.clone())
                .map_err(|e| CodecError::MalformedPayload(e.to_string()))?;
            Ok(DomainMessage::Transition(m))
        }
        Some("clear") => Ok(DomainMessage::Clear),
        _ => Ok(DomainMessage::Unknown(value)),
    }
}

fn tagged<T: Serialize>(tag: &str, message: &T) -> Result<Vec<u8>, CodecError> {
    let mut value =
        serde_json::to_value(message).map_err(|e| CodecError::MalformedPayload(e.to_string()))?;
    match value.as_object_mut() {
        Some(object) => {
            object.insert("_type".to_string(), Value::String(tag.to_string()));
        }
        None => {
            return Err(CodecError::MalformedPayload(
                "message did not serialize to a JSON object".to_string(),
            ));
        }
    }
    serde_json::to_vec(&value).map_err(|e| CodecError::MalformedPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::model::TransitionEvent;

    fn full_location() -> MessageLocation {
        MessageLocation {
            lat: 51.2,
            lon: -4.0,
            tst: 1610799026,
            acc: Some(20),
            al: Some(0),
            batt: Some(100),
            bs: Some(0),
            conn: Some("w".to_string()),
            created_at: Some(1610748273),
            tid: Some("aa".to_string()),
            vac: Some(40),
            vel: Some(7),
        }
    }

    fn full_transition() -> MessageTransition {
        MessageTransition {
            event: TransitionEvent::Enter,
            lat: 52.12,
            lon: 0.56,
            tst: 1136214245,
            acc: Some(48.0),
            desc: Some("Transition!".to_string()),
            tid: Some("ce".to_string()),
            trigger: Some("l".to_string()),
            wtst: Some(1136214245),
        }
    }

    #[rstest]
    #[case::location_full(DomainMessage::Location(full_location()))]
    #[case::location_minimal(DomainMessage::Location(MessageLocation::new(0.0, 0.0, 0)))]
    #[case::location_boundary(DomainMessage::Location(MessageLocation::new(
        f64::MAX,
        f64::MIN_POSITIVE,
        i64::MAX,
    )))]
    #[case::transition_full(DomainMessage::Transition(full_transition()))]
    #[case::transition_leave(DomainMessage::Transition(MessageTransition::new(
        TransitionEvent::Leave,
        -90.0,
        180.0,
        0,
    )))]
    #[case::transition_empty_desc(DomainMessage::Transition(MessageTransition {
        desc: Some(String::new()),
        ..full_transition()
    }))]
    #[case::clear(DomainMessage::Clear)]
    #[case::unknown(DomainMessage::Unknown(json!({"_type": "waypoint", "desc": "home", "tst": 0})))]
    #[case::untagged(DomainMessage::Unknown(json!({"lat": 1.5})))]
    fn round_trips_losslessly(#[case] message: DomainMessage) {
        let bytes = encode(&message).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn location_wire_sample_decodes() {
        // Wire sample as published by an existing client.
        let payload = br#"{"_type":"location","acc":20,"al":0,"batt":100,"bs":0,"conn":"w","created_at":1610748273,"lat":51.2,"lon":-4,"tid":"aa","tst":1610799026,"vac":40,"vel":7}"#;
        let decoded = decode(payload).unwrap();
        assert_eq!(decoded, DomainMessage::Location(full_location()));
    }

    #[test]
    fn absent_optionals_stay_absent() {
        let bytes = encode(&DomainMessage::Location(MessageLocation::new(1.0, 2.0, 3))).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("acc"));
        assert!(!object.contains_key("tid"));
        assert_eq!(object["_type"], "location");
    }

    #[test]
    fn empty_payload_is_clear() {
        assert_eq!(decode(b"").unwrap(), DomainMessage::Clear);
        assert!(encode(&DomainMessage::Clear).unwrap().is_empty());
    }

    #[rstest]
    #[case::truncated(&b"{\"_type\":\"location\""[..])]
    #[case::not_json(&b"not json at all"[..])]
    #[case::non_object(&b"[1,2,3]"[..])]
    #[case::bad_field_type(&br#"{"_type":"location","lat":"north","lon":0,"tst":0}"#[..])]
    fn malformed_input_fails(#[case] bytes: &[u8]) {
        assert!(matches!(
            decode(bytes),
            Err(CodecError::MalformedPayload(_))
        ));
    }
}
