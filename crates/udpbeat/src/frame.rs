// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire representation of a single log event.
//!
//! Producers send one JSON object per datagram:
//!
//! ```text
//! {"time":"2024-03-01T12:00:00Z","type":"audit","entry":{"k":"v"},"message":"hello","level":"info"}
//! ```
//!
//! Every field is optional. Missing or `null` fields decode to empty values and unknown
//! keys are ignored, so older and newer producers can talk to the same relay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Receive buffer size used when the configuration does not override it.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// One log event as transmitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frame {
    /// Instant the event occurred. `None` when the producer did not send one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Short string classifying the event source.
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    /// Free-form structured payload, passed through untouched.
    #[serde(deserialize_with = "null_as_default")]
    pub entry: Map<String, Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub level: String,
}

/// Reasons a datagram could not be turned into a [`Frame`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty datagram")]
    Empty,

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("datagram of {len} bytes filled the receive buffer and could not be decoded")]
    Truncated { len: usize },

    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decodes one datagram into a [`Frame`].
///
/// `buffer_size` is the size of the receive buffer the bytes were read into. A payload that
/// filled it completely and still fails to parse was most likely cut short by the transport,
/// which is reported as [`DecodeError::Truncated`] rather than a generic parse failure.
pub fn decode(buf: &[u8], buffer_size: usize) -> Result<Frame, DecodeError> {
    match buf.iter().find(|b| !b.is_ascii_whitespace()) {
        None => return Err(DecodeError::Empty),
        Some(b'{') => {}
        Some(_) => return Err(DecodeError::NotAnObject),
    }

    match serde_json::from_slice::<Frame>(buf) {
        Ok(frame) => Ok(frame),
        Err(_) if buf.len() >= buffer_size => Err(DecodeError::Truncated { len: buf.len() }),
        Err(e) => Err(DecodeError::Malformed(e)),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_frame() {
        let payload = br#"{"time":"2024-03-01T12:00:00.123Z","type":"audit","entry":{"k":"v","n":3},"message":"hello","level":"info"}"#;
        let frame = decode(payload, DEFAULT_BUFFER_SIZE).unwrap();

        assert_eq!(
            frame.time,
            Some(
                Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
                    + chrono::Duration::milliseconds(123)
            )
        );
        assert_eq!(frame.kind, "audit");
        assert_eq!(frame.entry.get("k"), Some(&json!("v")));
        assert_eq!(frame.entry.get("n"), Some(&json!(3)));
        assert_eq!(frame.message, "hello");
        assert_eq!(frame.level, "info");
    }

    #[test]
    fn test_decode_missing_fields_default_to_empty() {
        let frame = decode(br#"{"message":"only a message"}"#, DEFAULT_BUFFER_SIZE).unwrap();

        assert_eq!(frame.time, None);
        assert_eq!(frame.kind, "");
        assert!(frame.entry.is_empty());
        assert_eq!(frame.message, "only a message");
        assert_eq!(frame.level, "");
    }

    #[test]
    fn test_decode_null_fields_default_to_empty() {
        let frame = decode(
            br#"{"time":null,"type":null,"entry":null,"message":null,"level":"warn"}"#,
            DEFAULT_BUFFER_SIZE,
        )
        .unwrap();

        assert_eq!(
            frame,
            Frame {
                level: "warn".to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let frame = decode(
            br#"{"type":"web","trace":{"id":1},"extra":true}"#,
            DEFAULT_BUFFER_SIZE,
        )
        .unwrap();
        assert_eq!(frame.kind, "web");
    }

    #[test]
    fn test_decode_empty_datagram() {
        assert!(matches!(
            decode(b"", DEFAULT_BUFFER_SIZE),
            Err(DecodeError::Empty)
        ));
        assert!(matches!(
            decode(b" \n\t", DEFAULT_BUFFER_SIZE),
            Err(DecodeError::Empty)
        ));
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        for payload in [
            &b"[]"[..],
            b"[1,2,3]",
            b"\"a string\"",
            b"42",
            b"null",
            &[0xff, 0xfe, 0x7b],
        ] {
            assert!(
                matches!(
                    decode(payload, DEFAULT_BUFFER_SIZE),
                    Err(DecodeError::NotAnObject)
                ),
                "payload {:?} should be rejected",
                String::from_utf8_lossy(payload)
            );
        }
    }

    #[test]
    fn test_decode_rejects_malformed_objects() {
        for payload in [
            &b"{not json"[..],
            br#"{"entry":"not an object"}"#,
            br#"{"time":"yesterday"}"#,
            br#"{"message":7}"#,
            br#"{"message":"ok"} trailing"#,
            &[b'{', 0xff, 0xfe, b'}'],
        ] {
            assert!(
                matches!(
                    decode(payload, DEFAULT_BUFFER_SIZE),
                    Err(DecodeError::Malformed(_))
                ),
                "payload {:?} should be malformed",
                String::from_utf8_lossy(payload)
            );
        }
    }

    #[test]
    fn test_decode_truncated_payload() {
        let frame = Frame {
            message: "x".repeat(64),
            ..Default::default()
        };
        let encoded = serde_json::to_vec(&frame).unwrap();
        let cut = &encoded[..32];

        match decode(cut, 32) {
            Err(DecodeError::Truncated { len }) => assert_eq!(len, 32),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_payload_exactly_filling_buffer() {
        let encoded = br#"{"message":"fits"}"#;
        let frame = decode(encoded, encoded.len()).unwrap();
        assert_eq!(frame.message, "fits");
    }

    #[test]
    fn test_serialized_frame_decodes_back() {
        let frame = Frame {
            time: Some(Utc.with_ymd_and_hms(2023, 11, 5, 8, 30, 0).unwrap()),
            kind: "audit".to_string(),
            entry: json!({"nested": {"a": [1, 2]}})
                .as_object()
                .cloned()
                .unwrap(),
            message: "hello".to_string(),
            level: "error".to_string(),
        };
        let encoded = serde_json::to_vec(&frame).unwrap();
        assert_eq!(decode(&encoded, DEFAULT_BUFFER_SIZE).unwrap(), frame);
    }

    proptest! {
        #[test]
        fn test_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let _ = decode(&bytes, DEFAULT_BUFFER_SIZE);
        }

        #[test]
        fn test_decode_rejects_non_object_text(text in "[^{]*") {
            prop_assert!(decode(text.as_bytes(), DEFAULT_BUFFER_SIZE).is_err());
        }
    }
}
