// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mapping from decoded frames to the records handed to the publishing pipeline.
//!
//! The record layout matches the index template used downstream:
//!
//! ```text
//! {
//!   "@timestamp": "2024-03-01T12:00:00.000Z",
//!   "type": "audit",
//!   "entry": { ...frame entry, verbatim... },
//!   "message": { "message": "hello", "level": "info" }
//! }
//! ```

use chrono::SecondsFormat;
use serde_json::{Map, Value};

use crate::clock::Clock;
use crate::frame::Frame;

/// Timestamp of the event.
pub const ELK_TIMESTAMP: &str = "@timestamp";
/// Event source classification.
pub const ELK_TYPE: &str = "type";
/// Structured payload attached by the producer.
pub const ELK_ENTRY: &str = "entry";
/// Object holding the human readable message and its level. Also the key of the message text
/// inside that object.
pub const ELK_MESSAGE: &str = "message";
/// Severity key inside the message object.
pub const ELK_LEVEL: &str = "level";

/// A record ready to be published.
pub type Event = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publisher is closed")]
    Closed,

    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Destination for relayed events, owned by the host.
///
/// `publish` is called from the relay loop, one event at a time and in receive order.
/// Implementations should hand the event off quickly; a failure is logged by the relay and
/// does not stop it.
pub trait Publisher: Send + Sync {
    fn publish(&self, event: Event) -> Result<(), PublishError>;
}

/// Builds the downstream record for `frame`. Frames without a timestamp are stamped with
/// `clock`.
pub fn to_event(frame: Frame, clock: &dyn Clock) -> Event {
    let timestamp = frame.time.unwrap_or_else(|| clock.now());

    let mut message = Map::with_capacity(2);
    message.insert(ELK_MESSAGE.to_string(), Value::String(frame.message));
    message.insert(ELK_LEVEL.to_string(), Value::String(frame.level));

    let mut event = Map::with_capacity(4);
    event.insert(
        ELK_TIMESTAMP.to_string(),
        Value::String(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    event.insert(ELK_TYPE.to_string(), Value::String(frame.kind));
    event.insert(ELK_ENTRY.to_string(), Value::Object(frame.entry));
    event.insert(ELK_MESSAGE.to_string(), Value::Object(message));
    event
}
