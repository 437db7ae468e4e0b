// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Producer side of the wire format.
//!
//! [`UdpLayer`] is a `tracing_subscriber` layer that turns every event it sees into a
//! [`Frame`] and sends it as one datagram to a relay. Install it next to the usual fmt layer
//! and anything logged with `tracing` shows up in the relay's pipeline:
//!
//! ```no_run
//! use tracing_subscriber::prelude::*;
//! use udpbeat::producer::UdpLayer;
//!
//! let layer = UdpLayer::new("127.0.0.1:5000").unwrap();
//! tracing_subscriber::registry().with(layer).init();
//! tracing::info!(component = "play", "this time");
//! ```

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::clock::{Clock, SystemClock};
use crate::frame::Frame;

/// `type` stamped on frames built from `tracing` events.
pub const FRAME_TYPE: &str = "trace";

const MESSAGE_FIELD: &str = "message";

/// Sends one [`Frame`] per `tracing` event to a relay over UDP.
pub struct UdpLayer {
    socket: UdpSocket,
    clock: Arc<dyn Clock>,
    send_failures: AtomicU64,
}

impl UdpLayer {
    /// Connects an unbound local socket to the relay at `addr`.
    pub fn new(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let target = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no address to send frames to")
        })?;
        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        let socket = UdpSocket::bind(local)?;
        socket.connect(target)?;

        Ok(Self {
            socket,
            clock: Arc::new(SystemClock),
            send_failures: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Frames that could not be sent. Delivery is best effort and failures are only counted,
    /// since logging them would feed back into this layer.
    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }

    fn frame_for(&self, event: &Event<'_>) -> Frame {
        let mut visitor = FrameVisitor::default();
        event.record(&mut visitor);

        Frame {
            time: Some(self.clock.now()),
            kind: FRAME_TYPE.to_string(),
            entry: visitor.entry,
            message: visitor.message,
            level: event.metadata().level().as_str().to_ascii_lowercase(),
        }
    }
}

impl fmt::Debug for UdpLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpLayer")
            .field("peer", &self.socket.peer_addr().ok())
            .field("send_failures", &self.send_failures())
            .finish_non_exhaustive()
    }
}

impl<S: Subscriber> Layer<S> for UdpLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let sent = serde_json::to_vec(&self.frame_for(event))
            .map_err(io::Error::from)
            .and_then(|payload| self.socket.send(&payload));
        if sent.is_err() {
            self.send_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Splits event fields into the frame's message and its `entry` payload.
#[derive(Default)]
struct FrameVisitor {
    message: String,
    entry: Map<String, Value>,
}

impl FrameVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        self.entry.insert(field.name().to_string(), value);
    }
}

impl Visit for FrameVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == MESSAGE_FIELD {
            self.message = value.to_string();
        } else {
            self.insert(field, Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE_FIELD {
            self.message = format!("{value:?}");
        } else {
            self.insert(field, Value::from(format!("{value:?}")));
        }
    }
}
