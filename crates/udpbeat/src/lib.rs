// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Relay for structured log frames sent as UDP datagrams.
//!
//! Producers send one JSON [`frame::Frame`] per datagram to a local socket. The
//! [`relay::Relay`] decodes each frame, maps it to the record layout expected by the
//! downstream index ([`event::to_event`]) and hands it to the host's [`event::Publisher`].
//! The host drives the relay through the [`beater::Beater`] lifecycle.
//!
//! [`producer::UdpLayer`] is the sending side: a `tracing` layer that ships events to a relay.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod beater;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod frame;
pub mod latch;
pub mod producer;
pub mod relay;

pub use beater::{Beater, HostContext};
pub use config::RelayConfig;
pub use error::RelayError;
pub use event::{Event, PublishError, Publisher};
pub use relay::{Relay, RelayState, RelayStats};
