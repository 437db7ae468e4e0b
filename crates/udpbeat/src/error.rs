// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors surfaced to the host driving the relay.
///
/// Per-datagram problems (decode or publish failures, receive timeouts) never show up here;
/// they are logged and counted by the relay loop.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to receive datagram: {0}")]
    Receive(#[source] std::io::Error),

    #[error("Relay run before setup")]
    NotSetUp,

    #[error("Relay already running")]
    AlreadyRunning,
}
