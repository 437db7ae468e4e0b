// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::{TimeZone, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use udpbeat::clock::FixedClock;
use udpbeat::{Relay, RelayConfig, RelayError};

pub const FIXED_TIME: &str = "2022-02-22T22:22:22.000Z";

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2022, 2, 22, 22, 22, 22).unwrap(),
    ))
}

/// Relay bound to an ephemeral loopback port.
pub fn ephemeral_relay() -> Relay {
    Relay::new(RelayConfig {
        port: 0,
        ..Default::default()
    })
    .with_clock(fixed_clock())
}

/// Spawns `relay.spin()` and waits until the socket is bound.
pub async fn start_relay(
    relay: &Arc<Relay>,
) -> (JoinHandle<Result<(), RelayError>>, SocketAddr) {
    let spinner = {
        let relay = Arc::clone(relay);
        tokio::spawn(async move { relay.spin().await })
    };

    tokio::time::timeout(Duration::from_secs(2), relay.wait_listening())
        .await
        .expect("relay did not start listening");
    let addr = relay.local_addr().expect("listening relay has an address");

    (spinner, addr)
}

pub async fn send_datagrams(addr: SocketAddr, payloads: &[Vec<u8>]) {
    let socket = UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("unable to bind UDP socket");
    for payload in payloads {
        socket
            .send_to(payload, addr)
            .await
            .expect("unable to send datagram");
    }
}

/// Polls `condition` until it holds or `timeout` elapses.
pub async fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    tokio::time::timeout(timeout, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}
