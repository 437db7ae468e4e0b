// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sends a steady trickle of log frames to a relay, for trying the agent end to end.
//!
//! Uses the same `UDPBEAT_*` variables as the agent to find the relay, and echoes what it
//! sends on stderr.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{process, time::Duration};
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use udpbeat::producer::UdpLayer;
use udpbeat::RelayConfig;

const EMIT_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
pub async fn main() {
    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error reading udpbeat configuration: {e}");
            process::exit(1);
        }
    };

    let udp = match UdpLayer::new(config.bind_addr()) {
        Ok(layer) => layer,
        Err(e) => {
            eprintln!("Unable to send frames to {}: {e}", config.bind_addr());
            process::exit(1);
        }
    };

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(udp)
        .try_init()
    {
        eprintln!("setting default subscriber failed: {e}");
        process::exit(1);
    }

    let emitter = tokio::spawn(async {
        info!("got it!");
        let mut ticker = tokio::time::interval(EMIT_INTERVAL);
        loop {
            ticker.tick().await;
            info!("something new");
            info!(component = "play", "this time");
        }
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl-C: {e}");
    }
    emitter.abort();
}
