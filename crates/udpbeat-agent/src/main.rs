// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod logger;
mod publisher;

use std::{process, sync::Arc};
use tracing::{debug, error, info, Instrument};
use tracing_subscriber::EnvFilter;

use udpbeat::beater::{BEAT_NAME, BEAT_VERSION};
use udpbeat::{Beater, HostContext, Relay, RelayConfig, RelayError};

use crate::publisher::JsonLinesPublisher;

const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main]
pub async fn main() {
    // The filter level comes from the validated config; a config error is logged once the
    // subscriber is installed.
    let config = RelayConfig::from_env();

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(log_filter(config.as_ref().ok()))
        .with_writer(std::io::stderr)
        .event_format(logger::Formatter)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        process::exit(1);
    }

    debug!("Logging subsystem enabled");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Error reading udpbeat configuration: {e}");
            process::exit(1);
        }
    };

    let relay = Arc::new(Relay::new(config));
    info!(
        "starting udpbeat, listening for frames on {}",
        relay.config().bind_addr()
    );

    let ctx = HostContext::new(Arc::new(JsonLinesPublisher::stdout()));

    if let Err(e) = run_beater(relay, &ctx).await {
        error!("err: {e}");
        process::exit(1);
    }
}

/// Filter for the configured log level, or `info` when the configuration was rejected.
fn log_filter(config: Option<&RelayConfig>) -> EnvFilter {
    config
        .and_then(|config| EnvFilter::try_new(&config.log_level).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Drives a beat through its lifecycle, stopping it on Ctrl-C.
async fn run_beater(beater: Arc<dyn Beater>, ctx: &HostContext) -> Result<(), RelayError> {
    beater.configure(ctx)?;
    beater.setup(ctx)?;

    let stopper = {
        let beater = Arc::clone(&beater);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl-C, stopping {}", BEAT_NAME),
                Err(e) => error!("Unable to listen for Ctrl-C, stopping: {e}"),
            }
            beater.stop();
        })
    };

    let span = tracing::debug_span!("run", beat = BEAT_NAME, version = BEAT_VERSION);
    let result = beater.run(ctx).instrument(span).await;
    stopper.abort();

    beater.cleanup(ctx)?;
    result
}
