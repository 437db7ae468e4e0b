// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle contract between a beat and the host that drives it.
//!
//! The host owns the publishing pipeline. It calls, in order:
//!
//! ```text
//! configure(ctx) -> setup(ctx) -> run(ctx) ... -> cleanup(ctx)
//!                                    ^
//!                   stop() from any thread, any time
//! ```

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::RelayError;
use crate::event::Publisher;

/// Name the relay registers under with the host.
pub const BEAT_NAME: &str = "trace";
pub const BEAT_VERSION: &str = "0.0.1";

/// What the host hands to each lifecycle call.
#[derive(Clone)]
pub struct HostContext {
    pub name: String,
    pub version: String,
    pub publisher: Arc<dyn Publisher>,
}

impl HostContext {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            name: BEAT_NAME.to_string(),
            version: BEAT_VERSION.to_string(),
            publisher,
        }
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Beater: Send + Sync {
    /// Reads beat specific configuration from the host.
    fn configure(&self, ctx: &HostContext) -> Result<(), RelayError>;

    /// Records the host's publisher and marks the beat as set up. Repeated calls are no-ops.
    fn setup(&self, ctx: &HostContext) -> Result<(), RelayError>;

    /// Runs until [`Beater::stop`] is called or a fatal error occurs.
    async fn run(&self, ctx: &HostContext) -> Result<(), RelayError>;

    /// Releases anything allocated by the beat after `run` returned.
    fn cleanup(&self, ctx: &HostContext) -> Result<(), RelayError>;

    /// Asks `run` to return. Safe to call repeatedly and from any thread.
    fn stop(&self);
}
