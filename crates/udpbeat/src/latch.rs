// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One-shot boolean latch.
//!
//! A [`Latch`] starts unset and can be set exactly once. Setting it again is a no-op, from any
//! thread and any number of times, and every task waiting on it is released when the single
//! transition happens.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct Latch {
    set: AtomicBool,
    released: CancellationToken,
}

impl Latch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the latch. Returns `true` only for the call that performed the transition.
    pub fn signal(&self) -> bool {
        if self
            .set
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.released.cancel();
            true
        } else {
            false
        }
    }

    /// Point-in-time read, never blocks.
    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    /// Resolves once the latch is set, immediately if it already is.
    pub async fn wait(&self) {
        self.released.cancelled().await;
    }
}
