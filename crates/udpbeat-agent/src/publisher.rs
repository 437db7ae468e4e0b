// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};
use std::sync::Mutex;
use udpbeat::{Event, PublishError, Publisher};

/// Publisher that writes each event as one JSON line.
pub struct JsonLinesPublisher<W> {
    out: Mutex<W>,
}

impl JsonLinesPublisher<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonLinesPublisher<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> Publisher for JsonLinesPublisher<W> {
    fn publish(&self, event: Event) -> Result<(), PublishError> {
        let line =
            serde_json::to_string(&event).map_err(|e| PublishError::Rejected(e.to_string()))?;

        let mut out = self.out.lock().map_err(|_| PublishError::Closed)?;
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|e| match e.kind() {
                io::ErrorKind::BrokenPipe => PublishError::Closed,
                _ => PublishError::Rejected(e.to_string()),
            })
    }
}
