// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log line formatter for the agent.
//!
//! Every line is prefixed so relay diagnostics on stderr are easy to tell apart from the
//! events printed on stdout:
//!
//! ```text
//! UDPBEAT | INFO | udpbeat::relay | udpbeat: starting to listen on 127.0.0.1:5000
//! UDPBEAT | WARN | udpbeat::relay | Failed to decode frame of 18 bytes: malformed frame: ...
//! UDPBEAT | DEBUG | udpbeat::relay | run{beat=trace}: Relay stop requested
//! ```
//!
//! The target names the module that logged, so relay diagnostics can be told apart from the
//! agent's own lines.

use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;

pub const LOG_PREFIX: &str = "UDPBEAT";

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(
            &mut writer,
            "{} | {} | {} | ",
            LOG_PREFIX,
            metadata.level(),
            metadata.target()
        )?;

        // Active spans, root first, with the fields the fmt layer recorded for them
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::util::SubscriberInitExt;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_lines_carry_prefix_level_target_and_spans() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt::Subscriber::builder()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(capture.clone())
            .with_ansi(false)
            .event_format(Formatter)
            .finish();

        {
            let _guard = subscriber.set_default();
            tracing::info!(target: "udpbeat::relay", "starting to listen");
            let span = tracing::debug_span!("run", beat = "trace");
            let _entered = span.enter();
            tracing::warn!(target: "udpbeat_agent", bytes = 18, "dropped frame");
        }

        assert_eq!(
            capture.lines(),
            vec![
                "UDPBEAT | INFO | udpbeat::relay | starting to listen",
                "UDPBEAT | WARN | udpbeat_agent | run{beat=\"trace\"}: dropped frame bytes=18",
            ]
        );
    }
}
