// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! UDP relay that receives log frames and forwards them to the host's publisher.
//!
//! The relay moves through three states:
//!
//! ```text
//! Idle --(socket bound)--> Listening --(stop / fatal receive error)--> Stopped
//! ```
//!
//! While listening it receives one datagram at a time, decodes it into a [`Frame`], maps it
//! to an [`Event`](crate::event::Event) and publishes it. A datagram that does not decode, or
//! an event the publisher rejects, is logged and counted and the loop carries on. Only a
//! non-transient socket error ends the loop with an error.
//!
//! Stopping is cooperative. [`Relay::signal_stop`] sets a one-shot latch that the loop races
//! against the receive, so `spin` returns promptly even when no traffic arrives. A datagram
//! that was already received when stop is signaled is still published.
//!
//! A `spin` that fails to start (no publisher, bind error) leaves the relay `Stopped` and can
//! be retried.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use crate::beater::{Beater, HostContext};
use crate::clock::{Clock, SystemClock};
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::event::{to_event, Publisher};
use crate::frame::{self, Frame};
use crate::latch::Latch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Listening,
    Stopped,
}

/// Snapshot of the relay counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Datagrams read from the socket.
    pub received: u64,
    /// Events accepted by the publisher.
    pub published: u64,
    /// Datagrams that did not decode into a frame.
    pub decode_failures: u64,
    /// Events the publisher rejected.
    pub publish_failures: u64,
    /// Receives that timed out or were interrupted and retried.
    pub transient_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    published: AtomicU64,
    decode_failures: AtomicU64,
    publish_failures: AtomicU64,
    transient_errors: AtomicU64,
}

impl Counters {
    fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RelayStats {
        RelayStats {
            received: self.received.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            transient_errors: self.transient_errors.load(Ordering::Relaxed),
        }
    }
}

// Source of datagrams for the receive loop.
enum BufferReader {
    UdpSocket(UdpSocket),

    /// Replays a fixed sequence of receive results, then waits forever.
    #[cfg(test)]
    Scripted(std::collections::VecDeque<io::Result<Vec<u8>>>),
}

impl BufferReader {
    /// Reads one datagram into `buf`, returning its length. Payloads longer than `buf` are
    /// truncated, like the kernel does for UDP.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BufferReader::UdpSocket(socket) => {
                let (len, src) = socket.recv_from(buf).await?;
                trace!("Received {} bytes from {}", len, src);
                Ok(len)
            }
            #[cfg(test)]
            BufferReader::Scripted(script) => match script.pop_front() {
                Some(Ok(payload)) => {
                    let len = payload.len().min(buf.len());
                    buf[..len].copy_from_slice(&payload[..len]);
                    Ok(len)
                }
                Some(Err(e)) => Err(e),
                None => std::future::pending().await,
            },
        }
    }
}

/// Clears the running flag when `spin` returns, whichever way it exits.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Receive errors after which the socket is still usable.
fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Relays JSON log frames received over UDP to a [`Publisher`].
pub struct Relay {
    config: RelayConfig,
    clock: Arc<dyn Clock>,
    publisher: OnceLock<Arc<dyn Publisher>>,
    setup_done: Latch,
    stop_requested: Latch,
    running: AtomicBool,
    state: watch::Sender<RelayState>,
    local_addr: watch::Sender<Option<SocketAddr>>,
    counters: Counters,
}

impl Relay {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            publisher: OnceLock::new(),
            setup_done: Latch::new(),
            stop_requested: Latch::new(),
            running: AtomicBool::new(false),
            state: watch::channel(RelayState::Idle).0,
            local_addr: watch::channel(None).0,
            counters: Counters::default(),
        }
    }

    /// Replaces the time source used to stamp frames that carry no timestamp.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn state(&self) -> RelayState {
        *self.state.borrow()
    }

    pub fn stats(&self) -> RelayStats {
        self.counters.snapshot()
    }

    /// Address the socket of the current or latest run is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.borrow()
    }

    /// Marks setup as complete. Only the first call has an effect.
    pub fn signal_setup_done(&self) {
        if self.setup_done.signal() {
            debug!("Relay setup complete");
        }
    }

    pub fn is_setup_done(&self) -> bool {
        self.setup_done.is_set()
    }

    /// Resolves once setup has completed.
    pub async fn wait_setup(&self) {
        self.setup_done.wait().await;
    }

    /// Asks the receive loop to exit. Safe to call any number of times, from any thread,
    /// before or while the relay runs.
    pub fn signal_stop(&self) {
        if self.stop_requested.signal() {
            debug!("Relay stop requested");
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.is_set()
    }

    /// Resolves once the relay leaves `Idle` or stop has been requested.
    ///
    /// That covers a successful bind as well as a `spin` that gave up, so callers check
    /// [`Relay::state`] or [`Relay::local_addr`] afterwards to tell the two apart.
    pub async fn wait_listening(&self) {
        let mut state = self.state.subscribe();
        loop {
            if *state.borrow_and_update() != RelayState::Idle {
                return;
            }
            tokio::select! {
                changed = state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                () = self.stop_requested.wait() => return,
            }
        }
    }

    /// Binds the socket and relays frames until stopped.
    ///
    /// Returns `Ok(())` after a stop request, including one made before this call, and an
    /// error if the socket cannot be bound or fails with a non-transient error.
    pub async fn spin(&self) -> Result<(), RelayError> {
        if self.is_stop_requested() {
            debug!("Relay stopped before it started listening");
            self.set_state(RelayState::Stopped);
            return Ok(());
        }

        if self.running.swap(true, Ordering::AcqRel) {
            return Err(RelayError::AlreadyRunning);
        }
        let _running = RunGuard(&self.running);

        let Some(publisher) = self.publisher.get().cloned() else {
            error!("Relay was run before setup");
            self.set_state(RelayState::Stopped);
            return Err(RelayError::NotSetUp);
        };

        self.set_state(RelayState::Idle);
        self.local_addr.send_replace(None);

        let addr = self.config.bind_addr();
        let socket = match UdpSocket::bind(&addr).await {
            Ok(socket) => socket,
            Err(source) => {
                error!("Failed to bind UDP socket on {}: {}", addr, source);
                self.set_state(RelayState::Stopped);
                return Err(RelayError::Bind { addr, source });
            }
        };

        match socket.local_addr() {
            Ok(local) => {
                self.local_addr.send_replace(Some(local));
                info!("udpbeat: starting to listen on {}", local);
            }
            Err(e) => {
                warn!("udpbeat: listening on {}, local address unavailable: {}", addr, e);
            }
        }

        self.listen(BufferReader::UdpSocket(socket), publisher.as_ref())
            .await
    }

    async fn listen(
        &self,
        mut reader: BufferReader,
        publisher: &dyn Publisher,
    ) -> Result<(), RelayError> {
        self.set_state(RelayState::Listening);

        let mut buf = vec![0; self.config.buffer_size];
        let result = loop {
            let received = tokio::select! {
                biased;
                received = self.receive(&mut reader, &mut buf) => received,
                () = self.stop_requested.wait() => break Ok(()),
            };

            match received {
                Ok(len) => self.relay_datagram(&buf[..len], publisher),
                Err(e) if is_transient(&e) => {
                    Counters::incr(&self.counters.transient_errors);
                    trace!("Transient receive error, retrying: {}", e);
                }
                Err(e) => {
                    error!("Failed to receive datagram: {}", e);
                    break Err(RelayError::Receive(e));
                }
            }

            if self.is_stop_requested() {
                break Ok(());
            }
        };

        self.set_state(RelayState::Stopped);
        debug!("Relay stopped: {:?}", self.stats());
        result
    }

    async fn receive(&self, reader: &mut BufferReader, buf: &mut [u8]) -> io::Result<usize> {
        match self.config.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, reader.read(buf))
                .await
                .unwrap_or_else(|_| Err(io::Error::from(io::ErrorKind::TimedOut))),
            None => reader.read(buf).await,
        }
    }

    fn relay_datagram(&self, payload: &[u8], publisher: &dyn Publisher) {
        Counters::incr(&self.counters.received);

        match frame::decode(payload, self.config.buffer_size) {
            Ok(frame) => self.publish(frame, publisher),
            Err(e) => {
                Counters::incr(&self.counters.decode_failures);
                warn!("Failed to decode frame of {} bytes: {}", payload.len(), e);
            }
        }
    }

    fn publish(&self, frame: Frame, publisher: &dyn Publisher) {
        let event = to_event(frame, self.clock.as_ref());
        match publisher.publish(event) {
            Ok(()) => Counters::incr(&self.counters.published),
            Err(e) => {
                Counters::incr(&self.counters.publish_failures);
                warn!("Failed to publish event: {}", e);
            }
        }
    }

    fn set_state(&self, state: RelayState) {
        self.state.send_replace(state);
    }
}

#[async_trait]
impl Beater for Relay {
    fn configure(&self, ctx: &HostContext) -> Result<(), RelayError> {
        debug!("Configuring {} {}", ctx.name, ctx.version);
        Ok(())
    }

    fn setup(&self, ctx: &HostContext) -> Result<(), RelayError> {
        if self.publisher.set(Arc::clone(&ctx.publisher)).is_err() {
            debug!("Relay already set up, keeping the first publisher");
        }
        self.signal_setup_done();
        Ok(())
    }

    async fn run(&self, _ctx: &HostContext) -> Result<(), RelayError> {
        self.spin().await
    }

    fn cleanup(&self, _ctx: &HostContext) -> Result<(), RelayError> {
        Ok(())
    }

    fn stop(&self) {
        self.signal_stop();
    }
}
