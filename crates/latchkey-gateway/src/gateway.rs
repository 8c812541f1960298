//! Gateway run loop.
//!
//! Ties the reader and the decision engine together and drives the bridge
//! lifecycle. The loop dequeues with a bounded wait so that it notices a
//! dead reader or a shutdown request even when the door is quiet.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use latchkey_core::constants::{DEBOUNCE_WINDOW_MS, EXIT_CODE_TERMINATED, QUEUE_POLL_INTERVAL_MS};
use latchkey_directory::MembershipDirectory;
use latchkey_hardware::{FrameSink, FrameSource};
use latchkey_telemetry::TelemetrySink;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{Instrument, error, info, warn};

use crate::bridge::{ReaderExit, spawn_reader};
use crate::debounce::Debouncer;
use crate::engine::AccessEngine;
use crate::lifecycle::{BridgeState, Lifecycle};

/// How long to wait for the reader thread to notice a stop request.
const READER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Why the gateway stopped.
#[derive(Debug)]
pub enum StopReason {
    /// The serial link failed or was closed.
    LinkLost(String),

    /// The host asked the process to terminate.
    ShutdownRequested,
}

/// Final state of a gateway run.
#[derive(Debug)]
pub struct Termination {
    pub reason: StopReason,
    pub exit_code: i32,
    pub lifecycle: Lifecycle,
}

/// Gateway for one door.
pub struct Gateway<S, D, T, K> {
    source: S,
    engine: AccessEngine<D, T, K>,
    debounce_window: Duration,
    poll_interval: Duration,
}

impl<S, D, T, K> Gateway<S, D, T, K>
where
    S: FrameSource,
    D: MembershipDirectory,
    T: TelemetrySink,
    K: FrameSink,
{
    pub fn new(source: S, engine: AccessEngine<D, T, K>) -> Self {
        Self {
            source,
            engine,
            debounce_window: Duration::from_millis(DEBOUNCE_WINDOW_MS),
            poll_interval: Duration::from_millis(QUEUE_POLL_INTERVAL_MS),
        }
    }

    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until the link is lost or `shutdown` resolves.
    ///
    /// Always ends in `Terminated` with a non-zero exit code so a supervisor
    /// restarts the process with a fresh serial handle.
    pub async fn run<F>(self, shutdown: F) -> Termination
    where
        F: Future<Output = ()>,
    {
        let span = self.engine.context().span();
        self.run_inner(shutdown).instrument(span).await
    }

    async fn run_inner<F>(self, shutdown: F) -> Termination
    where
        F: Future<Output = ()>,
    {
        let Self {
            source,
            mut engine,
            debounce_window,
            poll_interval,
        } = self;

        let mut lifecycle = Lifecycle::new();
        advance(&mut lifecycle, BridgeState::Running);

        let (queue_tx, mut queue_rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let mut reader = spawn_reader(source, queue_tx, Debouncer::new(debounce_window), Arc::clone(&stop));

        let mut shutdown = std::pin::pin!(shutdown);

        let reason = loop {
            tokio::select! {
                biased;

                () = &mut shutdown => break StopReason::ShutdownRequested,

                next = timeout(poll_interval, queue_rx.recv()) => match next {
                    Ok(Some(message)) => {
                        engine.process(message).await;
                    }
                    // Sender dropped: the reader has exited
                    Ok(None) => break StopReason::LinkLost("reader ended".to_string()),
                    Err(_) if reader.is_finished() => {
                        break StopReason::LinkLost("reader ended".to_string());
                    }
                    Err(_) => {}
                },
            }
        };

        advance(&mut lifecycle, BridgeState::Stopping);
        error!(reason = ?reason, "Stopping serial reader");

        stop.store(true, Ordering::Release);
        let reason = match timeout(READER_JOIN_TIMEOUT, &mut reader).await {
            Ok(Ok(ReaderExit::Failed(e))) => StopReason::LinkLost(e.to_string()),
            Ok(Ok(ReaderExit::Closed)) => StopReason::LinkLost("link closed".to_string()),
            Ok(Ok(ReaderExit::Stopped)) => reason,
            Ok(Err(e)) => StopReason::LinkLost(format!("reader panicked: {e}")),
            Err(_) => {
                warn!("Serial reader did not stop in time");
                reason
            }
        };

        engine.shutdown().await;
        advance(&mut lifecycle, BridgeState::Terminated);
        info!(reason = ?reason, exit_code = EXIT_CODE_TERMINATED, "Gateway terminated");

        Termination {
            reason,
            exit_code: EXIT_CODE_TERMINATED,
            lifecycle,
        }
    }
}

fn advance(lifecycle: &mut Lifecycle, state: BridgeState) {
    if let Err(e) = lifecycle.transition_to(state) {
        error!(error = %e, "Lifecycle transition rejected");
    }
}
