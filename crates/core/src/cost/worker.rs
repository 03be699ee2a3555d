//! Detached cost metering worker.
//!
//! Callers hold a cloneable [`CostMeterHandle`] and enqueue events with
//! `try_send`; a full or closed queue drops the event with a warning and never
//! blocks. A single [`CostMeterWorker`] task records events one at a time, each
//! under its own deadline. On cancellation the queue is closed and whatever is
//! already buffered is drained before the task exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::meter::CostMeter;
use super::types::CostEvent;

/// Cloneable sender side of the cost queue.
#[derive(Debug, Clone)]
pub struct CostMeterHandle {
    tx: Option<mpsc::Sender<CostEvent>>,
}

impl CostMeterHandle {
    /// A handle that discards every event, for wiring without metering.
    #[must_use]
    pub const fn detached() -> Self {
        Self { tx: None }
    }

    pub(crate) const fn from_sender(tx: mpsc::Sender<CostEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Enqueues an event without waiting. Returns whether it was queued.
    ///
    /// Events without billable usage are not queued at all.
    pub fn dispatch(&self, event: CostEvent) -> bool {
        if event.billable_usage().is_none() {
            return false;
        }
        let Some(tx) = &self.tx else {
            debug!(operation = %event.operation, "cost metering detached, event discarded");
            return false;
        };

        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(user_id = %event.user_id, operation = %event.operation, "cost queue full, dropping event");
                false
            }
            Err(TrySendError::Closed(event)) => {
                warn!(user_id = %event.user_id, operation = %event.operation, "cost queue closed, dropping event");
                false
            }
        }
    }
}

/// Consumer side of the cost queue.
pub struct CostMeterWorker {
    meter: Arc<CostMeter>,
    rx: mpsc::Receiver<CostEvent>,
    write_timeout: Duration,
    shutdown: CancellationToken,
}

impl CostMeterWorker {
    /// Creates a worker and the handle that feeds it.
    ///
    /// A zero `capacity` is raised to one.
    #[must_use]
    pub fn new(
        meter: Arc<CostMeter>,
        capacity: usize,
        write_timeout: Duration,
        shutdown: CancellationToken,
    ) -> (Self, CostMeterHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = Self {
            meter,
            rx,
            write_timeout,
            shutdown,
        };
        (worker, CostMeterHandle::from_sender(tx))
    }

    /// Runs the worker on its own task.
    pub fn spawn(self) -> JoinHandle<usize> {
        tokio::spawn(self.run())
    }

    /// Processes events until cancelled or every handle is dropped.
    ///
    /// Returns the number of events processed, including the ones drained at shutdown.
    pub async fn run(mut self) -> usize {
        info!(write_timeout_ms = self.write_timeout.as_millis(), "cost meter worker started");
        let mut processed = 0;

        loop {
            let event = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                event = self.rx.recv() => event,
            };
            let Some(event) = event else {
                info!(processed, "all cost handles dropped, worker exiting");
                return processed;
            };
            self.process(event).await;
            processed += 1;
        }

        self.rx.close();
        let mut drained = 0;
        while let Some(event) = self.rx.recv().await {
            self.process(event).await;
            drained += 1;
        }
        info!(processed = processed + drained, drained, "cost meter worker stopped");
        processed + drained
    }

    async fn process(&self, event: CostEvent) {
        let user_id = event.user_id.clone();
        let operation = event.operation;
        if tokio::time::timeout(self.write_timeout, self.meter.record(event))
            .await
            .is_err()
        {
            warn!(user_id = %user_id, operation = %operation, "cost log write timed out");
        }
    }
}
