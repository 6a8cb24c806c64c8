//! Fixed-cadence polling loop for the lead processor.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::repository::{CaseManagement, LeadStore, Notifier};
use super::scoring::CompletionClient;
use super::service::{CycleReport, LeadProcessor};

/// Cooperative stop flag shared between the signal handler and the polling thread.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    triggered: Mutex<bool>,
    wake: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let mut triggered = self.triggered.lock().unwrap_or_else(PoisonError::into_inner);
        *triggered = true;
        self.wake.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.triggered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for up to `timeout`. Returns `true` as soon as shutdown is triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut triggered = self.triggered.lock().unwrap_or_else(PoisonError::into_inner);
        while !*triggered {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _) = self
                .wake
                .wait_timeout(triggered, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            triggered = guard;
        }
        *triggered
    }
}

/// Runs poll cycles on the calling thread until shutdown.
pub struct PollingWorker<S: ?Sized, C: ?Sized, M: ?Sized, N: ?Sized> {
    processor: Arc<LeadProcessor<S, C, M, N>>,
    interval: Duration,
    shutdown: Arc<ShutdownSignal>,
}

impl<S, C, M, N> PollingWorker<S, C, M, N>
where
    S: LeadStore + ?Sized,
    C: CompletionClient + ?Sized,
    M: CaseManagement + ?Sized,
    N: Notifier + ?Sized,
{
    pub fn new(
        processor: Arc<LeadProcessor<S, C, M, N>>,
        interval: Duration,
        shutdown: Arc<ShutdownSignal>,
    ) -> Self {
        Self {
            processor,
            interval,
            shutdown,
        }
    }

    /// Poll until shutdown. A failed cycle is logged and the loop waits for the next tick.
    pub fn run(&self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "lead worker started");

        loop {
            self.cycle();
            if self.shutdown.wait_timeout(self.interval) {
                break;
            }
        }

        tracing::info!("lead worker stopped");
    }

    /// Run at most `cycles` poll cycles, stopping early on shutdown.
    pub fn run_cycles(&self, cycles: usize) -> Vec<CycleReport> {
        let mut reports = Vec::with_capacity(cycles);
        for cycle in 0..cycles {
            if cycle > 0 && self.shutdown.wait_timeout(self.interval) {
                break;
            }
            if let Some(report) = self.cycle() {
                reports.push(report);
            }
        }
        reports
    }

    fn cycle(&self) -> Option<CycleReport> {
        match self.processor.process_pending(&self.shutdown) {
            Ok(report) => {
                tracing::info!(
                    fetched = report.fetched(),
                    completed = report.completed(),
                    failed = report.failed(),
                    interrupted = report.interrupted,
                    "poll cycle finished"
                );
                Some(report)
            }
            Err(error) => {
                tracing::error!(error = %error, "poll cycle failed");
                None
            }
        }
    }
}
