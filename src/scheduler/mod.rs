//! Probe Scheduler
//!
//! Runs every probe once at start, then once per tick of a fixed-period
//! timer, until cancelled. An iteration always finishes before the next
//! tick is honored.

use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::probe::Probe;

/// Owns the probe set and drives its execution
pub struct ProbeScheduler {
    probes: Vec<Box<dyn Probe>>,
    period: Duration,
    max_concurrent: usize,
}

impl ProbeScheduler {
    /// Create a sequential scheduler
    pub fn new(probes: Vec<Box<dyn Probe>>, period: Duration) -> Self {
        Self {
            probes,
            period,
            max_concurrent: 1,
        }
    }

    /// Run up to `limit` probes of one iteration at a time
    pub fn with_max_concurrent(mut self, limit: usize) -> Self {
        self.max_concurrent = limit.max(1);
        self
    }

    /// Run until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            probes = self.probes.len(),
            "probe scheduler started, interval: {:?}", self.period
        );

        let mut iteration: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                // the first tick completes immediately
                _ = ticker.tick() => {}
            }

            iteration += 1;
            debug!(iteration, "running checks");
            self.run_once(&cancel).await;
        }

        info!("shutting down check loop");
    }

    /// Execute every probe once. Registration order is kept when sequential.
    pub async fn run_once(&self, cancel: &CancellationToken) {
        if self.max_concurrent <= 1 {
            for probe in &self.probes {
                if cancel.is_cancelled() {
                    return;
                }
                probe.execute(cancel).await;
            }
            return;
        }

        stream::iter(&self.probes)
            .for_each_concurrent(self.max_concurrent, |probe| async move {
                if !cancel.is_cancelled() {
                    probe.execute(cancel).await;
                }
            })
            .await;
    }

    /// Spawn the scheduler as a background task
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
