use crate::cancel::CancelSignal;
use crate::pipeline::IngestionPipeline;
use crate::types::{AggregatorError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Drives polling rounds on a fixed period until cancelled.
pub struct Scheduler {
    feeds: Arc<[String]>,
    period: Duration,
    pipeline: Arc<IngestionPipeline>,
}

impl Scheduler {
    pub fn new(
        feeds: Vec<String>,
        period: Duration,
        pipeline: Arc<IngestionPipeline>,
    ) -> Result<Self> {
        if period.is_zero() {
            return Err(AggregatorError::Configuration(
                "polling period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            feeds: feeds.into(),
            period,
            pipeline,
        })
    }

    /// Run one round now and another on every tick of the period.
    ///
    /// Rounds are spawned rather than awaited, so a slow round never pushes
    /// back the next tick. With no feeds configured this only waits for
    /// `cancel`. Returns after cancellation once every dispatched round has
    /// wound down.
    pub async fn run(self, cancel: CancelSignal) {
        if self.feeds.is_empty() {
            info!("No feeds configured, aggregator will not run");
            cancel.cancelled().await;
            return;
        }

        info!(
            "Starting aggregator for {} feeds every {:?}",
            self.feeds.len(),
            self.period
        );

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
        let mut rounds = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let pipeline = self.pipeline.clone();
                    let feeds = self.feeds.clone();
                    let cancel = cancel.clone();
                    rounds.spawn(async move { pipeline.run_once(&feeds, &cancel).await });
                }
                Some(result) = rounds.join_next(), if !rounds.is_empty() => {
                    if let Err(e) = result {
                        error!("Polling round failed: {}", e);
                    }
                }
            }
        }

        while let Some(result) = rounds.join_next().await {
            if let Err(e) = result {
                error!("Polling round failed: {}", e);
            }
        }
        info!("Aggregator stopped");
    }
}
