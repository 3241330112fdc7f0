use crate::cancel::CancelSignal;
use crate::traits::{FetchFeed, PostStore};
use crate::types::{AggregatorError, NewPost, RoundSummary};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Posts per store call.
pub const BATCH_SIZE: usize = 25;

const CHANNEL_CAPACITY: usize = 16;

enum RoundMessage {
    Post(NewPost),
    Failure { url: String, error: AggregatorError },
}

/// Runs polling rounds: fan out one fetch task per feed, fan the results in to
/// a single collector, and hand the collector's batches to the store.
pub struct IngestionPipeline {
    fetcher: Arc<dyn FetchFeed>,
    store: Arc<dyn PostStore>,
}

impl IngestionPipeline {
    pub fn new(fetcher: Arc<dyn FetchFeed>, store: Arc<dyn PostStore>) -> Self {
        Self { fetcher, store }
    }

    /// Poll every feed once and persist what comes back.
    ///
    /// Per-feed and per-batch failures are logged and counted, never returned.
    /// If `cancel` fires mid-round the collector stops without flushing its
    /// partial buffer; the next round re-fetches the same entries anyway.
    pub async fn run_once(&self, feeds: &[String], cancel: &CancelSignal) -> RoundSummary {
        info!("Starting round for {} feeds", feeds.len());

        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);

        let fetch_tasks: Vec<_> = feeds
            .iter()
            .map(|url| {
                tokio::spawn(fetch_task(
                    self.fetcher.clone(),
                    url.clone(),
                    sender.clone(),
                    cancel.clone(),
                ))
            })
            .collect();
        // The collector sees the end of the round once every task drops its sender.
        drop(sender);

        let collector = tokio::spawn(collect(receiver, self.store.clone(), cancel.clone()));

        let mut summary = match collector.await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Collector task failed: {}", e);
                RoundSummary {
                    cancelled: cancel.is_cancelled(),
                    ..Default::default()
                }
            }
        };

        for result in join_all(fetch_tasks).await {
            if let Err(e) = result {
                error!("Fetch task failed: {}", e);
            }
        }

        summary.feeds = feeds.len();
        info!(
            "Round finished: {} feeds, {} failed, {} posts, {} batches flushed, \
             {} flushes failed{}",
            summary.feeds,
            summary.feed_failures,
            summary.posts_received,
            summary.batches_flushed,
            summary.flush_failures,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
        summary
    }
}

async fn fetch_task(
    fetcher: Arc<dyn FetchFeed>,
    url: String,
    sender: mpsc::Sender<RoundMessage>,
    cancel: CancelSignal,
) {
    let entries = match fetcher.fetch(&url, &cancel).await {
        Ok(entries) => entries,
        Err(AggregatorError::Cancelled) => return,
        Err(error) => {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = sender.send(RoundMessage::Failure { url, error }) => {}
            }
            return;
        }
    };

    debug!("Forwarding {} entries from {}", entries.len(), url);
    for entry in entries {
        let delivered = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            result = sender.send(RoundMessage::Post(entry.into())) => result.is_ok(),
        };
        if !delivered {
            return;
        }
    }
}

async fn collect(
    mut receiver: mpsc::Receiver<RoundMessage>,
    store: Arc<dyn PostStore>,
    cancel: CancelSignal,
) -> RoundSummary {
    let mut summary = RoundSummary::default();
    let mut batch: Vec<NewPost> = Vec::with_capacity(BATCH_SIZE);

    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if !batch.is_empty() {
                    warn!("Round cancelled, dropping {} unsaved posts", batch.len());
                }
                summary.cancelled = true;
                return summary;
            }
            message = receiver.recv() => message,
        };

        match message {
            Some(RoundMessage::Post(post)) => {
                summary.posts_received += 1;
                batch.push(post);
                if batch.len() >= BATCH_SIZE {
                    flush(store.as_ref(), &mut batch, &mut summary).await;
                }
            }
            Some(RoundMessage::Failure { url, error }) => {
                summary.feed_failures += 1;
                warn!("Failed to fetch feed {}: {}", url, error);
            }
            None => {
                flush(store.as_ref(), &mut batch, &mut summary).await;
                return summary;
            }
        }
    }
}

async fn flush(store: &dyn PostStore, batch: &mut Vec<NewPost>, summary: &mut RoundSummary) {
    if batch.is_empty() {
        return;
    }

    match store.upsert_batch(batch).await {
        Ok(()) => {
            summary.batches_flushed += 1;
            debug!("Saved batch of {} posts", batch.len());
        }
        Err(e) => {
            summary.flush_failures += 1;
            error!("Failed to save batch of {} posts: {}", batch.len(), e);
        }
    }
    batch.clear();
}
