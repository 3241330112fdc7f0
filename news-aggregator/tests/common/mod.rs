#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use news_aggregator::{
    AggregatorError, CancelSignal, FeedEntry, FetchFeed, NewPost, Post, PostStore, Result,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn published(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
}

pub fn entry(link: &str) -> FeedEntry {
    FeedEntry {
        title: format!("Title for {}", link),
        description: format!("Description for {}", link),
        link: link.to_string(),
        published_at: published(1),
    }
}

pub fn entries(feed: &str, count: usize) -> Vec<FeedEntry> {
    (0..count)
        .map(|i| entry(&format!("https://{}/item/{}", feed, i)))
        .collect()
}

/// Serves canned results per feed URL and counts calls.
#[derive(Default)]
pub struct StubFetcher {
    feeds: HashMap<String, std::result::Result<Vec<FeedEntry>, u16>>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: &str, entries: Vec<FeedEntry>) -> Self {
        self.feeds.insert(url.to_string(), Ok(entries));
        self
    }

    pub fn with_failing_feed(mut self, url: &str, status: u16) -> Self {
        self.feeds.insert(url.to_string(), Err(status));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchFeed for StubFetcher {
    async fn fetch(&self, url: &str, _cancel: &CancelSignal) -> Result<Vec<FeedEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.feeds.get(url) {
            Some(Ok(entries)) => Ok(entries.clone()),
            Some(Err(status)) => Err(AggregatorError::HttpStatus { status: *status }),
            None => Err(AggregatorError::HttpStatus { status: 404 }),
        }
    }
}

/// Records every batch it is handed. Optionally fails the first N calls.
#[derive(Default)]
pub struct RecordingStore {
    batches: Mutex<Vec<Vec<NewPost>>>,
    failures_left: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(count: usize) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(count),
        }
    }

    pub fn batches(&self) -> Vec<Vec<NewPost>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches().iter().map(Vec::len).collect()
    }

    pub fn links(&self) -> Vec<String> {
        self.batches()
            .into_iter()
            .flatten()
            .map(|post| post.link)
            .collect()
    }
}

#[async_trait]
impl PostStore for RecordingStore {
    async fn upsert_batch(&self, posts: &[NewPost]) -> Result<()> {
        self.batches.lock().unwrap().push(posts.to_vec());
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(AggregatorError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn latest(&self, _limit: i64) -> Result<Vec<Post>> {
        Ok(Vec::new())
    }
}

pub fn new_post(link: &str, title: &str, day: u32) -> NewPost {
    NewPost {
        title: title.to_string(),
        description: format!("About {}", title),
        link: link.to_string(),
        published_at: published(day),
    }
}

/// Store properties every backend must hold. Expects an empty store.
pub async fn check_store_contract(store: &dyn PostStore) {
    // Upsert by link keeps the row identity and takes the newest fields.
    store
        .upsert_batch(&[new_post("https://n.example/1", "First draft", 1)])
        .await
        .unwrap();
    let original = store.latest(10).await.unwrap();
    assert_eq!(original.len(), 1);

    store
        .upsert_batch(&[new_post("https://n.example/1", "Final", 2)])
        .await
        .unwrap();
    let updated = store.latest(10).await.unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].id, original[0].id);
    assert_eq!(updated[0].created_at, original[0].created_at);
    assert_eq!(updated[0].title, "Final");
    assert_eq!(updated[0].description, "About Final");
    assert_eq!(updated[0].published_at, published(2));

    // Empty batches and link-less posts are no-ops.
    store.upsert_batch(&[]).await.unwrap();
    store
        .upsert_batch(&[new_post("", "No link", 3)])
        .await
        .unwrap();
    assert_eq!(store.latest(10).await.unwrap().len(), 1);

    // Duplicates inside one batch collapse to the last occurrence.
    store
        .upsert_batch(&[
            new_post("https://n.example/2", "Old", 3),
            new_post("https://n.example/3", "Third", 4),
            new_post("https://n.example/2", "Second", 5),
            new_post("https://n.example/4", "Fourth", 6),
            new_post("https://n.example/5", "Fifth", 7),
        ])
        .await
        .unwrap();

    let newest = store.latest(3).await.unwrap();
    let titles: Vec<&str> = newest.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Fifth", "Fourth", "Second"]);
    assert_eq!(store.latest(100).await.unwrap().len(), 5);

    for limit in [0, -5] {
        assert!(matches!(
            store.latest(limit).await,
            Err(AggregatorError::InvalidArgument(_))
        ));
    }
}
