use crate::cancel::CancelSignal;
use crate::types::{FeedEntry, NewPost, Post, Result};
use async_trait::async_trait;

/// Retrieves one feed and returns all of its entries, or an error.
#[async_trait]
pub trait FetchFeed: Send + Sync {
    /// A single attempt; retrying is the caller's business. Must give up
    /// promptly once `cancel` fires.
    async fn fetch(&self, url: &str, cancel: &CancelSignal) -> Result<Vec<FeedEntry>>;
}

/// Persistence boundary for posts, keyed by link.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert or update every post with a non-empty link, atomically.
    /// Re-upserting a link keeps its original `id` and `created_at`.
    async fn upsert_batch(&self, posts: &[NewPost]) -> Result<()>;

    /// Up to `limit` posts, newest `published_at` first. `limit` must be positive.
    async fn latest(&self, limit: i64) -> Result<Vec<Post>>;
}
