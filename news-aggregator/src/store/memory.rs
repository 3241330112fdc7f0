use crate::store::{check_limit, storable};
use crate::traits::PostStore;
use crate::types::{NewPost, Post, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// In-process store with the same upsert and query semantics as PostgreSQL.
/// Each call holds the lock for its whole batch.
#[derive(Debug, Default)]
pub struct MemoryPostStore {
    posts: Mutex<HashMap<String, Post>>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, link: &str) -> Option<Post> {
        self.lock().get(link).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Post>> {
        self.posts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn upsert_batch(&self, posts: &[NewPost]) -> Result<()> {
        let posts = storable(posts);
        if posts.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let mut table = self.lock();
        for post in posts {
            table
                .entry(post.link.clone())
                .and_modify(|existing| {
                    existing.title = post.title.clone();
                    existing.description = post.description.clone();
                    existing.published_at = post.published_at;
                })
                .or_insert_with(|| Post {
                    id: Uuid::new_v4(),
                    title: post.title.clone(),
                    description: post.description.clone(),
                    link: post.link.clone(),
                    published_at: post.published_at,
                    created_at: now,
                });
        }
        Ok(())
    }

    async fn latest(&self, limit: i64) -> Result<Vec<Post>> {
        check_limit(limit)?;

        let mut posts: Vec<Post> = self.lock().values().cloned().collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        posts.truncate(limit as usize);
        Ok(posts)
    }
}
