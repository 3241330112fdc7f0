use crate::store::{check_limit, storable};
use crate::traits::PostStore;
use crate::types::{NewPost, Post, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct PgPostStore {
    db: PgPool,
}

impl PgPostStore {
    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    /// Connect, retrying with exponential backoff until `max_elapsed` runs out.
    pub async fn connect_with_retry(database_url: &str, max_elapsed: Duration) -> Result<Self> {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            current_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            max_elapsed_time: Some(max_elapsed),
            ..Default::default()
        };

        let mut attempt = 1;
        loop {
            match Self::connect(database_url).await {
                Ok(store) => return Ok(store),
                Err(e) => match backoff.next_backoff() {
                    Some(delay) => {
                        warn!(
                            "Database connection attempt {} failed: {}, retrying in {:?}",
                            attempt, e, delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(e),
                },
            }
        }
    }

    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                link TEXT NOT NULL UNIQUE,
                published_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_published ON posts (published_at DESC)")
            .execute(&self.db)
            .await?;

        info!("Posts schema ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn upsert_batch(&self, posts: &[NewPost]) -> Result<()> {
        let posts = storable(posts);
        if posts.is_empty() {
            return Ok(());
        }

        // Dropping the transaction on an early return rolls it back.
        let mut tx = self.db.begin().await?;
        for post in &posts {
            sqlx::query(
                r#"
                INSERT INTO posts (title, description, link, published_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (link) DO UPDATE
                SET title = EXCLUDED.title,
                    description = EXCLUDED.description,
                    published_at = EXCLUDED.published_at
                "#,
            )
            .bind(&post.title)
            .bind(&post.description)
            .bind(&post.link)
            .bind(post.published_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!("Upserted {} posts", posts.len());
        Ok(())
    }

    async fn latest(&self, limit: i64) -> Result<Vec<Post>> {
        check_limit(limit)?;

        let rows = sqlx::query(
            r#"
            SELECT id, title, description, link, published_at, created_at
            FROM posts
            ORDER BY published_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            posts.push(Post {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                description: row.try_get("description")?,
                link: row.try_get("link")?,
                published_at: row.try_get("published_at")?,
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(posts)
    }
}
