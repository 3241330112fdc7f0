use crate::cancel::CancelSignal;
use crate::parser::FeedParser;
use crate::traits::FetchFeed;
use crate::types::{AggregatorError, FeedEntry, FetchConfig, Result};
use async_trait::async_trait;
use reqwest::{redirect, Client};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    parser: FeedParser,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let redirect_policy = if config.follow_redirects {
            redirect::Policy::limited(config.max_redirects)
        } else {
            redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(redirect_policy)
            .build()?;

        Ok(Self {
            client,
            config,
            parser: FeedParser::new(),
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub async fn fetch_feed(&self, url: &str, cancel: &CancelSignal) -> Result<Vec<FeedEntry>> {
        let url = Url::parse(url)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Fetch cancelled: {}", url);
                Err(AggregatorError::Cancelled)
            }
            result = self.download(&url) => {
                let content = result?;
                let entries = self.parser.parse_feed(&content)?;
                info!("Fetched {} entries from {}", entries.len(), url);
                Ok(entries)
            }
        }
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let mut response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(AggregatorError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let limit_mb = self.config.max_feed_size_mb;
        let limit = limit_mb.saturating_mul(1024 * 1024);
        if let Some(content_length) = response.content_length() {
            if content_length > limit as u64 {
                return Err(AggregatorError::FeedTooLarge { limit_mb });
            }
        }

        // The header is absent for chunked or compressed bodies.
        let mut content = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if content.len() + chunk.len() > limit {
                return Err(AggregatorError::FeedTooLarge { limit_mb });
            }
            content.extend_from_slice(&chunk);
        }

        debug!(
            "Downloaded {} ({} bytes) in {}ms",
            url,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }
}

#[async_trait]
impl FetchFeed for Fetcher {
    async fn fetch(&self, url: &str, cancel: &CancelSignal) -> Result<Vec<FeedEntry>> {
        self.fetch_feed(url, cancel).await
    }
}
