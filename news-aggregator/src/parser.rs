use crate::timestamp::resolve_published;
use crate::types::{AggregatorError, FeedEntry, Result};
use chrono::Utc;
use feed_rs::parser;
use rss::Channel;
use tracing::debug;

/// Turns a raw feed document into normalized entries, preserving document order.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_feed(&self, content: &[u8]) -> Result<Vec<FeedEntry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        match Channel::read_from(content) {
            Ok(channel) => Ok(Self::entries_from_channel(&channel)),
            Err(rss_error) => {
                // Not RSS 2.0; Atom and JSON Feed documents still carry items.
                let feed = parser::parse(content).map_err(|e| {
                    AggregatorError::Parse(format!("Failed to parse feed: {} ({})", rss_error, e))
                })?;
                Ok(Self::entries_from_feed(feed))
            }
        }
    }

    fn entries_from_channel(channel: &Channel) -> Vec<FeedEntry> {
        channel
            .items()
            .iter()
            .map(|item| FeedEntry {
                title: normalize(item.title()),
                description: normalize(item.description()),
                link: normalize(item.link()),
                published_at: resolve_published(item.pub_date().unwrap_or_default()),
            })
            .collect()
    }

    fn entries_from_feed(feed: feed_rs::model::Feed) -> Vec<FeedEntry> {
        feed.entries
            .into_iter()
            .map(|entry| {
                let description = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body));
                FeedEntry {
                    title: normalize(entry.title.as_ref().map(|t| t.content.as_str())),
                    description: normalize(description.as_deref()),
                    link: normalize(entry.links.first().map(|l| l.href.as_str())),
                    published_at: entry
                        .published
                        .or(entry.updated)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(Utc::now),
                }
            })
            .collect()
    }
}

fn normalize(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}
