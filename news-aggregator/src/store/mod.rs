pub mod memory;
pub mod postgres;

pub use memory::MemoryPostStore;
pub use postgres::PgPostStore;

use crate::types::{AggregatorError, NewPost, Result};

/// Posts without a link have no identity to dedupe on and are never stored.
pub(crate) fn storable(posts: &[NewPost]) -> Vec<&NewPost> {
    posts.iter().filter(|post| !post.link.is_empty()).collect()
}

pub(crate) fn check_limit(limit: i64) -> Result<()> {
    if limit <= 0 {
        return Err(AggregatorError::InvalidArgument(format!(
            "limit must be greater than zero, got {}",
            limit
        )));
    }
    Ok(())
}
