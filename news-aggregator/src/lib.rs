pub mod api;
pub mod cancel;
pub mod config;
pub mod fetcher;
pub mod parser;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod timestamp;
pub mod traits;
pub mod types;

pub use cancel::{CancelHandle, CancelSignal};
pub use config::Config;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use pipeline::IngestionPipeline;
pub use scheduler::Scheduler;
pub use store::{MemoryPostStore, PgPostStore};
pub use traits::{FetchFeed, PostStore};
pub use types::*;
