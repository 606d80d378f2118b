pub mod cache;
pub mod config;
pub mod feed;
pub mod pipeline;
pub mod sink;

pub use cache::RollingBarCache;
pub use config::{CacheConfig, EngineConfig, UniverseConfig};
pub use feed::{CsvReplayFeed, Cycle, FeedDriver, FeedHandle, FeedSummary};
pub use pipeline::{dispatch_cycle, CycleReport, Pipeline};
pub use sink::{JsonLinesSink, TracingSink};
