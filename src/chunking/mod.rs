//! Two-level windowing of a chat stream and the table plumbing around it:
//! partition, index, aggregate per window, merge families, rank.

pub mod aggregate;
pub mod config;
pub mod indexer;
pub mod merge;
pub mod partition;
pub mod rank;

pub use aggregate::{
    absolute_ratio, aggregate, rate_per_window, relative_ratio, AggregateOutcome, FnReducer,
    Reduction, SkippedWindow, WindowContext, WindowReducer,
};
pub use config::{ChunkingConfig, WindowBoundary};
pub use indexer::{Chunking, CoarsePartition, EventStream};
pub use merge::FeatureMerger;
pub use partition::WindowPartitioner;
pub use rank::{rank, RankSpec};
