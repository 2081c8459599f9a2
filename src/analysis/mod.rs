//! Analysis stage: chunking, concurrent dispatch and aggregation.

pub mod aggregator;
pub mod chunker;
pub mod dispatcher;

pub use aggregator::{aggregate, group_by_author, success_rate};
pub use chunker::{split, ChunkConfig};
pub use dispatcher::{AnalysisDispatcher, DispatchConfig, ProgressReporter};
