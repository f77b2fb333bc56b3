use forgelens_core::LayoutError;
use thiserror::Error;

mod adapter;
mod cumulative;
mod flatten;
mod tree;

pub use cumulative::{CumulativeMergeSpec, flatten_cumulative};
pub use flatten::{FlattenRows, FlattenSpec, LevelSpec, ValueMode, flatten, flatten_table};
pub use tree::{Aggregation, Bucket, BucketTree};

#[derive(Debug, Error, PartialEq)]
pub enum AggError {
    /// The tree does not carry the bucket aggregation the declared shape
    /// promises at this nesting level.
    #[error("shape mismatch at level {level}: no bucket aggregation named '{field}'")]
    ShapeMismatch { level: usize, field: String },
    #[error("bucket '{bucket}' has no metric named '{metric}'")]
    MissingMetric { bucket: String, metric: String },
    #[error("malformed aggregation response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}
