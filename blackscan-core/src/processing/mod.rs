//! Batch orchestration: sequencing probe and analysis runs across a queue of
//! files and aggregating their results.

mod batch;

pub use batch::{
    BatchSummary, CancelToken, FileOutcome, FileStatus, QueueRunner, ResultStore,
};
