//! Record reading and batched ingestion

mod batch;
mod error;
pub mod progress;
pub mod reader;

pub use batch::{BatchEngine, BatchOutcome, DEFAULT_BATCH_SIZE, IngestStats};
pub use error::IngestError;
pub use progress::IngestProgress;
pub use reader::{ReaderStats, RecordReader, count_lines};
