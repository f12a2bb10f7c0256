//! Historical backfill over dated dump checkpoints
//!
//! A [`SnapshotWalker`] asks its [`SnapshotSource`] for every checkpoint,
//! orders them by date and replays them one at a time: activate, ingest with
//! the checkpoint's date, deactivate.

mod checkpoint;
mod error;
#[cfg(feature = "git")]
mod git;
mod walker;

pub use checkpoint::{SnapshotCheckpoint, order_checkpoints, parse_dump_label, start_index};
pub use error::WalkError;
#[cfg(feature = "git")]
pub use git::GitArchive;
pub use walker::{SnapshotSource, SnapshotWalker, WalkReport, WalkState};
