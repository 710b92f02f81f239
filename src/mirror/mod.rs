//! Mirroring a merged repository onto the local file system.
//!
//! - [`MirrorEngine`] - the concurrent download orchestrator
//! - [`MirrorLayout`] - where releases, icons, and the manifest live on disk
//! - [`DownloadOutcome`] - the terminal state of each release
//! - [`manifest`] - the output manifest of what was captured

mod engine;
mod error;
mod layout;
pub mod manifest;
mod outcome;
mod stats;

pub use engine::{DEFAULT_BATCH_SIZE, DEFAULT_ICON_THEME, EngineOptions, MirrorEngine};
pub use error::FetchError;
pub use layout::MirrorLayout;
pub use outcome::{DownloadAction, DownloadOutcome, ErrorKind, Release};
pub use stats::MirrorStats;
