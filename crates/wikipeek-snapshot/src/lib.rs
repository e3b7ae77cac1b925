//! # wikipeek-snapshot
//!
//! Renders a wiki page in an isolated headless-browser session and
//! extracts a lead-paragraph snippet plus a cropped screenshot of the
//! most relevant info region.

pub mod engine;
pub mod session;


pub use engine::{ExtractionResult, SnapshotEngine, Snapshotter};
pub use session::DomSession;
