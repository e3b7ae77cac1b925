//! # wikipeek-core
//!
//! Core types, traits, configuration, and the pure reference-parsing
//! logic shared by the wikipeek crates.

pub mod config;
pub mod error;
pub mod message;
pub mod reference;
pub mod traits;

/// Log target for the append-only request log.
///
/// The subscriber setup in the binary routes events with this target to
/// `requests.log`. The emit sites in the reply pipeline spell the target
/// out as the literal `"requests"` (tracing takes the target at the
/// macro call site), so this constant and those literals must stay in
/// sync. Record shape: `"{guild}" "{item}" "{url}"` with an optional
/// trailing `"{status}"`.
pub const REQUEST_LOG_TARGET: &str = "requests";
