//! # wikipeek-channels
//!
//! Messaging platform integrations for wikipeek.

pub mod discord;
