//! Hlsvault - HLS live recorder and VOD composer
//!
//! This library crate exposes the core functionality for integration testing.

pub mod cleaner;
pub mod config;
pub mod recorder;
pub mod recordings;
pub mod server;
pub mod vod;
