//! Hlsvault-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across hlsvault:
//!
//! - **Error Handling**: The unified error type and result alias
//! - **Core Types**: Recording formats and the codecs a segment can carry
//! - **Day Zones**: Which timezone decides where a calendar day begins
//! - **Path Utilities**: The on-disk layout of playlists, segments and VOD files
//!
//! # Examples
//!
//! ```
//! use hlsvault_common::{Error, Result};
//! use hlsvault_common::paths::day_playlist_name;
//! use chrono::NaiveDate;
//!
//! let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
//! assert_eq!(day_playlist_name(day), "20240309.m3u8");
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("session", "live/cam1/hls"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod paths;
pub mod types;
pub mod zone;

pub use error::{Error, Result};
pub use types::*;
pub use zone::DayZone;
