//! Hlsvault-Media: MPEG-TS segment writing and HLS playlist handling
//!
//! This crate holds the binary and text formats a recording is made of. It
//! knows nothing about sessions, clocks or directories; the recorder drives it.
//!
//! # Modules
//!
//! - `ts` - Transport-stream packetizing (PAT, PMT, PES, continuity counters)
//! - `hls` - Playlist model, rendering and parsing (m3u8)
//!
//! # Architecture
//!
//! A recorded segment is a self-contained transport stream:
//!
//! 1. One PAT packet pointing at the program map
//! 2. One PMT packet advertising the negotiated video/audio codecs
//! 3. PES-framed audio and video payloads, split into 188-byte packets
//!
//! Continuity counters live in a [`ts::ContinuityState`] owned by the caller,
//! so a session can carry them from one segment file into the next.

pub mod error;
pub mod hls;
pub mod ts;

pub use error::{Error, Result};
pub use hls::{ParsedPlaylist, Playlist, Segment};
pub use ts::{AudioFrame, ContinuityState, SegmentWriter, Tracks, VideoFrame};
