//! HLS playlist handling.
//!
//! This module renders and parses the M3U8 playlists a recording produces:
//! day playlists appended while recording and VOD playlists composed later.

pub mod parser;
mod playlist;

pub use parser::{parse_file, parse_str, ParsedPlaylist};
pub use playlist::{
    entry, format_duration, header, start_time_from_file_name, Playlist, Segment, END_LIST,
};
