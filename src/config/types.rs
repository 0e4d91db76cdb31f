use hlsvault_common::DayZone;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub record: RecordConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordConfig {
    /// Base output directory for recordings
    #[serde(default = "default_record_path")]
    pub path: PathBuf,

    /// Segment length in seconds (0 = one continuous segment)
    #[serde(default = "default_fragment_secs")]
    pub fragment_secs: u64,

    /// Start recording every stream as soon as it is published
    #[serde(default)]
    pub auto_record: bool,

    /// Regex a stream path must match to be auto-recorded
    #[serde(default)]
    pub filter: Option<String>,

    /// Delete recordings older than this many days (0 disables cleaning)
    #[serde(default)]
    pub auto_clean_days: u32,

    /// Local hour at which the daily clean runs
    #[serde(default = "default_clean_hour")]
    pub clean_hour: u32,

    /// Zone used for day playlists and directory names
    #[serde(default)]
    pub timezone: DayZone,
}

fn default_record_path() -> PathBuf {
    PathBuf::from("record/hls")
}
fn default_fragment_secs() -> u64 {
    10
}
fn default_clean_hour() -> u32 {
    2
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            path: default_record_path(),
            fragment_secs: default_fragment_secs(),
            auto_record: false,
            filter: None,
            auto_clean_days: 0,
            clean_hour: default_clean_hour(),
            timezone: DayZone::default(),
        }
    }
}
