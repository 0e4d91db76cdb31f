use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hlsvault")]
#[command(author, version, about = "HLS live recorder and VOD composer")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API, the recorder and the daily clean
    Start {
        /// Host to bind to (overrides the config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Compose a VOD playlist from recorded day playlists
    Vod {
        /// Stream path, relative to the record path
        #[arg(long)]
        stream: String,

        /// Window start (unix seconds)
        #[arg(long)]
        start: i64,

        /// Window end (unix seconds, exclusive)
        #[arg(long)]
        end: i64,
    },

    /// List recorded playlists
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a playlist and display its segments
    Parse {
        /// Playlist file to parse
        #[arg(required = true)]
        playlist: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
