mod cli;

use hlsvault::{
    cleaner::{self, CleanSchedule},
    config,
    recorder::{Clock, FrameHub, RecorderSettings, RecordingManager, SystemClock},
    recordings,
    server::{self, AppContext},
    vod::VodComposer,
};
use hlsvault_media::hls::parse_file;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    // Load config
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting hlsvault server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let hub = FrameHub::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // A recorder that cannot start leaves the VOD and listing API running
    let recorder = match RecorderSettings::from_config(&config.record)
        .and_then(|settings| RecordingManager::new(settings, Arc::new(hub.clone()), clock.clone()))
    {
        Ok(manager) => Some(manager),
        Err(e) => {
            tracing::error!(error = %e, "Recording disabled");
            None
        }
    };

    let clean_task = recorder.as_ref().and_then(|manager| {
        cleaner::start_auto_clean(
            CleanSchedule {
                root: config.record.path.clone(),
                days: config.record.auto_clean_days,
                hour: config.record.clean_hour,
                zone: config.record.timezone,
            },
            manager.registry().clone(),
            clock.clone(),
        )
    });

    let ctx = AppContext {
        recorder: recorder.clone(),
        vod: VodComposer::new(&config.record.path, config.record.timezone),
        base_path: config.record.path.clone(),
        hub,
    };

    let server_result = server::start_server(&config.server.host, config.server.port, ctx).await;

    // Cleanup
    tracing::info!("Shutting down...");
    if let Some(task) = clean_task {
        task.abort();
    }
    if let Some(manager) = recorder {
        manager.shutdown().await;
    }

    server_result
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "hlsvault=trace,hlsvault_media=trace,tower_http=debug".to_string()
        } else {
            "hlsvault=debug,hlsvault_media=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            // Create tokio runtime
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Vod { stream, start, end } => {
            compose_vod(&stream, start, end, cli.config.as_deref())
        }
        Commands::List { json } => list_recordings(json, cli.config.as_deref()),
        Commands::Parse { playlist } => parse_playlist(&playlist),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("hlsvault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn compose_vod(stream: &str, start: i64, end: i64, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let composer = VodComposer::new(&config.record.path, config.record.timezone);

    let vod = composer.compose(stream, start, end)?;

    println!("Playlist: {}", vod.path.display());
    println!("Segments: {}", vod.segments.len());
    println!("Span: {} - {}", vod.start_time, vod.end_time);
    Ok(())
}

fn list_recordings(json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let entries = recordings::tree(&config.record.path, None)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No recordings under {}", config.record.path.display());
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{}  {} bytes  {:.1}s",
            entry.path, entry.size, entry.duration
        );
    }
    println!("\n{} playlists", entries.len());
    Ok(())
}

fn parse_playlist(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Playlist does not exist: {:?}", path);
    }

    let parsed = parse_file(path)?;
    let playlist = &parsed.playlist;

    println!("Playlist: {}", path.display());
    if let Some(target) = playlist.target_duration {
        println!("Target duration: {}", target);
    }
    println!("\nSegments: {}", playlist.segments.len());
    for (i, segment) in playlist.segments.iter().enumerate() {
        match segment.start_time {
            Some(start) => println!(
                "  [{}] {} start {} duration {}",
                i, segment.file_name, start, segment.duration
            ),
            None => println!(
                "  [{}] {} duration {}",
                i, segment.file_name, segment.duration
            ),
        }
    }
    if parsed.skipped > 0 {
        println!("Skipped malformed entries: {}", parsed.skipped);
    }

    if !playlist.is_empty() {
        println!(
            "\nSpan: {} - {} ({:.3}s)",
            playlist.start_time(),
            playlist.end_time(),
            playlist.total_duration()
        );
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Record path: {}", config.record.path.display());
            println!("  Fragment: {}s", config.record.fragment_secs);
            println!("  Auto record: {}", config.record.auto_record);
            if let Some(ref filter) = config.record.filter {
                println!("    Filter: {}", filter);
            }
            println!("  Timezone: {}", config.record.timezone);
            if config.record.auto_clean_days > 0 {
                println!(
                    "  Auto clean: older than {} days at {:02}:00",
                    config.record.auto_clean_days, config.record.clean_hour
                );
            } else {
                println!("  Auto clean: disabled");
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Record path: {}", config.record.path.display());
        }
    }

    Ok(())
}
