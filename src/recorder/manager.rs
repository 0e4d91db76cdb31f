//! Recording manager: starts, stops and lists recording sessions.

use super::clock::Clock;
use super::formatter::formatter_for;
use super::hub::StreamSource;
use super::registry::{session_id, SessionHandle, SessionRegistry, SessionState};
use super::session::{RecordingSession, SessionConfig};
use super::stall;
use crate::config::RecordConfig;
use chrono::{DateTime, Utc};
use hlsvault_common::paths::{is_safe_stream_path, to_slash};
use hlsvault_common::{DayZone, Error, Format, Result};
use hlsvault_media::Tracks;
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Recorder settings resolved from the `[record]` config section.
#[derive(Debug, Clone)]
pub struct RecorderSettings {
    pub base_path: PathBuf,
    pub fragment: Duration,
    pub zone: DayZone,
    pub auto_record: bool,
    pub filter: Option<Regex>,
}

impl RecorderSettings {
    pub fn from_config(config: &RecordConfig) -> Result<Self> {
        let filter = config
            .filter
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| Error::configuration(format!("invalid record filter: {e}")))?;

        Ok(Self {
            base_path: config.path.clone(),
            fragment: Duration::from_secs(config.fragment_secs),
            zone: config.timezone,
            auto_record: config.auto_record,
            filter,
        })
    }

    /// Settings recording into `base_path` with the given fragment length.
    pub fn new(base_path: impl Into<PathBuf>, fragment: Duration) -> Self {
        Self {
            base_path: base_path.into(),
            fragment,
            zone: DayZone::default(),
            auto_record: false,
            filter: None,
        }
    }

    /// Whether a newly published stream should be recorded automatically.
    pub fn wants_auto_record(&self, stream_path: &str) -> bool {
        self.auto_record
            && self
                .filter
                .as_ref()
                .map(|re| re.is_match(stream_path))
                .unwrap_or(true)
    }
}

/// Parameters of a start request.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub stream_path: String,
    pub format: Format,
    /// Overrides the configured fragment length.
    pub fragment: Option<Duration>,
    /// Fixed segment name for unfragmented recordings.
    pub file_name: Option<String>,
    pub append: bool,
}

impl StartRequest {
    pub fn new(stream_path: impl Into<String>) -> Self {
        Self {
            stream_path: stream_path.into(),
            format: Format::default(),
            fragment: None,
            file_name: None,
            append: false,
        }
    }
}

/// Snapshot of a live session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub stream_path: String,
    pub format: Format,
    pub state: SessionState,
    /// Tracks announced by the stream, once known.
    pub tracks: Option<Tracks>,
    pub fragment_secs: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub last_cut: Option<DateTime<Utc>>,
    /// Open files, relative to the base path.
    pub open_files: Vec<String>,
}

/// Owns the live sessions and the tasks driving them.
#[derive(Clone)]
pub struct RecordingManager {
    settings: Arc<RecorderSettings>,
    registry: SessionRegistry,
    source: Arc<dyn StreamSource>,
    clock: Arc<dyn Clock>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    pollers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl RecordingManager {
    /// Create a manager, checking that the base path is writable.
    pub fn new(
        settings: RecorderSettings,
        source: Arc<dyn StreamSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        check_writable(&settings.base_path)?;

        tracing::info!(
            path = %settings.base_path.display(),
            fragment_secs = settings.fragment.as_secs_f64(),
            auto_record = settings.auto_record,
            "Recording manager ready"
        );

        Ok(Self {
            settings: Arc::new(settings),
            registry: SessionRegistry::new(),
            source,
            clock,
            tasks: Arc::new(Mutex::new(Vec::new())),
            pollers: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    pub fn base_path(&self) -> &Path {
        &self.settings.base_path
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Start recording a stream. Returns the session id.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&self, request: StartRequest) -> Result<String> {
        if !is_safe_stream_path(&request.stream_path) {
            return Err(Error::validation(format!(
                "invalid stream path: {:?}",
                request.stream_path
            )));
        }
        if let Some(name) = &request.file_name {
            if name.is_empty() || name.contains(['/', '\\']) || name == ".." || name == "." {
                return Err(Error::validation(format!("invalid file name: {name:?}")));
            }
        }

        let fragment = request.fragment.unwrap_or(self.settings.fragment);
        let handle = Arc::new(SessionHandle::new(
            request.stream_path.clone(),
            request.format,
            fragment,
        ));
        handle.set_state(SessionState::Starting);
        let id = handle.id().to_string();

        if let Some(previous) = self.registry.register(handle.clone())? {
            tracing::info!(
                session_id = %id,
                state = ?previous.state(),
                "Replacing session that is not recording"
            );
            previous.request_stop();
        }

        let source = match self.source.subscribe(&request.stream_path) {
            Ok(source) => source,
            Err(e) => {
                self.registry.remove_if_same(&handle);
                return Err(e);
            }
        };

        let config = SessionConfig {
            stream_dir: self.settings.base_path.join(&request.stream_path),
            zone: self.settings.zone,
            file_name: request.file_name,
            append: request.append,
        };
        let session = RecordingSession::new(
            handle.clone(),
            self.clock.clone(),
            config,
            formatter_for(request.format),
        );

        let registry = self.registry.clone();
        let task_handle = handle.clone();
        let task = tokio::task::spawn_blocking(move || {
            if let Err(e) = session.run(source) {
                tracing::error!(
                    session_id = %task_handle.id(),
                    error = %e,
                    "Recording session failed"
                );
            }
            registry.remove_if_same(&task_handle);
        });

        {
            let mut tasks = self.tasks.lock();
            tasks.retain(|task| !task.is_finished());
            tasks.push(task);
        }
        if let Some(poller) = stall::start_stall_poller(handle, self.clock.clone()) {
            let mut pollers = self.pollers.lock();
            pollers.retain(|poller| !poller.is_finished());
            pollers.push(poller);
        }

        tracing::info!(
            session_id = %id,
            stream_path = %request.stream_path,
            fragment_secs = fragment.as_secs_f64(),
            "Recording requested"
        );
        Ok(id)
    }

    /// Ask a session to stop.
    pub fn stop(&self, id: &str) -> Result<()> {
        let handle = self
            .registry
            .get(id)
            .ok_or_else(|| Error::not_found("session", id))?;
        handle.request_stop();
        tracing::info!(session_id = %id, "Stop requested");
        Ok(())
    }

    /// Stop the session recording `stream_path` in `format`, if any.
    pub fn stop_stream(&self, stream_path: &str, format: Format) -> Result<()> {
        self.stop(&session_id(stream_path, format))
    }

    /// Snapshot of every live session.
    pub fn list(&self) -> Vec<SessionInfo> {
        self.registry
            .list()
            .into_iter()
            .map(|handle| SessionInfo {
                id: handle.id().to_string(),
                stream_path: handle.stream_path().to_string(),
                format: handle.format(),
                state: handle.state(),
                tracks: handle.tracks(),
                fragment_secs: handle.fragment().as_secs_f64(),
                started_at: handle.started_at(),
                last_cut: handle.last_cut(),
                open_files: handle
                    .open_paths()
                    .iter()
                    .map(|path| {
                        to_slash(path.strip_prefix(&self.settings.base_path).unwrap_or(path))
                    })
                    .collect(),
            })
            .collect()
    }

    /// Hook for a newly published stream: start recording if configured to.
    pub fn on_publish(&self, stream_path: &str) -> Result<Option<String>> {
        if !self.settings.wants_auto_record(stream_path) {
            return Ok(None);
        }

        match self.start(StartRequest::new(stream_path)) {
            Ok(id) => Ok(Some(id)),
            Err(Error::DuplicateSession { id }) => {
                tracing::debug!(session_id = %id, "Already recording");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Stop every session and wait for their tasks.
    pub async fn shutdown(&self) {
        let sessions = self.registry.drain();
        for handle in &sessions {
            handle.request_stop();
        }

        for poller in std::mem::take(&mut *self.pollers.lock()) {
            poller.abort();
        }

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Recording task ended abnormally");
            }
        }

        tracing::info!(sessions = sessions.len(), "Recording manager stopped");
    }
}

fn check_writable(base: &Path) -> Result<()> {
    let unwritable = |e: std::io::Error| {
        Error::configuration(format!(
            "record path {} is not writable: {e}",
            base.display()
        ))
    };

    fs::create_dir_all(base).map_err(unwritable)?;
    let probe = base.join(".hlsvault-probe");
    fs::write(&probe, b"").map_err(unwritable)?;
    fs::remove_file(&probe).map_err(unwritable)?;
    Ok(())
}
