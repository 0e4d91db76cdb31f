//! Shared session state and the registry of live sessions.

use chrono::{DateTime, TimeZone, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hlsvault_common::{Error, Format, Result};
use hlsvault_media::Tracks;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Starting,
    Recording,
    Stopping,
    Stopped,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Starting,
            2 => Self::Recording,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Unset timestamps are stored as this sentinel.
const UNSET: i64 = i64::MIN;

/// Session id for a stream and format: `<stream path>/<format>`.
pub fn session_id(stream_path: &str, format: Format) -> String {
    format!("{}/{}", stream_path, format)
}

/// The part of a session other tasks may read or signal.
///
/// The session task owns everything else; this handle is shared with the
/// registry, the stall poller and the cleaner.
#[derive(Debug)]
pub struct SessionHandle {
    id: String,
    stream_path: String,
    format: Format,
    fragment: Duration,
    state: AtomicU8,
    started_ms: AtomicI64,
    last_cut_ms: AtomicI64,
    stop: AtomicBool,
    rotate: AtomicBool,
    open_paths: Mutex<Vec<PathBuf>>,
    tracks: Mutex<Option<Tracks>>,
}

impl SessionHandle {
    pub fn new(stream_path: impl Into<String>, format: Format, fragment: Duration) -> Self {
        let stream_path = stream_path.into();
        Self {
            id: session_id(&stream_path, format),
            stream_path,
            format,
            fragment,
            state: AtomicU8::new(SessionState::Idle as u8),
            started_ms: AtomicI64::new(UNSET),
            last_cut_ms: AtomicI64::new(UNSET),
            stop: AtomicBool::new(false),
            rotate: AtomicBool::new(false),
            open_paths: Mutex::new(Vec::new()),
            tracks: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream_path(&self) -> &str {
        &self.stream_path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Configured segment length; zero disables cutting.
    pub fn fragment(&self) -> Duration {
        self.fragment
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Ask the session task to stop after the current frame.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Ask for the day playlist to be reopened when the next segment opens.
    pub fn request_rotation(&self) {
        self.rotate.store(true, Ordering::Release);
    }

    /// Consume a pending rotation request.
    pub fn take_rotation(&self) -> bool {
        self.rotate.swap(false, Ordering::AcqRel)
    }

    /// Record the time the first segment opened.
    pub fn mark_started(&self, at: DateTime<Utc>) {
        let millis = at.timestamp_millis();
        self.started_ms.store(millis, Ordering::Release);
        self.last_cut_ms.store(millis, Ordering::Release);
    }

    /// Record the time of a segment cut.
    pub fn mark_cut(&self, at: DateTime<Utc>) {
        self.last_cut_ms
            .store(at.timestamp_millis(), Ordering::Release);
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        from_millis(self.started_ms.load(Ordering::Acquire))
    }

    pub fn last_cut(&self) -> Option<DateTime<Utc>> {
        from_millis(self.last_cut_ms.load(Ordering::Acquire))
    }

    /// Replace the set of files this session holds open.
    pub fn set_open_paths(&self, paths: Vec<PathBuf>) {
        *self.open_paths.lock() = paths;
    }

    pub fn open_paths(&self) -> Vec<PathBuf> {
        self.open_paths.lock().clone()
    }

    /// Record the tracks the stream announced.
    pub fn set_tracks(&self, tracks: Tracks) {
        *self.tracks.lock() = Some(tracks);
    }

    pub fn tracks(&self) -> Option<Tracks> {
        *self.tracks.lock()
    }
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    if millis == UNSET {
        return None;
    }
    Utc.timestamp_millis_opt(millis).single()
}

/// Live sessions keyed by session id.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle`, replacing a session that is not recording.
    ///
    /// A `Recording` session under the same id is left untouched and
    /// `DuplicateSession` is returned. Any other occupant is returned so the
    /// caller can stop it.
    pub fn register(&self, handle: Arc<SessionHandle>) -> Result<Option<Arc<SessionHandle>>> {
        match self.sessions.entry(handle.id().to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().state() == SessionState::Recording {
                    return Err(Error::duplicate_session(handle.id()));
                }
                Ok(Some(entry.insert(handle)))
            }
            Entry::Vacant(entry) => {
                entry.insert(handle);
                Ok(None)
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Remove the entry for `handle` if it is still the registered one.
    pub fn remove_if_same(&self, handle: &Arc<SessionHandle>) -> bool {
        self.sessions
            .remove_if(handle.id(), |_, current| Arc::ptr_eq(current, handle))
            .is_some()
    }

    /// All sessions, ordered by id.
    pub fn list(&self) -> Vec<Arc<SessionHandle>> {
        let mut sessions: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by(|a, b| a.id().cmp(b.id()));
        sessions
    }

    /// Every file a live session holds open.
    pub fn open_paths(&self) -> HashSet<PathBuf> {
        self.sessions
            .iter()
            .flat_map(|entry| entry.value().open_paths())
            .collect()
    }

    /// Remove and return every session.
    pub fn drain(&self) -> Vec<Arc<SessionHandle>> {
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.into_iter()
            .filter_map(|id| self.sessions.remove(&id).map(|(_, handle)| handle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
