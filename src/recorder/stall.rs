//! Stall detection.
//!
//! A session whose stream stops producing cut points (no frames, or no
//! keyframes) would hold its segment open forever. A poller per session stops
//! it once neither the session start nor the last cut lies within five
//! fragments.

use super::clock::Clock;
use super::registry::{SessionHandle, SessionState};
use chrono::{DateTime, Utc};
use hlsvault_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Fragments without a cut after which a session counts as stalled.
pub const STALL_FRAGMENTS: u32 = 5;

/// Check one session, requesting a stop if it has stalled.
///
/// Returns whether a stop was requested. Fails if the clock reads earlier
/// than the session's recorded times.
pub fn check_stall(handle: &SessionHandle, now: DateTime<Utc>) -> Result<bool> {
    if handle.state() != SessionState::Recording {
        return Ok(false);
    }
    let fragment = handle.fragment();
    if fragment.is_zero() {
        return Ok(false);
    }
    let Some(started) = handle.started_at() else {
        return Ok(false);
    };
    let last_cut = handle.last_cut().unwrap_or(started);

    let since_start = elapsed(started, now)?;
    let since_cut = elapsed(last_cut, now)?;
    let limit = fragment * STALL_FRAGMENTS;

    if since_start > limit && since_cut > limit {
        tracing::warn!(
            session_id = %handle.id(),
            since_cut_secs = since_cut.as_secs(),
            "Recording stalled, stopping session"
        );
        handle.request_stop();
        return Ok(true);
    }

    Ok(false)
}

fn elapsed(from: DateTime<Utc>, now: DateTime<Utc>) -> Result<Duration> {
    (now - from).to_std().map_err(|_| {
        Error::internal(format!(
            "clock reads {} before recorded time {}",
            now.to_rfc3339(),
            from.to_rfc3339()
        ))
    })
}

/// Start a background task polling `handle` once per fragment.
///
/// Sessions that do not fragment have no poller. The task ends once the
/// session has stopped or a stop was requested.
pub fn start_stall_poller(
    handle: Arc<SessionHandle>,
    clock: Arc<dyn Clock>,
) -> Option<tokio::task::JoinHandle<()>> {
    let fragment = handle.fragment();
    if fragment.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(fragment);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            if handle.state() == SessionState::Stopped || handle.stop_requested() {
                break;
            }

            match check_stall(&handle, clock.now()) {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(session_id = %handle.id(), error = %e, "Stall check failed");
                }
            }
        }
    }))
}
