//! Automatic removal of old recordings.
//!
//! Once a day the recording tree is swept: files last modified more than the
//! configured number of days before the start of today are deleted, then
//! directories left empty are removed. Files held open by a live session are
//! never touched.

use crate::recorder::{Clock, SessionRegistry};
use chrono::{DateTime, Utc};
use hlsvault_common::{DayZone, Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub bytes_freed: u64,
    /// Old files kept because a live session holds them open.
    pub skipped_open: usize,
    /// Entries that could not be inspected or removed.
    pub errors: usize,
}

/// Sweep `root` for files older than `days` days before `today_start`.
///
/// `today_start` is the unix time at which the current day began. The root
/// itself is never removed.
pub fn clean_files(
    root: &Path,
    days: u32,
    today_start: i64,
    exclude: &HashSet<PathBuf>,
) -> Result<CleanReport> {
    fs::metadata(root)?;

    let cutoff = today_start - i64::from(days) * 86_400;
    let mut report = CleanReport::default();

    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read directory entry");
                report.errors += 1;
                continue;
            }
        };
        let path = entry.path();

        if entry.file_type().is_dir() {
            if holds_open_file(path, exclude) {
                continue;
            }
            match remove_if_empty(path) {
                Ok(true) => {
                    tracing::debug!(path = %path.display(), "Removed empty directory");
                    report.dirs_removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to remove directory"
                    );
                    report.errors += 1;
                }
            }
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to stat file");
                report.errors += 1;
                continue;
            }
        };
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        if modified >= cutoff {
            continue;
        }

        if exclude.contains(path) {
            report.skipped_open += 1;
            continue;
        }

        match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed old recording file");
                report.files_removed += 1;
                report.bytes_freed += metadata.len();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove file");
                report.errors += 1;
            }
        }
    }

    Ok(report)
}

fn holds_open_file(dir: &Path, exclude: &HashSet<PathBuf>) -> bool {
    exclude.iter().any(|open| open.starts_with(dir))
}

fn remove_if_empty(dir: &Path) -> std::io::Result<bool> {
    if fs::read_dir(dir)?.next().is_some() {
        return Ok(false);
    }
    fs::remove_dir(dir)?;
    Ok(true)
}

/// Next time the daily sweep runs: `hour` o'clock today, or tomorrow once
/// that has passed.
pub fn next_run(zone: DayZone, now: DateTime<Utc>, hour: u32) -> Result<DateTime<Utc>> {
    let today = zone.date_of(now);
    let offset = i64::from(hour) * 3600;

    for day in [Some(today), today.succ_opt()].into_iter().flatten() {
        let Some(start) = zone.day_start(day) else {
            continue;
        };
        let Some(candidate) = DateTime::from_timestamp(start + offset, 0) else {
            continue;
        };
        if candidate > now {
            return Ok(candidate);
        }
    }

    Err(Error::internal(format!(
        "cannot schedule clean at hour {hour} after {now}"
    )))
}

/// Settings of the daily sweep.
#[derive(Debug, Clone)]
pub struct CleanSchedule {
    pub root: PathBuf,
    pub days: u32,
    pub hour: u32,
    pub zone: DayZone,
}

/// Start the daily clean task. Returns `None` when cleaning is disabled.
pub fn start_auto_clean(
    schedule: CleanSchedule,
    registry: SessionRegistry,
    clock: Arc<dyn Clock>,
) -> Option<tokio::task::JoinHandle<()>> {
    if schedule.days == 0 {
        return None;
    }

    tracing::info!(
        path = %schedule.root.display(),
        days = schedule.days,
        hour = schedule.hour,
        "Auto clean enabled"
    );

    Some(tokio::spawn(async move {
        loop {
            let now = clock.now();
            let next = match next_run(schedule.zone, now, schedule.hour) {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!(error = %e, "Auto clean stopped");
                    return;
                }
            };
            let wait = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60));
            tokio::time::sleep(wait).await;

            let today = schedule.zone.date_of(clock.now());
            let Some(today_start) = schedule.zone.day_start(today) else {
                tracing::warn!(day = %today, "Cannot resolve start of day, skipping clean");
                continue;
            };
            let exclude = registry.open_paths();
            let root = schedule.root.clone();
            let days = schedule.days;

            let result = tokio::task::spawn_blocking(move || {
                clean_files(&root, days, today_start, &exclude)
            })
            .await;

            match result {
                Ok(Ok(report)) => tracing::info!(
                    files = report.files_removed,
                    dirs = report.dirs_removed,
                    bytes = report.bytes_freed,
                    skipped_open = report.skipped_open,
                    errors = report.errors,
                    "Auto clean finished"
                ),
                Ok(Err(e)) => tracing::error!(error = %e, "Auto clean failed"),
                Err(e) => tracing::error!(error = %e, "Auto clean task panicked"),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    const TODAY: i64 = 1_704_412_800; // 2024-01-05T00:00:00Z

    fn touch(path: &Path, unix: i64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"data").unwrap();
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(unix as u64))
            .unwrap();
    }

    #[test]
    fn test_removes_old_files_and_empty_dirs() {
        let root = TempDir::new().unwrap();
        let old = root.path().join("live/a/2024-01/01/1704067200.ts");
        let recent = root.path().join("live/a/2024-01/04/1704326400.ts");
        touch(&old, TODAY - 4 * 86_400 + 10);
        touch(&recent, TODAY - 86_400 + 10);

        let report = clean_files(root.path(), 2, TODAY, &HashSet::new()).unwrap();

        assert_eq!(report.files_removed, 1);
        assert_eq!(report.bytes_freed, 4);
        assert!(!old.exists());
        assert!(!root.path().join("live/a/2024-01/01").exists());
        assert!(recent.exists());
        assert!(root.path().exists());
    }

    #[test]
    fn test_keeps_open_files() {
        let root = TempDir::new().unwrap();
        let open = root.path().join("live/a/20240101.m3u8");
        touch(&open, TODAY - 10 * 86_400);

        let exclude: HashSet<PathBuf> = [open.clone()].into_iter().collect();
        let report = clean_files(root.path(), 1, TODAY, &exclude).unwrap();

        assert_eq!(report.files_removed, 0);
        assert_eq!(report.skipped_open, 1);
        assert!(open.exists());
    }

    #[test]
    fn test_missing_root_is_error() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("missing");
        let err = clean_files(&missing, 1, TODAY, &HashSet::new()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_next_run() {
        let at = |secs| Utc.timestamp_opt(secs, 0).unwrap();

        // 01:00 -> 02:00 today
        let next = next_run(DayZone::Utc, at(TODAY + 3600), 2).unwrap();
        assert_eq!(next.timestamp(), TODAY + 2 * 3600);

        // 02:00 exactly -> tomorrow
        let next = next_run(DayZone::Utc, at(TODAY + 2 * 3600), 2).unwrap();
        assert_eq!(next.timestamp(), TODAY + 86_400 + 2 * 3600);
    }

    #[test]
    fn test_disabled_without_days() {
        let schedule = CleanSchedule {
            root: PathBuf::from("/tmp"),
            days: 0,
            hour: 2,
            zone: DayZone::Utc,
        };
        let clock: Arc<dyn Clock> = Arc::new(crate::recorder::SystemClock);
        assert!(start_auto_clean(schedule, SessionRegistry::new(), clock).is_none());
    }
}
