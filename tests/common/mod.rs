//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates a temporary record directory, an
//! in-process [`FrameHub`], a [`ManualClock`] and a full [`AppContext`].

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hlsvault::recorder::{Frame, FrameHub, ManualClock, RecorderSettings, RecordingManager};
use hlsvault::server::AppContext;
use hlsvault::vod::VodComposer;
use hlsvault_common::DayZone;
use hlsvault_media::{AudioFrame, VideoFrame};
use tempfile::TempDir;

/// 2024-01-05T00:00:00Z
pub const DAY: i64 = 1_704_412_800;

/// Test harness wrapping a recorder that writes into a temporary directory.
pub struct TestHarness {
    pub dir: TempDir,
    pub hub: FrameHub,
    pub clock: Arc<ManualClock>,
    pub manager: RecordingManager,
}

impl TestHarness {
    /// Create a harness with a one second fragment, clock at [`DAY`].
    pub fn new() -> Self {
        Self::with_fragment(Duration::from_secs(1))
    }

    pub fn with_fragment(fragment: Duration) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let hub = FrameHub::new();
        let clock = Arc::new(ManualClock::at_unix(DAY));

        let mut settings = RecorderSettings::new(dir.path(), fragment);
        settings.zone = DayZone::Utc;
        let manager = RecordingManager::new(settings, Arc::new(hub.clone()), clock.clone())
            .expect("failed to create recording manager");

        Self {
            dir,
            hub,
            clock,
            manager,
        }
    }

    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    /// Application context with the recorder enabled.
    pub fn context(&self) -> AppContext {
        AppContext {
            recorder: Some(self.manager.clone()),
            vod: VodComposer::new(self.base(), DayZone::Utc),
            base_path: self.base().to_path_buf(),
            hub: self.hub.clone(),
        }
    }
}

/// Application context for `base` with recording disabled.
pub fn context_without_recorder(base: &Path) -> AppContext {
    AppContext {
        recorder: None,
        vod: VodComposer::new(base, DayZone::Utc),
        base_path: base.to_path_buf(),
        hub: FrameHub::new(),
    }
}

pub fn video(ts: u32, keyframe: bool) -> Frame {
    Frame::Video(VideoFrame::new(ts, keyframe, vec![0x65; 400]))
}

pub fn audio(ts: u32) -> Frame {
    Frame::Audio(AudioFrame::new(ts, vec![0x21; 40]))
}

/// Poll `cond` until it holds, failing the test after five seconds.
pub async fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Write a day playlist fixture with `(start, duration)` segments.
pub fn write_day_playlist(stream_dir: &Path, day: &str, segments: &[(i64, f64)]) -> PathBuf {
    fs::create_dir_all(stream_dir).unwrap();
    let mut text = String::from(
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-MEDIA-SEQUENCE:0\n#EXT-X-TARGETDURATION:10\n",
    );
    for (start, duration) in segments {
        text.push_str(&format!("#EXTINF:{duration},\nday/{start}.ts\n"));
    }
    let path = stream_dir.join(format!("{day}.m3u8"));
    fs::write(&path, text).unwrap();
    path
}
