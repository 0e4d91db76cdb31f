//! Recorder integration tests.
//!
//! Drives full recording sessions through the in-process [`FrameHub`] and
//! checks the files they leave behind.

mod common;

use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use common::{audio, video, wait_for, TestHarness, DAY};
use hlsvault::recorder::{SessionState, StartRequest};
use hlsvault_common::{AudioCodec, Error, VideoCodec};
use hlsvault_media::hls::parse_file;
use hlsvault_media::ts::inspect::packets;
use hlsvault_media::ts::{PID_AUDIO, PID_PAT, PID_PMT, PID_VIDEO};
use hlsvault_media::Tracks;

const STREAM: &str = "live/cam";

fn av_tracks() -> Tracks {
    Tracks::video(VideoCodec::H264, Some(AudioCodec::Aac))
}

#[tokio::test]
async fn test_session_records_through_hub() {
    let h = TestHarness::new();
    h.hub.publish(STREAM, av_tracks());

    let id = h.manager.start(StartRequest::new(STREAM)).unwrap();
    assert_eq!(id, "live/cam/hls");
    let handle = h.manager.registry().get(&id).unwrap();

    h.hub.send(STREAM, video(0, true));
    h.hub.send(STREAM, audio(20));
    wait_for("recording", || handle.state() == SessionState::Recording).await;

    for k in 1..=3u32 {
        h.clock.advance_secs(1);
        h.hub.send(STREAM, video(k * 1000, false));
        h.hub.send(STREAM, audio(k * 1000 + 20));
        h.hub.send(STREAM, video(k * 1000 + 40, true));
        let expected = DAY + i64::from(k);
        wait_for("cut", || {
            handle.last_cut().map(|t| t.timestamp()) == Some(expected)
        })
        .await;
    }

    let listed = h.manager.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].state, SessionState::Recording);
    assert!(listed[0]
        .open_files
        .contains(&"live/cam/20240105.m3u8".to_string()));

    h.manager.stop(&id).unwrap();
    wait_for("session exit", || h.manager.registry().get(&id).is_none()).await;
    assert_eq!(handle.state(), SessionState::Stopped);

    let stream_dir = h.base().join(STREAM);
    let parsed = parse_file(stream_dir.join("20240105.m3u8")).unwrap();
    let playlist = parsed.playlist;
    assert_eq!(parsed.skipped, 0);
    assert_eq!(playlist.segments.len(), 4);

    let starts: Vec<i64> = playlist.segments.iter().map(|s| s.start()).collect();
    assert_eq!(starts, vec![DAY, DAY + 1, DAY + 2, DAY + 3]);
    assert!(playlist.segments.iter().all(|s| s.duration == 1.0));

    // Continuity counters run on across segment files without resetting.
    let mut last: HashMap<u16, u8> = HashMap::new();
    for segment in &playlist.segments {
        let data = fs::read(stream_dir.join(&segment.file_name)).unwrap();
        let headers = packets(&data).unwrap();
        assert_eq!(headers[0].pid, PID_PAT);
        assert_eq!(headers[1].pid, PID_PMT);

        for header in headers {
            if let Some(prev) = last.get(&header.pid) {
                assert_eq!(
                    header.continuity_counter,
                    (prev + 1) % 16,
                    "pid {:#06x} in {}",
                    header.pid,
                    segment.file_name
                );
            }
            last.insert(header.pid, header.continuity_counter);
        }
    }
    assert!(last.contains_key(&PID_VIDEO));
    assert!(last.contains_key(&PID_AUDIO));
}

#[tokio::test]
async fn test_duplicate_session_leaves_existing_untouched() {
    let h = TestHarness::new();
    h.hub.publish(STREAM, av_tracks());

    let id = h.manager.start(StartRequest::new(STREAM)).unwrap();
    let handle = h.manager.registry().get(&id).unwrap();
    h.hub.send(STREAM, video(0, true));
    wait_for("recording", || handle.state() == SessionState::Recording).await;

    let err = h.manager.start(StartRequest::new(STREAM)).unwrap_err();
    assert!(matches!(err, Error::DuplicateSession { ref id } if id == "live/cam/hls"));
    assert!(!handle.stop_requested());
    assert_eq!(h.manager.list().len(), 1);

    h.manager.shutdown().await;
    assert_eq!(handle.state(), SessionState::Stopped);
}

#[tokio::test]
async fn test_closed_stream_ends_session() {
    let h = TestHarness::new();
    h.hub.publish(STREAM, Tracks::audio_only(AudioCodec::Aac));

    let id = h.manager.start(StartRequest::new(STREAM)).unwrap();
    let handle = h.manager.registry().get(&id).unwrap();
    h.hub.send(STREAM, audio(0));
    wait_for("recording", || handle.state() == SessionState::Recording).await;

    h.hub.close(STREAM);
    wait_for("session exit", || h.manager.registry().is_empty()).await;

    let parsed = parse_file(h.base().join(STREAM).join("20240105.m3u8")).unwrap();
    assert_eq!(parsed.playlist.segments.len(), 1);
    assert_eq!(parsed.playlist.segments[0].duration, 1.0);
}

#[tokio::test]
async fn test_stalled_session_is_stopped() {
    let h = TestHarness::with_fragment(Duration::from_millis(50));
    h.hub.publish(STREAM, av_tracks());

    let id = h.manager.start(StartRequest::new(STREAM)).unwrap();
    let handle = h.manager.registry().get(&id).unwrap();
    h.hub.send(STREAM, video(0, true));
    wait_for("recording", || handle.state() == SessionState::Recording).await;

    // Wall time moves on while the stream sends nothing that could cut.
    h.clock.advance_secs(10);
    wait_for("stall stop", || handle.stop_requested()).await;
    wait_for("session exit", || h.manager.registry().is_empty()).await;

    assert_eq!(handle.state(), SessionState::Stopped);
    let parsed = parse_file(h.base().join(STREAM).join("20240105.m3u8")).unwrap();
    assert_eq!(parsed.playlist.segments.len(), 1);
}

#[tokio::test]
async fn test_recording_resumes_after_restart() {
    let h = TestHarness::new();
    h.hub.publish(STREAM, av_tracks());

    for round in 0..2i64 {
        let id = h.manager.start(StartRequest::new(STREAM)).unwrap();
        let handle = h.manager.registry().get(&id).unwrap();
        h.hub.send(STREAM, video(0, true));
        wait_for("recording", || handle.state() == SessionState::Recording).await;
        assert_eq!(handle.started_at().unwrap().timestamp(), DAY + round * 60);

        h.manager.stop(&id).unwrap();
        wait_for("session exit", || h.manager.registry().is_empty()).await;
        h.clock.advance_secs(60);
    }

    // Both runs append to the same day playlist; the header is written once.
    let path = h.base().join(STREAM).join("20240105.m3u8");
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.matches("#EXTM3U").count(), 1);

    let starts: Vec<i64> = parse_file(&path)
        .unwrap()
        .playlist
        .segments
        .iter()
        .map(|s| s.start())
        .collect();
    assert_eq!(starts, vec![DAY, DAY + 60]);
}
