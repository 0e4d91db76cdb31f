//! API integration tests
//!
//! Tests for HTTP API endpoints using axum's test utilities.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::{context_without_recorder, wait_for, write_day_playlist, TestHarness};
use hlsvault::server::create_router;
use hlsvault_common::{AudioCodec, VideoCodec};
use hlsvault_media::Tracks;
use http_body_util::BodyExt;
use tempfile::tempdir;
use tower::ServiceExt;

/// Helper to get response body as string
async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_string(response.into_body()).await)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempdir().unwrap();
    let app = create_router(context_without_recorder(dir.path()));

    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["recording_enabled"], false);
}

#[tokio::test]
async fn test_recording_endpoints_unavailable_without_recorder() {
    let dir = tempdir().unwrap();
    let app = create_router(context_without_recorder(dir.path()));

    for uri in [
        "/api/start?streamPath=live/cam",
        "/api/stop?id=live/cam/hls",
        "/api/list/recording",
    ] {
        let (status, json) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
        assert_eq!(json["code"], "configuration_error");
    }

    // Listing and VOD keep working.
    let (status, json) = get_json(&app, "/api/list").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn test_start_list_stop() {
    let h = TestHarness::new();
    h.hub.publish("live/cam", Tracks::video(VideoCodec::H264, Some(AudioCodec::Aac)));
    let app = create_router(h.context());

    let (status, json) = get_json(&app, "/api/start?streamPath=live/cam&type=hls&fragment=2s").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "live/cam/hls");

    let handle = h.manager.registry().get("live/cam/hls").unwrap();
    wait_for("tracks", || handle.tracks().is_some()).await;

    let (status, json) = get_json(&app, "/api/list/recording").await;
    assert_eq!(status, StatusCode::OK);
    let sessions = json.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["stream_path"], "live/cam");
    assert_eq!(sessions[0]["fragment_secs"], 2.0);
    assert_eq!(sessions[0]["state"], "starting");
    assert_eq!(sessions[0]["tracks"]["video"], "h264");
    assert_eq!(sessions[0]["tracks"]["audio"], "aac");

    let (status, body) = get(&app, "/api/stop?id=live/cam/hls").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    h.manager.shutdown().await;
}

#[tokio::test]
async fn test_start_rejects_bad_parameters() {
    let h = TestHarness::new();
    let app = create_router(h.context());

    let (status, json) = get_json(&app, "/api/start").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "validation_error");

    let (status, _) = get_json(&app, "/api/start?streamPath=live/cam&type=flv").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/api/start?streamPath=live/cam&fragment=soon").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/api/start?streamPath=../etc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(h.manager.list().is_empty());
}

#[tokio::test]
async fn test_stop_unknown_session() {
    let h = TestHarness::new();
    let app = create_router(h.context());

    let (status, json) = get_json(&app, "/api/stop?id=live/none/hls").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn test_list_recordings() {
    let dir = tempdir().unwrap();
    write_day_playlist(&dir.path().join("live/cam"), "19700102", &[(86_400, 4.0), (86_404, 6.0)]);
    let app = create_router(context_without_recorder(dir.path()));

    let (status, json) = get_json(&app, "/api/list?type=hls").await;
    assert_eq!(status, StatusCode::OK);
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["path"], "live/cam/19700102.m3u8");
    assert_eq!(entries[0]["duration"], 10.0);
}

#[tokio::test]
async fn test_vod_playlist_is_served() {
    let dir = tempdir().unwrap();
    let stream_dir = dir.path().join("live/cam");
    write_day_playlist(&stream_dir, "19700101", &[(86_380, 10.0), (86_390, 10.0)]);
    write_day_playlist(&stream_dir, "19700102", &[(86_400, 10.0), (86_410, 10.0)]);
    let app = create_router(context_without_recorder(dir.path()));

    let (status, json) = get_json(&app, "/api/vod/hls?st=86390&et=86410&path=live/cam").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["url"], "/record/live/cam/vod/86390-86410.m3u8");
    assert_eq!(json["playlist_path"], "live/cam/vod/86390-86410.m3u8");
    assert_eq!(json["start_time"], 86_390);
    assert_eq!(json["end_time"], 86_410);

    let (status, body) = get(&app, "/record/live/cam/vod/86390-86410.m3u8").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("../day/86390.ts"));
    assert!(body.contains("../day/86400.ts"));
    assert!(body.ends_with("#EXT-X-ENDLIST\n"));
}

#[tokio::test]
async fn test_vod_errors() {
    let dir = tempdir().unwrap();
    write_day_playlist(&dir.path().join("live/cam"), "19700102", &[(86_400, 10.0)]);
    let app = create_router(context_without_recorder(dir.path()));

    let (status, _) = get_json(&app, "/api/vod/hls?st=abc&et=86410&path=live/cam").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/api/vod/hls?st=86410&et=86400&path=live/cam").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = get_json(&app, "/api/vod/hls?st=0&et=100&path=live/cam").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "not_found");

    let (status, _) = get_json(&app, "/api/vod/hls?st=0&et=100&path=live/none").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
