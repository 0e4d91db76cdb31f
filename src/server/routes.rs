use crate::recorder::StartRequest;
use crate::recordings;
use crate::server::error::AppError;
use crate::server::{AppContext, RECORD_MOUNT};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use hlsvault_common::{Error, Format, Result};
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/start", get(start_recording))
        .route("/stop", get(stop_recording))
        .route("/list", get(list_recordings))
        .route("/list/recording", get(list_recording))
        .route("/vod/hls", get(vod_hls))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartQuery {
    stream_path: Option<String>,
    #[serde(rename = "type")]
    format: Option<String>,
    fragment: Option<String>,
    file_name: Option<String>,
    append: Option<String>,
}

async fn start_recording(
    State(ctx): State<AppContext>,
    Query(params): Query<StartQuery>,
) -> std::result::Result<impl IntoResponse, AppError> {
    let recorder = ctx.recorder()?;

    let stream_path = non_empty(params.stream_path)
        .ok_or_else(|| Error::validation("no streamPath"))?;
    let mut request = StartRequest::new(stream_path);
    if let Some(format) = non_empty(params.format) {
        request.format = format.parse()?;
    }
    if let Some(fragment) = non_empty(params.fragment) {
        request.fragment = Some(parse_fragment(&fragment)?);
    }
    request.file_name = non_empty(params.file_name);
    request.append = non_empty(params.append).is_some();

    let id = recorder.start(request)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

#[derive(Deserialize)]
struct StopQuery {
    id: Option<String>,
}

async fn stop_recording(
    State(ctx): State<AppContext>,
    Query(params): Query<StopQuery>,
) -> std::result::Result<impl IntoResponse, AppError> {
    let recorder = ctx.recorder()?;
    let id = non_empty(params.id).ok_or_else(|| Error::validation("no id"))?;
    recorder.stop(&id)?;
    Ok("ok")
}

async fn list_recording(
    State(ctx): State<AppContext>,
) -> std::result::Result<impl IntoResponse, AppError> {
    Ok(Json(ctx.recorder()?.list()))
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(rename = "type")]
    format: Option<String>,
}

async fn list_recordings(
    State(ctx): State<AppContext>,
    Query(params): Query<ListQuery>,
) -> std::result::Result<impl IntoResponse, AppError> {
    let format = non_empty(params.format)
        .map(|f| f.parse::<Format>())
        .transpose()?;
    let base = ctx.base_path.clone();

    let entries = tokio::task::spawn_blocking(move || recordings::tree(&base, format))
        .await
        .map_err(|e| Error::internal(format!("listing task failed: {e}")))??;
    Ok(Json(entries))
}

#[derive(Deserialize)]
struct VodQuery {
    st: Option<String>,
    et: Option<String>,
    path: Option<String>,
}

async fn vod_hls(
    State(ctx): State<AppContext>,
    Query(params): Query<VodQuery>,
) -> std::result::Result<impl IntoResponse, AppError> {
    let start = parse_unix("st", params.st)?;
    let end = parse_unix("et", params.et)?;
    let stream_path = non_empty(params.path).ok_or_else(|| Error::validation("no path"))?;

    let composer = ctx.vod.clone();
    let vod = tokio::task::spawn_blocking(move || composer.compose(&stream_path, start, end))
        .await
        .map_err(|e| Error::internal(format!("vod task failed: {e}")))??;
    let relative = vod.relative_path(ctx.vod.base_path());

    Ok(Json(serde_json::json!({
        "url": format!("{RECORD_MOUNT}/{relative}"),
        "playlist_path": relative,
        "start_time": vod.start_time,
        "end_time": vod.end_time,
    })))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_unix(name: &str, value: Option<String>) -> Result<i64> {
    let value = non_empty(value).ok_or_else(|| Error::validation(format!("no {name}")))?;
    value
        .trim()
        .parse()
        .map_err(|_| Error::validation(format!("{name} must be a unix timestamp: {value:?}")))
}

/// Parse a fragment length such as `10`, `10s`, `500ms` or `1m30s`.
///
/// A bare number is taken as seconds.
pub fn parse_fragment(value: &str) -> Result<Duration> {
    let value = value.trim();
    let invalid = || Error::validation(format!("invalid fragment: {value:?}"));

    if let Ok(secs) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).map_err(|_| invalid());
    }

    let shape = Regex::new(r"^(?:\d+(?:\.\d+)?(?:ms|h|m|s))+$")
        .map_err(|e| Error::internal(e.to_string()))?;
    if !shape.is_match(value) {
        return Err(invalid());
    }

    let part = Regex::new(r"(\d+(?:\.\d+)?)(ms|h|m|s)").map_err(|e| Error::internal(e.to_string()))?;
    let mut total = 0.0;
    for caps in part.captures_iter(value) {
        let amount: f64 = caps[1].parse().map_err(|_| invalid())?;
        total += match &caps[2] {
            "ms" => amount / 1000.0,
            "m" => amount * 60.0,
            "h" => amount * 3600.0,
            _ => amount,
        };
    }

    Duration::try_from_secs_f64(total).map_err(|_| invalid())
}
