//! HTTP request handlers for the aggregator API.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use watchtower_store::{HostSummary, Metric, TimeWindow, summarize};

use crate::alerts::{self, Alert, AlertThresholds, ThresholdUpdate};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Default look-back for `/query` and `/summary`.
const DEFAULT_HOURS: i64 = 1;

/// Query parameters for windowed reads.
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    /// Restrict to one host. An empty value means "all hosts".
    pub hostname: Option<String>,
    /// Look-back in whole hours. Defaults to 1.
    pub hours: Option<String>,
}

impl WindowQuery {
    fn host(&self) -> Option<&str> {
        self.hostname.as_deref().filter(|h| !h.is_empty())
    }

    fn window(&self) -> ServerResult<TimeWindow> {
        let hours = match self.hours.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_HOURS,
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                ServerError::InvalidRequest(format!("hours must be an integer, got {raw:?}"))
            })?,
        };
        Ok(TimeWindow::last_hours(hours))
    }
}

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always `"ok"`.
    pub status: &'static str,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"`.
    pub status: &'static str,
    /// Current server time, RFC 3339.
    pub time: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
}

/// Body of `/query`: a bare series for one host, or a map for all hosts.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    /// Metrics for the requested host, possibly empty.
    Host(Vec<Metric>),
    /// Metrics per host; hosts without data in the window are absent.
    All(HashMap<String, Vec<Metric>>),
}

/// Body of `POST /alerts/config`.
#[derive(Debug, Serialize)]
pub struct ThresholdsResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Thresholds after the update.
    pub thresholds: AlertThresholds,
}

/// Handle POST /metrics - ingest one metric.
///
/// The body is parsed as JSON whatever its content-type. Only the first JSON
/// value is read; anything after it is ignored.
pub async fn ingest_metric(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ServerResult<Json<StatusResponse>> {
    let metric = decode_first::<Metric>(&body)?;
    state.store().insert(metric)?;
    Ok(Json(StatusResponse { status: "ok" }))
}

fn decode_first<T: serde::de::DeserializeOwned>(body: &[u8]) -> ServerResult<T> {
    serde_json::Deserializer::from_slice(body)
        .into_iter::<T>()
        .next()
        .ok_or_else(|| ServerError::InvalidRequest("empty request body".to_string()))?
        .map_err(ServerError::from)
}

/// Handle GET /query - metrics inside `[now - hours, now)`.
pub async fn query_metrics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> ServerResult<Json<QueryResponse>> {
    let window = params.window()?;

    let response = match params.host() {
        Some(host) => QueryResponse::Host(state.store().query(host, window)),
        None => QueryResponse::All(state.store().query_all(window)),
    };
    Ok(Json(response))
}

/// Handle GET /latest - last received metric per host.
pub async fn latest_metrics(State(state): State<Arc<AppState>>) -> Json<HashMap<String, Metric>> {
    Json(state.store().all_latest())
}

/// Handle GET /summary - per-host digest over the window.
pub async fn summarize_hosts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> ServerResult<Json<HashMap<String, HostSummary>>> {
    let window = params.window()?;

    let series = match params.host() {
        Some(host) => HashMap::from([(host.to_string(), state.store().query(host, window))]),
        None => state.store().query_all(window),
    };

    let summaries = series
        .into_iter()
        .filter_map(|(host, series)| summarize(&series).map(|s| (host, s)))
        .collect();
    Ok(Json(summaries))
}

/// Handle GET /alerts - current threshold violations.
pub async fn list_alerts(State(state): State<Arc<AppState>>) -> Json<Vec<Alert>> {
    let latest = state.store().all_latest();
    let alerts = alerts::evaluate(&latest, &state.thresholds(), Utc::now());
    Json(alerts)
}

/// Handle GET /alerts/config - current thresholds.
pub async fn get_alert_config(State(state): State<Arc<AppState>>) -> Json<AlertThresholds> {
    Json(state.thresholds())
}

/// Handle POST /alerts/config - partial threshold update.
pub async fn update_alert_config(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ServerResult<Json<ThresholdsResponse>> {
    let update: ThresholdUpdate = serde_json::from_slice(&body)?;
    let thresholds = state.update_thresholds(update);

    debug!(
        cpu = thresholds.cpu,
        memory = thresholds.memory,
        disk = thresholds.disk,
        "alert thresholds updated"
    );

    Ok(Json(ThresholdsResponse {
        status: "ok",
        thresholds,
    }))
}

/// Handle GET /health - liveness probe.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        uptime_secs: state.uptime_secs(),
    })
}
