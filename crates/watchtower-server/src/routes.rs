//! Route configuration for the aggregator API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    get_alert_config, health_check, ingest_metric, latest_metrics, list_alerts, query_metrics,
    summarize_hosts, update_alert_config,
};
use crate::state::AppState;

/// Create the aggregator API router.
///
/// Read endpoints allow any origin so browser dashboards can poll them
/// directly; ingest and health do not carry CORS headers.
pub fn create_router(state: Arc<AppState>) -> Router {
    let read_routes = Router::new()
        .route("/query", get(query_metrics))
        .route("/latest", get(latest_metrics))
        .route("/summary", get(summarize_hosts))
        .route("/alerts", get(list_alerts))
        .route(
            "/alerts/config",
            get(get_alert_config).post(update_alert_config),
        )
        .layer(build_cors_layer());

    Router::new()
        .route("/metrics", post(ingest_metric))
        .route("/health", get(health_check))
        .merge(read_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use watchtower_store::{Metric, TimeSeriesStore, now_nanos};

    use crate::alerts::AlertThresholds;

    const SECOND: i64 = 1_000_000_000;

    fn make_test_state() -> Arc<AppState> {
        Arc::new(AppState::with_store(
            TimeSeriesStore::default(),
            AlertThresholds::default(),
        ))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_request(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    mod ingest_tests {
        use super::*;

        #[tokio::test]
        async fn test_post_metric() {
            let state = make_test_state();
            let app = create_router(state.clone());

            let body = r#"{"hostname":"web-01","timestamp":1000,"cpu_usage":12.5,
                "memory_usage":40.0,"disk_usage":55.0,"disk_io_read":4096}"#;
            let (status, json) = send(app, post_request("/metrics", body)).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(json, serde_json::json!({"status": "ok"}));

            let latest = state.store().latest("web-01").unwrap();
            assert_eq!(latest.timestamp, 1000);
            assert_eq!(latest.disk_io_read, 4096);
        }

        #[tokio::test]
        async fn test_post_partial_metric_zeroes_missing_readings() {
            let state = make_test_state();
            let app = create_router(state.clone());

            let (status, _) =
                send(app, post_request("/metrics", r#"{"hostname":"h","timestamp":5}"#)).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(state.store().latest("h"), Some(Metric::new("h", 5)));
        }

        #[tokio::test]
        async fn test_post_ignores_data_after_metric() {
            let state = make_test_state();
            let app = create_router(state.clone());

            let body = r#"{"hostname":"h","timestamp":5,"cpu_usage":1.0,"memory_usage":2.0,
                "disk_usage":3.0,"disk_io_read":4}{"x":1}"#;
            let (status, _) = send(app, post_request("/metrics", body)).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(state.store().series_len("h"), 1);
        }

        #[tokio::test]
        async fn test_post_missing_hostname() {
            let state = make_test_state();
            let app = create_router(state.clone());

            let (status, _) = send(app, post_request("/metrics", r#"{"timestamp":5}"#)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(state.store().is_empty());
        }

        #[tokio::test]
        async fn test_post_without_content_type() {
            let state = make_test_state();
            let app = create_router(state.clone());

            let request = Request::builder()
                .method("POST")
                .uri("/metrics")
                .body(Body::from(
                    serde_json::to_vec(&Metric::new("bare", 7)).unwrap(),
                ))
                .unwrap();
            let (status, _) = send(app, request).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(state.store().series_len("bare"), 1);
        }

        #[tokio::test]
        async fn test_post_malformed_json() {
            let state = make_test_state();
            let app = create_router(state.clone());

            let (status, json) = send(app, post_request("/metrics", "{not json")).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "invalid_request");
            assert!(state.store().is_empty());
        }

        #[tokio::test]
        async fn test_post_wrong_field_type() {
            let app = create_router(make_test_state());

            let body = r#"{"hostname":"h","timestamp":"soon","cpu_usage":1,
                "memory_usage":1,"disk_usage":1,"disk_io_read":1}"#;
            let (status, _) = send(app, post_request("/metrics", body)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        #[tokio::test]
        async fn test_post_empty_hostname() {
            let state = make_test_state();
            let app = create_router(state.clone());

            let body = serde_json::to_vec(&Metric::new("", 1)).unwrap();
            let (status, json) = send(app, post_request("/metrics", body)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(json["message"].as_str().unwrap().contains("hostname"));
            assert!(state.store().is_empty());
        }

        #[tokio::test]
        async fn test_get_metrics_not_allowed() {
            let app = create_router(make_test_state());

            let (status, _) = send(app, get_request("/metrics")).await;

            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        }
    }

    mod query_tests {
        use super::*;

        fn seeded_state() -> Arc<AppState> {
            let state = make_test_state();
            let now = now_nanos();
            let store = state.store();
            store.insert(Metric::new("a", now - 20 * SECOND).with_cpu(10.0)).unwrap();
            store.insert(Metric::new("a", now - 10 * SECOND).with_cpu(20.0)).unwrap();
            store.insert(Metric::new("b", now - 15 * SECOND).with_cpu(50.0)).unwrap();
            // Two hours old: outside the default window
            store.insert(Metric::new("stale", now - 7_200 * SECOND)).unwrap();
            state
        }

        #[tokio::test]
        async fn test_query_single_host() {
            let app = create_router(seeded_state());

            let (status, json) = send(app, get_request("/query?hostname=a")).await;

            assert_eq!(status, StatusCode::OK);
            let series = json.as_array().unwrap();
            assert_eq!(series.len(), 2);
            assert_eq!(series[0]["cpu_usage"], 10.0);
            assert_eq!(series[1]["cpu_usage"], 20.0);
        }

        #[tokio::test]
        async fn test_query_unknown_host_is_empty_array() {
            let app = create_router(seeded_state());

            let (status, json) = send(app, get_request("/query?hostname=nohost")).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(json, serde_json::json!([]));
        }

        #[tokio::test]
        async fn test_query_all_hosts_omits_empty() {
            let app = create_router(seeded_state());

            let (status, json) = send(app, get_request("/query")).await;

            assert_eq!(status, StatusCode::OK);
            let map = json.as_object().unwrap();
            assert_eq!(map.len(), 2);
            assert_eq!(map["a"].as_array().unwrap().len(), 2);
            assert_eq!(map["b"].as_array().unwrap().len(), 1);
            assert!(!map.contains_key("stale"));
        }

        #[tokio::test]
        async fn test_query_stale_host_single_vs_all() {
            let state = seeded_state();

            let (_, single) = send(
                create_router(state.clone()),
                get_request("/query?hostname=stale"),
            )
            .await;
            let (_, all) = send(create_router(state), get_request("/query?hostname=")).await;

            assert_eq!(single, serde_json::json!([]));
            assert!(all.as_object().unwrap().get("stale").is_none());
        }

        #[tokio::test]
        async fn test_query_wider_window() {
            let app = create_router(seeded_state());

            let (_, json) = send(app, get_request("/query?hours=3")).await;

            assert!(json.as_object().unwrap().contains_key("stale"));
        }

        #[tokio::test]
        async fn test_query_invalid_hours() {
            let app = create_router(seeded_state());

            let (status, json) = send(app, get_request("/query?hours=lots")).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "invalid_request");
        }

        #[tokio::test]
        async fn test_query_zero_hours_is_empty() {
            let app = create_router(seeded_state());

            let (status, json) = send(app, get_request("/query?hours=0")).await;

            assert_eq!(status, StatusCode::OK);
            assert!(json.as_object().unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_latest() {
            let app = create_router(seeded_state());

            let (status, json) = send(app, get_request("/latest")).await;

            assert_eq!(status, StatusCode::OK);
            let map = json.as_object().unwrap();
            assert_eq!(map.len(), 3);
            assert_eq!(map["a"]["cpu_usage"], 20.0);
            assert_eq!(map["b"]["cpu_usage"], 50.0);
        }

        #[tokio::test]
        async fn test_latest_empty_store() {
            let app = create_router(make_test_state());

            let (status, json) = send(app, get_request("/latest")).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(json, serde_json::json!({}));
        }

        #[tokio::test]
        async fn test_summary() {
            let app = create_router(seeded_state());

            let (status, json) = send(app, get_request("/summary")).await;

            assert_eq!(status, StatusCode::OK);
            let map = json.as_object().unwrap();
            assert_eq!(map.len(), 2);
            assert_eq!(map["a"]["samples"], 2);
            assert_eq!(map["a"]["cpu_avg"], 15.0);
            assert_eq!(map["a"]["cpu_max"], 20.0);
        }

        #[tokio::test]
        async fn test_summary_single_host_without_data() {
            let app = create_router(seeded_state());

            let (status, json) = send(app, get_request("/summary?hostname=nohost")).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(json, serde_json::json!({}));
        }
    }

    mod alert_tests {
        use super::*;

        #[tokio::test]
        async fn test_alerts_from_latest() {
            let state = make_test_state();
            state
                .store()
                .insert(Metric::new("hot", 1).with_cpu(95.0).with_disk(20.0))
                .unwrap();
            state
                .store()
                .insert(Metric::new("cool", 1).with_cpu(5.0))
                .unwrap();

            let (status, json) = send(create_router(state), get_request("/alerts")).await;

            assert_eq!(status, StatusCode::OK);
            let alerts = json.as_array().unwrap();
            assert_eq!(alerts.len(), 1);
            assert_eq!(alerts[0]["hostname"], "hot");
            assert_eq!(alerts[0]["type"], "CPU");
        }

        #[tokio::test]
        async fn test_alert_config_round_trip() {
            let state = make_test_state();

            let (status, json) = send(
                create_router(state.clone()),
                post_request("/alerts/config", r#"{"memory": 60.5}"#),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["status"], "ok");
            assert_eq!(json["thresholds"]["memory"], 60.5);
            assert_eq!(json["thresholds"]["cpu"], 80.0);

            let (_, json) = send(create_router(state), get_request("/alerts/config")).await;
            assert_eq!(json, serde_json::json!({"cpu": 80.0, "memory": 60.5, "disk": 90.0}));
        }

        #[tokio::test]
        async fn test_alert_config_malformed() {
            let state = make_test_state();

            let (status, _) = send(
                create_router(state.clone()),
                post_request("/alerts/config", r#"{"cpu": "high"}"#),
            )
            .await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(state.thresholds(), AlertThresholds::default());
        }
    }

    mod misc_tests {
        use super::*;

        #[tokio::test]
        async fn test_health_endpoint() {
            let app = create_router(make_test_state());

            let (status, json) = send(app, get_request("/health")).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["status"], "healthy");
            let time = json["time"].as_str().unwrap();
            assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok());
        }

        #[tokio::test]
        async fn test_cors_on_read_endpoints() {
            for uri in ["/latest", "/query", "/alerts"] {
                let app = create_router(make_test_state());
                let request = Request::builder()
                    .uri(uri)
                    .header("Origin", "http://dashboard.example.com")
                    .body(Body::empty())
                    .unwrap();

                let response = app.oneshot(request).await.unwrap();

                assert_eq!(
                    response.headers()["access-control-allow-origin"],
                    "*",
                    "missing CORS header on {uri}"
                );
            }
        }

        #[tokio::test]
        async fn test_cors_preflight() {
            let app = create_router(make_test_state());

            let request = Request::builder()
                .method("OPTIONS")
                .uri("/query")
                .header("Origin", "http://example.com")
                .header("Access-Control-Request-Method", "GET")
                .body(Body::empty())
                .unwrap();

            let response = app.oneshot(request).await.unwrap();

            assert!(response.status().is_success());
        }

        #[tokio::test]
        async fn test_unknown_endpoint() {
            let app = create_router(make_test_state());

            let (status, _) = send(app, get_request("/unknown")).await;

            assert_eq!(status, StatusCode::NOT_FOUND);
        }
    }
}
