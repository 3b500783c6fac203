//! HTTP API tests against a server bound to a real socket.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use watchtower_server::{AggregatorServer, Alert, AlertKind, ServerConfig, ServerResult};
use watchtower_store::{Metric, now_nanos};

const SECOND: i64 = 1_000_000_000;

struct TestServer {
    server: AggregatorServer,
    base: String,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<ServerResult<()>>,
}

impl TestServer {
    async fn start(config: ServerConfig) -> Self {
        let server = AggregatorServer::new(config);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();

        let serving = server.clone();
        let handle = tokio::spawn(async move {
            serving
                .serve_listener(listener, async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        Self {
            server,
            base: format!("http://{addr}"),
            shutdown,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn ingest_from_many_agents_then_read_back() {
    let server = TestServer::start(ServerConfig::default()).await;
    let client = reqwest::Client::new();
    let now = now_nanos();

    let mut pushes = Vec::new();
    for host in 0..8 {
        for i in 0..10_i64 {
            let client = client.clone();
            let url = server.url("/metrics");
            let metric = Metric::new(format!("host-{host}"), now - (10 - i) * SECOND)
                .with_cpu(f64::from(host) * 10.0)
                .with_disk_io_read(i * 4096);
            pushes.push(tokio::spawn(async move {
                client.post(url).json(&metric).send().await.unwrap().status()
            }));
        }
    }
    for push in pushes {
        assert!(push.await.unwrap().is_success());
    }

    let all: HashMap<String, Vec<Metric>> = client
        .get(server.url("/query"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 8);
    assert!(all.values().all(|series| series.len() == 10));

    let one: Vec<Metric> = client
        .get(server.url("/query?hostname=host-3&hours=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(one.len(), 10);
    assert!(one.iter().all(|m| m.hostname == "host-3"));

    let latest: HashMap<String, Metric> = client
        .get(server.url("/latest"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(latest.len(), 8);
    assert_eq!(server.server.store().total_points(), 80);

    server.stop().await;
}

#[tokio::test]
async fn alerts_follow_threshold_updates() {
    let server = TestServer::start(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let metric = Metric::new("db-01", now_nanos())
        .with_cpu(70.0)
        .with_memory(60.0)
        .with_disk(50.0);
    client
        .post(server.url("/metrics"))
        .json(&metric)
        .send()
        .await
        .unwrap();

    let alerts: Vec<Alert> = client
        .get(server.url("/alerts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(alerts.is_empty());

    let response = client
        .post(server.url("/alerts/config"))
        .body(r#"{"cpu": 65.0, "disk": 40.0}"#)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let alerts: Vec<Alert> = client
        .get(server.url("/alerts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let kinds: Vec<AlertKind> = alerts.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AlertKind::Cpu, AlertKind::Disk]);
    assert!(alerts.iter().all(|a| a.hostname == "db-01"));

    server.stop().await;
}

#[tokio::test]
async fn read_endpoints_allow_any_origin() {
    let server = TestServer::start(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(server.url("/latest"))
        .header("Origin", "http://dashboard.local")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );

    server.stop().await;
}

#[tokio::test]
async fn method_and_body_errors() {
    let server = TestServer::start(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let response = client.get(server.url("/metrics")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

    let response = client
        .post(server.url("/metrics"))
        .body("hostname=web-01")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = client
        .get(server.url("/query?hours=one"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn series_cap_applies_to_ingest() {
    let server = TestServer::start(ServerConfig::default().with_max_series_len(3)).await;
    let client = reqwest::Client::new();
    let now = now_nanos();

    for i in 0..5 {
        client
            .post(server.url("/metrics"))
            .json(&Metric::new("capped", now - (5 - i) * SECOND).with_disk_io_read(i))
            .send()
            .await
            .unwrap();
    }

    let series: Vec<Metric> = client
        .get(server.url("/query?hostname=capped"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let counters: Vec<i64> = series.iter().map(|m| m.disk_io_read).collect();
    assert_eq!(counters, vec![2, 3, 4]);

    server.stop().await;
}

#[tokio::test]
async fn health_reports_time() {
    let server = TestServer::start(
        ServerConfig::default().with_sweep_interval(Duration::from_secs(60)),
    )
    .await;

    let body: serde_json::Value = reqwest::get(server.url("/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "healthy");
    assert!(body["time"].as_str().unwrap().ends_with('Z'));

    server.stop().await;
}
