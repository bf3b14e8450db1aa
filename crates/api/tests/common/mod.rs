#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alertproxy_api::config::ServerConfig;
use alertproxy_api::extractor::ContextExtractor;
use alertproxy_api::router::build_app_router;
use alertproxy_api::state::AppState;
use alertproxy_core::annotation::ExtractSettings;
use alertproxy_core::channels::ChannelKind;
use alertproxy_core::log::{Direction, LogEntry};
use alertproxy_core::notification::Notification;
use alertproxy_db::{InMemoryJobStore, JobStore};
use alertproxy_events::{
    DeliveryError, HandlebarsRenderer, NotificationRegistry, NotificationSender,
};
use alertproxy_loki::{LogBackend, LokiError, RangeQuery};
use alertproxy_worker::{WorkerConfig, WorkerPool};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// 2024-05-01T12:00:00Z in nanoseconds.
pub const ALERT_START_NS: i64 = 1_714_564_800_000_000_000;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Log backend with a fixed set of lines. Queries containing `"bad"` are
/// rejected as invalid; queries containing `"down"` fail as unreachable.
pub struct FakeBackend {
    lines: Vec<(i64, &'static str)>,
}

#[async_trait]
impl LogBackend for FakeBackend {
    async fn validate_query(&self, query: &str) -> Result<String, LokiError> {
        if query.contains("bad") {
            return Err(LokiError::InvalidQuery {
                status: 400,
                message: "parse error : syntax error: unexpected IDENTIFIER".into(),
            });
        }
        if query.contains("down") {
            return Err(LokiError::ApiError {
                status: 503,
                body: "loki is unavailable".into(),
            });
        }
        Ok(query.trim().to_string())
    }

    async fn query_range(&self, query: &RangeQuery) -> Result<Vec<LogEntry>, LokiError> {
        let filtered = query.query.contains("|=");
        let mut entries: Vec<LogEntry> = self
            .lines
            .iter()
            .filter(|(ts, line)| {
                *ts >= query.start_ns
                    && *ts <= query.end_ns
                    && (!filtered || line.contains("ERROR"))
            })
            .map(|(ts, line)| LogEntry {
                ts_ns: *ts,
                line: line.to_string(),
                stream: BTreeMap::new(),
            })
            .collect();
        entries.sort_by_key(|e| e.ts_ns);
        if query.direction == Direction::Backward {
            entries.reverse();
        }
        entries.truncate(query.limit);
        Ok(entries)
    }
}

pub fn service_logs() -> Vec<(i64, &'static str)> {
    let sec = 1_000_000_000;
    vec![
        (ALERT_START_NS - 40 * sec, "accepting connections"),
        (ALERT_START_NS - 30 * sec, "ERROR upstream reset"),
        (ALERT_START_NS - 20 * sec, "retrying upstream"),
    ]
}

/// Records every notification it is asked to send.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationSender for RecordingSender {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, notification: &Notification) -> Result<bool, DeliveryError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn JobStore>,
    pub sender: Arc<RecordingSender>,
    pub pool: WorkerPool,
}

/// Build the full application router with all middleware layers over an
/// in-memory store, a fake log backend and one recording channel.
pub fn build_test_app() -> TestApp {
    build_test_app_with(ExtractSettings::default(), 16)
}

pub fn build_test_app_with(settings: ExtractSettings, queue_capacity: usize) -> TestApp {
    let config = test_config();
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let sender = Arc::new(RecordingSender::default());

    let mut registry = NotificationRegistry::new(Arc::new(HandlebarsRenderer::new().unwrap()))
        .with_send_timeout(Duration::from_secs(5));
    registry.register(sender.clone(), "webhook");

    let (queue, pool) = WorkerPool::start(
        WorkerConfig {
            concurrency: 2,
            queue_capacity,
            store_retry_attempts: 1,
            store_retry_delay: Duration::from_millis(1),
        },
        Arc::new(registry),
        Arc::clone(&store),
    );

    let backend = Arc::new(FakeBackend {
        lines: service_logs(),
    });
    let extractor = ContextExtractor::new(backend, settings, queue);

    let state = AppState {
        config: Arc::new(config.clone()),
        extractor: Arc::new(extractor),
        store: Arc::clone(&store),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        sender,
        pool,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_raw(app: Router, uri: &str, body: impl Into<Body>) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, json.to_string()).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll the status endpoint until the job leaves `PENDING`/`STARTED`.
pub async fn wait_for_terminal(app: &Router, job_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let response = get(app.clone(), &format!("/api/v1/status/{job_id}")).await;
        let json = body_json(response).await;
        let state = json["data"]["state"].as_str().unwrap_or_default().to_string();
        if state == "SUCCESS" || state == "FAILURE" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish");
}

/// A grafana-style firing webhook carrying `annotations` on its only alert.
pub fn grafana_event(annotations: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "receiver": "alertproxy",
        "status": "firing",
        "groupLabels": {"alertname": "UpstreamResets"},
        "commonLabels": {"alertname": "UpstreamResets", "service": "gateway"},
        "commonAnnotations": {"summary": "upstream connections reset"},
        "externalURL": "http://grafana.local",
        "version": "1",
        "alerts": [{
            "status": "firing",
            "labels": {"alertname": "UpstreamResets"},
            "annotations": annotations,
            "startsAt": "2024-05-01T12:00:00Z",
            "fingerprint": "5c1f"
        }]
    })
}
