//! REST API handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tracing::{debug, warn};

use nodepulse_model::{Category, NodeSample, SampleEntry};

use crate::extender::{ExtenderArgs, HostPriority};
use crate::{exposition, ApiState};

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Ingest ─────────────────────────────────────────────────────

/// PUT /api/v1/nodes/:id/sample
///
/// A sample that fails to decode is dropped and logged; the agent
/// retries implicitly on its next tick.
pub async fn ingest_sample(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Result<Json<NodeSample>, JsonRejection>,
) -> impl IntoResponse {
    let Json(mut sample) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(node_id = %id, error = %rejection, "dropping undecodable sample");
            return error_response("invalid sample payload", StatusCode::BAD_REQUEST)
                .into_response();
        }
    };

    // The path segment is authoritative for the node identity.
    sample.node_id = id;

    match state.ingest.submit(sample) {
        Ok(()) => (StatusCode::ACCEPTED, ApiResponse::ok("queued")).into_response(),
        Err(e) => {
            warn!(error = %e, "ingest pipeline unavailable");
            error_response("ingest pipeline unavailable", StatusCode::SERVICE_UNAVAILABLE)
                .into_response()
        }
    }
}

// ── Scheduler extender ─────────────────────────────────────────

/// POST /api/v1/extender/prioritize
///
/// An unparsable body is not a server error: the extender contract
/// treats "no scheduling opinion" (an empty priority list) as a
/// successful answer, so the scheduler carries on without us. The body
/// is taken as raw bytes so even invalid UTF-8 lands here instead of
/// being rejected by an extractor.
pub async fn prioritize(
    State(state): State<ApiState>,
    body: axum::body::Bytes,
) -> Json<Vec<HostPriority>> {
    let args: ExtenderArgs = match serde_json::from_slice(&body) {
        Ok(args) => args,
        Err(e) => {
            warn!(error = %e, "undecodable prioritize request, answering with no opinion");
            return Json(Vec::new());
        }
    };

    let mut priorities = Vec::new();
    for name in args.candidate_names() {
        // Unknown and empty records score 0 — absence is
        // indistinguishable from known-unhealthy by design.
        let score = match state.store.latest(&name).await {
            Some(entry) => state.scoring.composite(&entry) as i64,
            None => 0,
        };
        priorities.push(HostPriority { host: name, score });
    }

    debug!(candidates = priorities.len(), "prioritize answered");
    Json(priorities)
}

// ── Weight admin ───────────────────────────────────────────────

/// PUT /api/v1/scoring/:category/:weight
///
/// `category` is a numeric id (0 = cpu, 1 = memory, 2 = disk,
/// 3 = network); `weight` must fit `[0, i32::MAX]`. Invalid input is
/// rejected without touching the engine.
pub async fn set_weight(
    State(state): State<ApiState>,
    Path((category, weight)): Path<(u8, i64)>,
) -> impl IntoResponse {
    let Some(category) = Category::from_wire_id(category) else {
        return error_response("unknown category", StatusCode::BAD_REQUEST).into_response();
    };
    if weight < 0 || weight > i32::MAX as i64 {
        return error_response("weight out of range", StatusCode::BAD_REQUEST).into_response();
    }

    state.scoring.set_extra_weight(category, weight as i32);
    debug!(category = category.name(), weight, "extra weight updated");
    ApiResponse::ok("updated").into_response()
}

// ── Node listing ───────────────────────────────────────────────

/// One node's latest state as exposed over the listing endpoint.
#[derive(Serialize)]
pub struct NodeSummary {
    pub node_id: String,
    pub score: f64,
    pub downtime_ms: u64,
    pub latest: SampleEntry,
}

/// GET /api/v1/nodes
pub async fn list_nodes(State(state): State<ApiState>) -> impl IntoResponse {
    let mut summaries: Vec<NodeSummary> = state
        .store
        .all_latest()
        .await
        .into_iter()
        .map(|(entry, downtime_ms)| NodeSummary {
            node_id: entry.raw.node_id.clone(),
            score: state.scoring.composite(&entry),
            downtime_ms,
            latest: entry,
        })
        .collect();
    summaries.sort_by(|a, b| a.node_id.cmp(&b.node_id));
    ApiResponse::ok(summaries)
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let nodes = state.store.all_latest().await;
    let body = exposition::render(&state.scoring, &nodes);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tokio::sync::watch;
    use tower::ServiceExt;

    use nodepulse_ingest::{apply_sample, IngestConfig};
    use nodepulse_model::{CpuSample, MemorySample, NodeSample};
    use nodepulse_scoring::ScoringEngine;
    use nodepulse_store::RecordStore;

    use crate::build_router;
    use crate::extender::HostPriority;

    struct TestHarness {
        router: axum::Router,
        store: RecordStore,
        _shutdown: watch::Sender<bool>,
    }

    fn harness() -> TestHarness {
        let store = RecordStore::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ingest, _task) =
            nodepulse_ingest::start(store.clone(), IngestConfig::default(), shutdown_rx);
        let scoring = Arc::new(ScoringEngine::default());
        TestHarness {
            router: build_router(store.clone(), ingest, scoring),
            store,
            _shutdown: shutdown_tx,
        }
    }

    fn sample(node_id: &str, timestamp_ms: u64, idle: u64) -> NodeSample {
        NodeSample {
            node_id: node_id.to_string(),
            timestamp_ms,
            cpu: CpuSample {
                valid: true,
                user: 10,
                system: 10,
                idle,
            },
            memory: MemorySample {
                valid: true,
                total: 100,
                used: 40,
                cached: 0,
                free: 60,
            },
            ..Default::default()
        }
    }

    async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unknown_node_scores_zero() {
        let h = harness();

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/extender/prioritize")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"NodeNames": ["node-x"]}"#))
            .unwrap();

        let resp = h.router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let priorities: Vec<HostPriority> = body_json(resp).await;
        assert_eq!(
            priorities,
            vec![HostPriority {
                host: "node-x".into(),
                score: 0
            }]
        );
    }

    #[tokio::test]
    async fn malformed_prioritize_answers_empty_list_with_success() {
        let h = harness();

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/extender/prioritize")
            .header("content-type", "application/json")
            .body(Body::from("this is not json"))
            .unwrap();

        let resp = h.router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let priorities: Vec<HostPriority> = body_json(resp).await;
        assert!(priorities.is_empty());
    }

    #[tokio::test]
    async fn non_utf8_prioritize_answers_empty_list_with_success() {
        let h = harness();

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/extender/prioritize")
            .header("content-type", "application/json")
            .body(Body::from(vec![0xff, 0xfe, 0x00, 0x80]))
            .unwrap();

        let resp = h.router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let priorities: Vec<HostPriority> = body_json(resp).await;
        assert!(priorities.is_empty());
    }

    #[tokio::test]
    async fn prioritize_preserves_candidate_order() {
        let h = harness();
        let config = IngestConfig::default();
        apply_sample(&h.store, &config, sample("node-b", 1000, 80)).await;

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/extender/prioritize")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"Nodes": {"items": [
                    {"metadata": {"name": "node-a"}},
                    {"metadata": {"name": "node-b"}}
                ]}}"#,
            ))
            .unwrap();

        let resp = h.router.oneshot(req).await.unwrap();
        let priorities: Vec<HostPriority> = body_json(resp).await;
        assert_eq!(priorities.len(), 2);
        assert_eq!(priorities[0].host, "node-a");
        assert_eq!(priorities[0].score, 0);
        assert_eq!(priorities[1].host, "node-b");
        // idle 80 of 100 ticks and 60% memory free, both fully trusted:
        // (80 + 60) / 2 = 70.
        assert_eq!(priorities[1].score, 70);
    }

    #[tokio::test]
    async fn ingest_round_trips_through_the_pipeline() {
        let h = harness();

        let body = serde_json::to_string(&sample("ignored", 1000, 80)).unwrap();
        let req = Request::builder()
            .method("PUT")
            .uri("/api/v1/nodes/node-a/sample")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let resp = h.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        // The consumer applies the sample asynchronously.
        for _ in 0..100 {
            if h.store.latest("node-a").await.is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let entry = h.store.latest("node-a").await.expect("sample applied");
        // The path segment wins over the body's node_id.
        assert_eq!(entry.raw.node_id, "node-a");
    }

    #[tokio::test]
    async fn undecodable_sample_is_rejected() {
        let h = harness();

        let req = Request::builder()
            .method("PUT")
            .uri("/api/v1/nodes/node-a/sample")
            .header("content-type", "application/json")
            .body(Body::from("{\"nope\": true}"))
            .unwrap();

        let resp = h.router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn weight_admin_validates_and_applies() {
        let h = harness();

        // Unknown category.
        let resp = h
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/scoring/9/50")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Negative weight.
        let resp = h
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/scoring/0/-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Valid update.
        let resp = h
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/scoring/1/200")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn node_listing_and_metrics_reflect_state() {
        let h = harness();
        let config = IngestConfig::default();
        apply_sample(&h.store, &config, sample("node-a", 1000, 80)).await;
        apply_sample(&h.store, &config, sample("node-a", 11_000, 80)).await;

        let resp = h
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/nodes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let listing: serde_json::Value = body_json(resp).await;
        let nodes = listing["data"].as_array().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0]["node_id"], "node-a");
        assert_eq!(nodes[0]["downtime_ms"], 10_000);

        let resp = h
            .router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("nodepulse_node_score{node=\"node-a\"}"));
        assert!(text.contains("nodepulse_node_downtime_seconds{node=\"node-a\"} 10.00"));
    }
}
