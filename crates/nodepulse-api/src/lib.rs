//! nodepulse-api — REST surface of the aggregator.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | PUT | `/api/v1/nodes/{id}/sample` | Ingest one node sample |
//! | GET | `/api/v1/nodes` | Latest sample + score per node |
//! | POST | `/api/v1/extender/prioritize` | Scheduler-extender prioritize verb |
//! | PUT | `/api/v1/scoring/{category}/{weight}` | Retune a category's extra weight |
//! | GET | `/metrics` | Prometheus exposition |

pub mod exposition;
pub mod extender;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use nodepulse_ingest::IngestHandle;
use nodepulse_scoring::ScoringEngine;
use nodepulse_store::RecordStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: RecordStore,
    pub ingest: IngestHandle,
    pub scoring: Arc<ScoringEngine>,
}

/// Build the complete aggregator router.
pub fn build_router(store: RecordStore, ingest: IngestHandle, scoring: Arc<ScoringEngine>) -> Router {
    let state = ApiState {
        store,
        ingest,
        scoring,
    };

    let api_routes = Router::new()
        .route("/nodes", get(handlers::list_nodes))
        .route("/nodes/{id}/sample", put(handlers::ingest_sample))
        .route("/extender/prioritize", post(handlers::prioritize))
        .route("/scoring/{category}/{weight}", put(handlers::set_weight))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::prometheus_metrics).with_state(state))
}
