//! plantdb REST API
//!
//! HTTP API over the catalog, store and aligner, built with Axum.
//! Store calls are synchronous and run on the blocking thread pool.
//!
//! # Endpoints
//!
//! ## Series
//! - `GET /api/v1/series` - List all series
//! - `GET /api/v1/series/:id` - Get a series descriptor
//! - `DELETE /api/v1/series/:id` - Delete a series and its records
//! - `GET /api/v1/series/:id/data` - Records within `?start=&end=`
//! - `GET /api/v1/series/:id/heatmap` - Hour-by-day pivot grid
//! - `GET /api/v1/series/:id/profile` - Hourly profile
//! - `GET /api/v1/measurements/:msr` - Descriptor by measurement point
//!
//! ## Analysis
//! - `POST /api/v1/align` - Align series (`format: "csv"` for CSV)
//! - `POST /api/v1/calculate` - Evaluate an expression over aligned series
//! - `POST /api/v1/scatter` - Two-series scatter with linear fit
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use plantdb::api::{serve, AppState};
//! use plantdb::config::Config;
//! use plantdb::storage::Database;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::resolve(None)?;
//!     let db = Database::open(config.database.resolved_path())?;
//!     db.ensure_schema()?;
//!
//!     let addr = config.api.addr()?;
//!     let state = AppState::new(db, config.database.duplicate_policy, config.api);
//!     serve(state, addr).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Series routes
        .route("/series", get(routes::series::list_series))
        .route(
            "/series/:id",
            get(routes::series::get_series).delete(routes::series::delete_series),
        )
        .route("/series/:id/data", get(routes::series::series_data))
        .route("/series/:id/heatmap", get(routes::series::series_heatmap))
        .route("/series/:id/profile", get(routes::series::series_profile))
        .route("/measurements/:msr", get(routes::series::find_measurement))
        // Analysis routes
        .route("/align", post(routes::analysis::align))
        .route("/calculate", post(routes::analysis::calculate))
        .route("/scatter", post(routes::analysis::scatter));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), ApiError> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("plantdb API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("plantdb API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::storage::test_util::{descriptor, ts};
    use crate::storage::{Database, DuplicatePolicy, MeasurementStore, MetadataCatalog, NewRecord};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tempfile::tempdir;
    use tower::util::ServiceExt;

    struct TestApp {
        router: Router,
        catalog: MetadataCatalog,
        store: MeasurementStore,
        _dir: tempfile::TempDir,
    }

    fn create_test_app() -> TestApp {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("plant.db")).unwrap();
        db.ensure_schema().unwrap();

        let state = AppState::new(db.clone(), DuplicatePolicy::Last, ApiConfig::default());
        TestApp {
            router: build_router(state),
            catalog: MetadataCatalog::new(db.clone()),
            store: MeasurementStore::new(db),
            _dir: dir,
        }
    }

    impl TestApp {
        fn seed(&self, msr: &str, attribute: &str, points: &[(&str, f64)]) -> String {
            let d = descriptor(msr, attribute);
            self.catalog.insert(&d).unwrap();
            let records: Vec<NewRecord> = points.iter().map(|(t, v)| NewRecord::new(ts(t), *v)).collect();
            self.store.append(&d.series_id, &records).unwrap();
            d.series_id.to_string()
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, body.to_vec())
        }

        async fn get(&self, uri: &str) -> (StatusCode, Value) {
            let (status, body) = self
                .send(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await;
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        }

        async fn post(&self, uri: &str, json: Value) -> (StatusCode, Vec<u8>) {
            self.send(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
            )
            .await
        }

        async fn post_json(&self, uri: &str, json: Value) -> (StatusCode, Value) {
            let (status, body) = self.post(uri, json).await;
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        }
    }

    #[tokio::test]
    async fn test_health_live() {
        let app = create_test_app();
        let (status, _) = app.get("/health/live").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready() {
        let app = create_test_app();
        let (status, _) = app.get("/health/ready").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "ok");
    }

    #[tokio::test]
    async fn test_list_series() {
        let app = create_test_app();
        let (status, body) = app.get("/api/v1/series").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);

        app.seed("A", "ISTWERT", &[]);
        app.seed("B", "ISTWERT", &[]);

        // Inserts made around the cache stay invisible until it is invalidated
        let (_, body) = app.get("/api/v1/series").await;
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn test_list_series_with_labels() {
        let app = create_test_app();
        app.seed("A", "ISTWERT", &[]);

        let (status, body) = app.get("/api/v1/series").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["series"][0]["msr"], "A");
        assert!(body["series"][0]["label"].as_str().unwrap().ends_with("A.ISTWERT)"));
    }

    #[tokio::test]
    async fn test_get_series() {
        let app = create_test_app();
        let id = app.seed("A", "ISTWERT", &[]);

        let (status, body) = app.get(&format!("/api/v1/series/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["series_id"], id.as_str());

        let unknown = descriptor("Z", "ISTWERT").series_id;
        let (status, body) = app.get(&format!("/api/v1/series/{}", unknown)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert!(body["request_id"].is_string());

        let (status, body) = app.get("/api/v1/series/not-a-hash").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_delete_series() {
        let app = create_test_app();
        let id = app.seed("A", "ISTWERT", &[("2023-01-01 00:00:00", 1.0)]);
        app.seed("B", "ISTWERT", &[("2023-01-01 00:00:00", 2.0)]);

        // Warm the cache
        let (_, body) = app.get("/api/v1/series").await;
        assert_eq!(body["total"], 2);

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/series/{}", id))
                .body(Body::empty())
                .unwrap()
        };
        let (status, _) = app.send(delete()).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = app.get("/api/v1/series").await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["series"][0]["msr"], "B");

        let series_id = crate::storage::SeriesId::parse(&id).unwrap();
        assert_eq!(app.store.count(&series_id).unwrap(), 0);

        let (status, _) = app.send(delete()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_series_data_window() {
        let app = create_test_app();
        let id = app.seed(
            "A",
            "ISTWERT",
            &[
                ("2023-01-01 00:00:00", 1.0),
                ("2023-01-02 00:00:00", 2.0),
                ("2023-01-03 00:00:00", 3.0),
            ],
        );

        let (status, body) = app
            .get(&format!("/api/v1/series/{}/data?start=2023-01-02&end=2023-01-03%2023:59:59", id))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["records"][0]["date"], "2023-01-02 00:00:00");
        assert_eq!(body["records"][1]["mean"], 3.0);

        let (status, _) = app
            .get(&format!("/api/v1/series/{}/data?start=2023-02-01&end=2023-01-01", id))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unknown = descriptor("Z", "ISTWERT").series_id;
        let (status, _) = app.get(&format!("/api/v1/series/{}/data", unknown)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_heatmap_and_profile() {
        let app = create_test_app();
        let id = app.seed(
            "A",
            "ISTWERT",
            &[("2023-01-01 06:00:00", 10.0), ("2023-01-02 06:00:00", 20.0)],
        );

        let (status, body) = app.get(&format!("/api/v1/series/{}/heatmap", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hours"][0], 6.0);
        assert_eq!(body["days"].as_array().unwrap().len(), 2);

        let (status, body) = app.get(&format!("/api/v1/series/{}/profile", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["mean"], 15.0);
        assert_eq!(body[0]["count"], 2);
    }

    #[tokio::test]
    async fn test_find_measurement() {
        let app = create_test_app();
        app.seed("A", "ISTWERT", &[]);
        app.seed("B", "ISTWERT", &[]);
        app.seed("B", "SOLLWERT", &[]);

        let (status, body) = app.get("/api/v1/measurements/A").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["msr"], "A");

        let (status, body) = app.get("/api/v1/measurements/B").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "AMBIGUOUS_LOOKUP");

        let (status, _) = app.get("/api/v1/measurements/C").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_align_json_and_csv() {
        let app = create_test_app();
        let a = app.seed("A", "ISTWERT", &[("2023-01-01 00:00:00", 1.0)]);
        let b = app.seed("B", "ISTWERT", &[("2023-01-01 00:15:00", 2.0)]);

        let (status, body) = app
            .post_json("/api/v1/align", serde_json::json!({ "series": [b, a] }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table"]["dates"].as_array().unwrap().len(), 2);
        assert_eq!(body["descriptors"][0]["name"], "m_0");
        assert_eq!(body["descriptors"][0]["msr"], "B");
        assert_eq!(body["table"]["columns"][1]["values"][0], 1.0);
        assert!(body["table"]["columns"][1]["values"][1].is_null());

        let (status, csv) = app
            .post("/api/v1/align", serde_json::json!({ "series": [a, b], "format": "csv" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        let csv = String::from_utf8(csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,m_0,m_1");
        assert_eq!(lines[1], "2023-01-01 00:00:00,1,");
    }

    #[tokio::test]
    async fn test_align_rejects_bad_input() {
        let app = create_test_app();

        let (status, _) = app.post_json("/api/v1/align", serde_json::json!({ "series": [] })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unknown = descriptor("Z", "ISTWERT").series_id.to_string();
        let (status, _) = app
            .post_json("/api/v1/align", serde_json::json!({ "series": [unknown] }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/align")
                    .header("Content-Type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_calculate() {
        let app = create_test_app();
        let a = app.seed("A", "ISTWERT", &[("2023-01-01 00:00:00", 2.0), ("2023-01-02 00:00:00", 4.0)]);
        let b = app.seed("B", "ISTWERT", &[("2023-01-01 00:00:00", 3.0), ("2023-01-02 00:00:00", 5.0)]);

        let (status, body) = app
            .post_json(
                "/api/v1/calculate",
                serde_json::json!({
                    "series": [a, b],
                    "expression": "m_0 + m_1",
                    "preview_start": "2023-01-01",
                    "preview_end": "2023-01-01 23:59:59"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["status"], "ok");
        assert_eq!(body["result"]["column"]["values"], serde_json::json!([5.0]));

        // Expression failures still answer 200
        let (status, body) = app
            .post_json(
                "/api/v1/calculate",
                serde_json::json!({ "series": [a, b], "expression": "m_0 / m_9" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["status"], "error");
        assert!(body["result"]["message"].as_str().unwrap().contains("m_9"));
    }

    #[tokio::test]
    async fn test_scatter() {
        let app = create_test_app();
        let x = app.seed("X", "ISTWERT", &[("2023-01-01 00:00:00", 1.0), ("2023-01-01 00:15:00", 2.0)]);
        let y = app.seed("Y", "ISTWERT", &[("2023-01-01 00:00:00", 3.0), ("2023-01-01 00:15:00", 5.0)]);

        let (status, body) = app
            .post_json("/api/v1/scatter", serde_json::json!({ "x": x, "y": y }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fit"]["slope"], 2.0);
        assert_eq!(body["fit"]["intercept"], 1.0);
        assert_eq!(body["fit"]["points"], 2);
    }
}
