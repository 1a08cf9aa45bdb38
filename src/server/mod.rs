//! Dataset service
//!
//! Serves dataset manifests under `/api/v1/dataset/:name`, the `storage/`
//! tree under `/storage` and the front-end assets at `/`.

use crate::config::ServerConfig;
use crate::dataset::{load_dataset, DatasetError, DatasetManifest};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Error body: `{ "message": ... }`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DatasetError> for ApiError {
    fn from(e: DatasetError) -> Self {
        let status = match e {
            DatasetError::InvalidName(_) => StatusCode::BAD_REQUEST,
            DatasetError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

pub fn router(config: ServerConfig) -> Router {
    let storage = ServeDir::new(config.storage_dir());
    let assets = ServeDir::new(config.assets_dir());

    Router::new()
        .route("/api/v1/dataset/:name", get(dataset_handler))
        .nest_service("/storage", storage)
        .fallback_service(assets)
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(config))
}

pub async fn start(config: ServerConfig) -> std::io::Result<()> {
    let addr = config.addr;
    let app = router(config);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind dataset server to {}: {}", addr, e);
        e
    })?;
    tracing::info!("Dataset server listening on {}", addr);

    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Dataset server error: {}", e);
        e
    })
}

async fn dataset_handler(
    State(config): State<Arc<ServerConfig>>,
    Path(name): Path<String>,
) -> Result<Json<DatasetManifest>, ApiError> {
    let lookup = name.clone();
    let result = tokio::task::spawn_blocking(move || {
        load_dataset(&config.datasets_dir(), &config.project_root, &lookup)
    })
    .await
    .map_err(|e| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: e.to_string(),
    })?;

    match result {
        Ok(manifest) => {
            tracing::info!("Serving dataset '{}' ({} samples)", name, manifest.len());
            Ok(Json(manifest))
        }
        Err(e) => {
            tracing::warn!("Dataset '{}' request failed: {}", name, e);
            Err(e.into())
        }
    }
}
