use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use data_encoding::BASE64;
use drm_chinadrm::{DrmError, LicenseIssuer};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Clone)]
struct AppState {
    issuer: Arc<LicenseIssuer>,
    cert_id: String,
}

#[derive(Serialize)]
struct KeyResponse {
    key: String,
    kid: String,
}

#[derive(Debug, Deserialize)]
struct LicenseRequest {
    device_id: String,
    kids: Vec<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    content_id: Option<String>,
}

#[derive(Serialize)]
struct LicenseResponse {
    #[serde(rename = "DeviceId")]
    device_id: String,
    #[serde(rename = "Licenses")]
    licenses: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Request-level failure, mapped onto an HTTP status:
/// assembly problems are the caller's fault (400), crypto and RNG
/// failures are ours (500).
enum ApiError {
    BadRequest(String),
    Drm(DrmError),
}

impl From<DrmError> for ApiError {
    fn from(err: DrmError) -> Self {
        Self::Drm(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Drm(err @ DrmError::Format(_)) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Drm(err) => {
                eprintln!("[server] Issue failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Mint a random content key and a fresh KID for it.
async fn genkey(State(state): State<AppState>) -> Result<Json<KeyResponse>, ApiError> {
    let (key, kid) = state.issuer.generate_fresh_key()?;
    Ok(Json(KeyResponse {
        key: BASE64.encode(&key),
        kid,
    }))
}

/// Issue one license covering every requested KID. A content id in
/// the request selects the ChinaDRM flavor.
async fn acquire_license(
    State(state): State<AppState>,
    Json(request): Json<LicenseRequest>,
) -> Result<Json<LicenseResponse>, ApiError> {
    let mut subjects = vec![request.device_id.clone()];
    if let Some(client_id) = &request.client_id {
        subjects.push(client_id.clone());
    }

    let license = match &request.content_id {
        Some(content_id) => {
            let content_id: u64 = content_id.parse().map_err(|_| {
                ApiError::BadRequest(format!("content_id is not a decimal integer: {content_id}"))
            })?;
            state
                .issuer
                .issue_china_drm(content_id, &request.kids, &subjects, &state.cert_id)?
        }
        None => state
            .issuer
            .issue_common(&request.kids, &subjects, &state.cert_id)?,
    };

    Ok(Json(LicenseResponse {
        device_id: request.device_id,
        licenses: vec![license],
    }))
}

/**
    Run the HTTP front door for the issuing core.
*/
pub async fn run_server(
    addr: SocketAddr,
    issuer: Arc<LicenseIssuer>,
    cert_id: String,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = AppState { issuer, cert_id };

    let app = Router::new()
        .route("/genkey", post(genkey))
        .route("/acquirelicense", post(acquire_license))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            // Wait for shutdown signal
            while !*shutdown_rx.borrow_and_update() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    Ok(())
}
