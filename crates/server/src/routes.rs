use std::sync::Arc;
use std::time::Duration;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use facemood_core::access::domain::access_controller::AccessController;
use facemood_core::access::domain::account::AuthDecision;
use facemood_core::access::domain::request_context::{BasicCredentials, RequestContext};
use facemood_core::classification::domain::emotion::{EmotionLabel, PredictionResult};
use facemood_core::pipeline::infer_emotions_use_case::{InferEmotionsUseCase, Inference};
use facemood_core::shared::image_buffer::ImageBuffer;
use serde::Serialize;
use serde_json::json;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::error::ApiError;

const IMAGE_FIELD: &str = "image";
const API_KEY_HEADER: &str = "x-api-key";

/// Shared, read-only state injected into every handler.
pub struct AppState {
    pub access: Arc<AccessController>,
    /// `None` when the models failed to load in strict health-check mode.
    pub pipeline: Option<Arc<InferEmotionsUseCase>>,
    pub strict_health_check: bool,
    pub auth_timeout: Duration,
    pub inference_timeout: Duration,
    /// Request body limit in bytes.
    pub body_limit: usize,
}

#[derive(Serialize)]
struct FaceEmotion {
    emotion: EmotionLabel,
    #[serde(rename = "box")]
    bbox: [u32; 4],
}

impl From<PredictionResult> for FaceEmotion {
    fn from(result: PredictionResult) -> Self {
        Self {
            emotion: result.label,
            bbox: result.region.to_box(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/status", get(status))
        .route("/predict", post(predict).options(preflight));

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(state.body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type,Authorization"),
        ))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn status(State(state): State<Arc<AppState>>) -> Response {
    if state.strict_health_check && state.pipeline.is_none() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        )
            .into_response()
    } else {
        Json(json!({ "status": "available" })).into_response()
    }
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let decision = authorize(&state, request_context(&headers)).await;
    if !decision.allowed {
        return Err(ApiError::Unauthorized);
    }

    let multipart = multipart.map_err(|e| {
        log::info!("Rejected non-multipart upload: {e}");
        ApiError::MissingInput
    })?;
    let image = read_image(multipart, state.body_limit).await?;

    let response = match infer(&state, image).await? {
        Inference::NoFaces => Json(json!({ "status": "No faces detected" })).into_response(),
        Inference::Faces(results) => {
            let faces: Vec<FaceEmotion> = results.into_iter().map(FaceEmotion::from).collect();
            Json(faces).into_response()
        }
    };
    Ok(response)
}

// ---------------------------------------------------------------------------
// Request stages
// ---------------------------------------------------------------------------

fn request_context(headers: &HeaderMap) -> RequestContext {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    RequestContext {
        origin: text(header::ORIGIN.as_str()),
        referer: text(header::REFERER.as_str()),
        api_key: text(API_KEY_HEADER),
        credentials: text(header::AUTHORIZATION.as_str())
            .and_then(|value| BasicCredentials::from_header(&value)),
    }
}

async fn authorize(state: &AppState, context: RequestContext) -> AuthDecision {
    let access = state.access.clone();
    let task = tokio::task::spawn_blocking(move || access.authorize(&context, Utc::now()));
    match tokio::time::timeout(state.auth_timeout, task).await {
        Ok(Ok(decision)) => decision,
        Ok(Err(e)) => {
            log::error!("Authorization task failed: {e}");
            AuthDecision::deny()
        }
        Err(_) => {
            log::warn!("Authorization timed out after {:?}", state.auth_timeout);
            AuthDecision::deny()
        }
    }
}

async fn read_image(
    mut multipart: Multipart,
    body_limit: usize,
) -> Result<ImageBuffer, ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(ApiError::MissingInput),
            Err(e) => {
                log::info!("Malformed multipart body (limit {body_limit} bytes): {e}");
                return Err(ApiError::MissingInput);
            }
        };
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            log::info!("Failed to read image field (limit {body_limit} bytes): {e}");
            ApiError::MissingInput
        })?;
        if bytes.is_empty() {
            return Err(ApiError::MissingInput);
        }
        return Ok(ImageBuffer::new(bytes.to_vec(), content_type));
    }
}

async fn infer(state: &AppState, image: ImageBuffer) -> Result<Inference, ApiError> {
    let Some(pipeline) = state.pipeline.clone() else {
        log::error!("Inference requested but the pipeline is not loaded");
        return Err(ApiError::PipelineFault);
    };
    let task = tokio::task::spawn_blocking(move || pipeline.infer(&image));
    match tokio::time::timeout(state.inference_timeout, task).await {
        Ok(Ok(result)) => result.map_err(ApiError::from),
        Ok(Err(e)) => {
            log::error!("Inference task failed: {e}");
            Err(ApiError::PipelineFault)
        }
        Err(_) => {
            log::error!("Inference timed out after {:?}", state.inference_timeout);
            Err(ApiError::PipelineFault)
        }
    }
}
