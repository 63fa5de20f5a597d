//! HTTP front end: `POST /predict` and `GET /health`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::classifier::{ClassifierError, Prediction, SenseClassifier};

/// Shared handler state. The classifier is ready before the server binds.
#[derive(Debug, Clone)]
pub struct AppState {
    pub classifier: Arc<SenseClassifier>,
}

impl AppState {
    pub fn new(classifier: Arc<SenseClassifier>) -> Self {
        Self { classifier }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub sentence: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SenseProbabilities {
    #[serde(rename = "Animal")]
    pub animal: f64,
    #[serde(rename = "Car")]
    pub car: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub sentence: String,
    /// `"Animal"` or `"Car"`
    pub prediction: String,
    /// Probability of the predicted sense
    pub confidence: f64,
    pub probabilities: SenseProbabilities,
}

impl PredictResponse {
    pub fn new(sentence: String, prediction: &Prediction) -> Self {
        Self {
            sentence,
            prediction: prediction.sense.name().to_string(),
            confidence: prediction.confidence(),
            probabilities: SenseProbabilities {
                animal: prediction.probabilities[0],
                car: prediction.probabilities[1],
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_ready: bool,
}

/// API error rendered as `{"error", "errorDetails": {"errorCode", "errorMessage"}}`.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request body (400)
    BadRequest(String),
    /// No trained model yet (503)
    ServiceUnavailable(String),
    /// Any other pipeline failure (500)
    InternalServerError(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            ApiError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl From<ClassifierError> for ApiError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::ModelNotReady => ApiError::ServiceUnavailable(err.to_string()),
            other => ApiError::InternalServerError(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "ERR_BAD_REQUEST", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ERR_MODEL_NOT_READY", msg)
            }
            ApiError::InternalServerError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ERR_INTERNAL_SERVER_ERROR", msg)
            }
        };

        let body = Json(json!({
            "error": message,
            "errorDetails": {
                "errorCode": error_code,
                "errorMessage": message,
            }
        }));

        (status, body).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn predict_handler(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload?;
    let classifier = Arc::clone(&state.classifier);
    let sentence = request.sentence.clone();

    let prediction = tokio::task::spawn_blocking(move || classifier.predict(&sentence))
        .await
        .map_err(|e| ApiError::InternalServerError(format!("Prediction task failed: {}", e)))?
        .map_err(|e| {
            error!("Prediction failed: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(PredictResponse::new(request.sentence, &prediction)))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_ready: state.classifier.is_trained(),
    })
}

/// Binds `addr` and serves until the process is stopped.
pub async fn run(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let app = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Sense;

    #[test]
    fn test_response_uses_sense_names() {
        let prediction = Prediction::from_probabilities([0.25, 0.75]);
        let response = PredictResponse::new("a jaguar".into(), &prediction);
        assert_eq!(response.prediction, Sense::Car.name());
        assert_eq!(response.confidence, 0.75);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["probabilities"]["Animal"], 0.25);
        assert_eq!(value["probabilities"]["Car"], 0.75);
    }

    #[test]
    fn test_model_not_ready_maps_to_503() {
        let response = ApiError::from(ClassifierError::ModelNotReady).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let response = ApiError::from(ClassifierError::ShapeMismatch("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
