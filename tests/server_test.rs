use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use jaguar_sense::server::{build_router, AppState};
use jaguar_sense::{corpus, HashingEmbedder, SenseClassifier};

fn state(trained: bool) -> AppState {
    let classifier = SenseClassifier::builder()
        .with_embedder(Arc::new(HashingEmbedder::new(64).unwrap()))
        .build()
        .unwrap();
    if trained {
        let (texts, labels) = corpus::reference_corpus();
        classifier.train(&texts, &labels).unwrap();
    }
    AppState::new(Arc::new(classifier))
}

fn predict_request(body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_predict_car() {
    let app = build_router(state(true));
    let sentence = "I test drove the new Jaguar F-Type yesterday.";
    let response = app
        .oneshot(predict_request(json!({ "sentence": sentence }).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["sentence"], sentence);
    assert_eq!(body["prediction"], "Car");

    let animal = body["probabilities"]["Animal"].as_f64().unwrap();
    let car = body["probabilities"]["Car"].as_f64().unwrap();
    assert!((animal + car - 1.0).abs() < 1e-6);
    assert_eq!(body["confidence"].as_f64().unwrap(), animal.max(car));
}

#[tokio::test]
async fn test_predict_animal() {
    let app = build_router(state(true));
    let response = app
        .oneshot(predict_request(
            json!({ "sentence": "The jaguar runs very fast in the jungle." }).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["prediction"], "Animal");
}

#[tokio::test]
async fn test_predict_untrained_is_503() {
    let app = build_router(state(false));
    let response = app
        .oneshot(predict_request(json!({ "sentence": "The jaguar hunts." }).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["errorDetails"]["errorCode"], "ERR_MODEL_NOT_READY");
    assert!(body.get("prediction").is_none());
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let app = build_router(state(true));
    let response = app
        .oneshot(predict_request("{\"text\": 1}".to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["errorDetails"]["errorCode"], "ERR_BAD_REQUEST");
}

#[tokio::test]
async fn test_health_reports_readiness() {
    for trained in [false, true] {
        let app = build_router(state(trained));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body, json!({ "status": "ok", "model_ready": trained }));
    }
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = build_router(state(true));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/predict")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}
