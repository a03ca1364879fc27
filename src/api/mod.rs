use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error};

use crate::predictor::{MatchFeatures, PredictError, Predictor, Winner};

#[derive(Clone)]
pub struct ApiState {
    pub predictor: Predictor,
}

/// Body of a successful `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub winner: Winner,
    pub probability_player_1: f64,
    pub input_received: MatchFeatures,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        // Both variants are server-side failures, never validation errors.
        let body = Json(ErrorBody {
            detail: self.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Build the Axum router for the prediction API.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/predict", post(predict_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /
async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "ATP Match Predictor API is running! 🎾" }))
}

/// POST /predict
async fn predict_handler(
    State(state): State<Arc<ApiState>>,
    Json(features): Json<MatchFeatures>,
) -> Result<Json<PredictionResponse>, PredictError> {
    let result = state.predictor.predict(&features).map_err(|e| {
        error!("Prediction failed for {:?}: {}", features, e);
        e
    })?;
    debug!(
        "Predicted {} (p1={:.2}) for {:?}",
        result.winner, result.probability_player_1, features
    );
    Ok(Json(PredictionResponse {
        winner: result.winner,
        probability_player_1: result.probability_player_1,
        input_received: features,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::service::test_support::FixedClassifier;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn app(predictor: Predictor) -> Router {
        router(ApiState { predictor })
    }

    fn predict_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_reports_running() {
        let resp = app(Predictor::unavailable())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert!(body["message"].as_str().unwrap().contains("running"));
    }

    #[tokio::test]
    async fn test_predict_returns_winner_and_echo() {
        let predictor = Predictor::with_classifier(Arc::new(FixedClassifier {
            class: 1,
            probability: 0.6789,
        }));
        let resp = app(predictor)
            .oneshot(predict_request(
                r#"{"diff_rank": -3, "diff_pts": 1500, "surface": "Clay"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["winner"], "Player 1");
        assert_eq!(body["probability_player_1"], 0.68);
        assert_eq!(
            body["input_received"],
            serde_json::json!({"diff_rank": -3, "diff_pts": 1500, "surface": "Clay"})
        );
    }

    #[tokio::test]
    async fn test_predict_player_two() {
        let predictor = Predictor::with_classifier(Arc::new(FixedClassifier {
            class: 0,
            probability: 0.3,
        }));
        let resp = app(predictor)
            .oneshot(predict_request(
                r#"{"diff_rank": 20, "diff_pts": -900, "surface": "Grass"}"#,
            ))
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert_eq!(body["winner"], "Player 2");
    }

    #[tokio::test]
    async fn test_unavailable_model_is_server_error() {
        for body in [
            r#"{"diff_rank": 0, "diff_pts": 0, "surface": "Hard"}"#,
            r#"{"diff_rank": 5, "diff_pts": -5, "surface": "Carpet"}"#,
        ] {
            let resp = app(Predictor::unavailable())
                .oneshot(predict_request(body))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let body = json_body(resp).await;
            assert_eq!(body["detail"], "model unavailable");
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_client_error() {
        let predictor = Predictor::with_classifier(Arc::new(FixedClassifier {
            class: 1,
            probability: 0.5,
        }));
        let resp = app(predictor)
            .oneshot(predict_request(r#"{"diff_rank": "high", "surface": "Hard"}"#))
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
    }
}
