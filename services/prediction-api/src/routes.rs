//! HTTP surface: liveness, readiness and prediction.

use crate::error::ApiError;
use crate::handle::ModelHandle;
use crate::schema::{LivenessResponse, PredictionResponse, ReadinessResponse, StudentRecord};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

#[derive(Clone, Debug)]
pub struct AppState {
    pub model: ModelHandle,
    pub inference_timeout: Duration,
}

impl AppState {
    pub fn new(model: ModelHandle, inference_timeout: Duration) -> Self { Self { model, inference_timeout } }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/ready", get(readiness))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

async fn liveness() -> Json<LivenessResponse> { Json(LivenessResponse::running()) }

async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let model = &state.model;
    let status = if model.is_ready() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let body = ReadinessResponse { ready: model.is_ready(), model: model.label().map(str::to_string), version: model.version() };
    (status, Json(body))
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<StudentRecord>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(record) = payload.map_err(|rejection| {
        warn!(status = rejection.status().as_u16(), reason = %rejection.body_text(), "predict_rejected");
        ApiError::from(rejection)
    })?;
    let predictor = state.model.predictor().inspect_err(|_| warn!("predict_before_model_loaded"))?;

    let frame = record.into_frame();
    let started = Instant::now();
    let task = tokio::task::spawn_blocking(move || predictor.predict(&frame));
    let values = match tokio::time::timeout(state.inference_timeout, task).await {
        Err(_) => {
            error!(timeout_ms = state.inference_timeout.as_millis() as u64, "predict_timed_out");
            return Err(ApiError::InferenceTimeout);
        }
        Ok(Err(join_err)) => {
            error!(error = %join_err, "predict_panicked");
            return Err(ApiError::Inference);
        }
        Ok(Ok(Err(e))) => {
            error!(error = %format!("{e:#}"), "predict_failed");
            return Err(ApiError::Inference);
        }
        Ok(Ok(Ok(values))) => values,
    };

    let value = match values.first() {
        Some(v) if v.is_finite() => *v,
        Some(v) => {
            error!(value = %v, "predict_non_finite");
            return Err(ApiError::Inference);
        }
        None => {
            error!("predict_empty_output");
            return Err(ApiError::Inference);
        }
    };
    debug!(value, elapsed_us = started.elapsed().as_micros() as u64, "predict_ok");
    Ok(Json(PredictionResponse { predicted_final_percentage: value }))
}
