use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::error::ErrorKind;
use super::events::TriggerEvent;
use super::outcome::PipelineOutcome;
use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::state::AppState;

/// Runs the pipeline for a posted bucket notification and reports the outcome.
pub async fn handle_event(
    State(state): State<AppState>,
    payload: Result<Json<TriggerEvent>, JsonRejection>,
) -> Response {
    let Json(event) = match payload {
        Ok(event) => event,
        Err(rejection) => {
            return ApiError(rejection.body_text(), StatusCode::BAD_REQUEST).into_response();
        }
    };

    let outcome = state.pipeline.run(&event).await;

    let (status, message) = match &outcome {
        PipelineOutcome::Completed { .. } => (StatusCode::OK, "Transcode completed".to_string()),
        PipelineOutcome::CompletedWithCleanupWarning { .. } => (
            StatusCode::OK,
            "Transcode completed with warnings".to_string(),
        ),
        PipelineOutcome::Skipped { .. } => (StatusCode::OK, "Object skipped".to_string()),
        PipelineOutcome::Failed(failure) => {
            let status = match failure.kind {
                ErrorKind::InvalidEvent => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, failure.detail.clone())
        }
    };

    if outcome.is_failure() {
        ApiSuccess(ApiResponse::failure(outcome, &message), status).into_response()
    } else {
        ApiSuccess(ApiResponse::success(outcome, &message), status).into_response()
    }
}
