//! Error taxonomy shared by the store, the solver pipeline, and the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("infeasible: {0}")]
    Infeasible(String),

    #[error("solver error: {0}")]
    Solver(String),

    /// No feasible integer solution within the iteration's time/gap budget.
    /// Non-fatal to the generator loop: the iteration contributes no
    /// candidate and the loop continues.
    #[error("solver budget exhausted: {0}")]
    SolverBudgetExhausted(String),

    /// A cascade that should have cleaned up dependent rows left the store
    /// in an inconsistent state.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Conflict(_) => StatusCode::BAD_REQUEST,
            CoreError::Infeasible(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::Solver(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::SolverBudgetExhausted(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::DataIntegrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        if matches!(self, CoreError::Internal(_) | CoreError::Solver(_) | CoreError::DataIntegrity(_)) {
            tracing::error!(error = %self, "internal error");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
