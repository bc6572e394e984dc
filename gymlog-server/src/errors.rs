use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gymlog::GymError;
use log::{error, warn};
use serde::Serialize;

/// JSON error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct AppError(pub GymError);

impl From<GymError> for AppError {
    fn from(e: GymError) -> Self {
        AppError(e)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GymError::NotFound(_) => StatusCode::NOT_FOUND,
            GymError::Conflict(_) | GymError::Ambiguous(_) => StatusCode::CONFLICT,
            GymError::Parse(_) | GymError::Curation(_) | GymError::Constraint(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match &self.0 {
            GymError::NotFound(_) => "not_found",
            GymError::Conflict(_) => "conflict",
            GymError::Ambiguous(_) => "ambiguous",
            GymError::Parse(_) => "parse_error",
            GymError::Curation(_) => "curation_error",
            GymError::Constraint(_) => "constraint_violation",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected ({status}): {}", self.0);
        }

        // internal details stay in the log
        let message = if status.is_server_error() {
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        let body = ErrorBody {
            code: self.code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
