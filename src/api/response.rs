use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, TrackerError};
use crate::tracker::Pagination;

/// Envelope shared by every tracker endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
            errors: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl ApiResponse<()> {
    /// Success without a payload, e.g. after a delete.
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
            errors: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            pagination: None,
            errors,
        }
    }
}

impl TrackerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Unauthorized => StatusCode::UNAUTHORIZED,
            TrackerError::CapacityExceeded => StatusCode::SERVICE_UNAVAILABLE,
            TrackerError::RequestFailed(_) | TrackerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            TrackerError::RequestFailed(_) | TrackerError::Internal(_) => {
                tracing::error!(error = %self, "Tracker request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let errors = match self {
            TrackerError::Validation(errors) => errors,
            _ => Vec::new(),
        };
        (status, Json(ApiResponse::failure(message, errors))).into_response()
    }
}
