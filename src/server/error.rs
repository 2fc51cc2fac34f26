//! HTTP error mapping.
//!
//! Errors are returned in a FastAPI-style `{"detail": ...}` envelope: a list
//! of `{loc, msg, type}` objects for validation failures and a plain string
//! otherwise.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::domain::FieldError;
use crate::model::ModelError;

#[derive(Debug)]
pub enum ApiError {
    /// Field-level validation failures; `index` is set for batch items.
    Validation(Vec<(Option<usize>, FieldError)>),
    /// The request could not be extracted (bad JSON, wrong types, bad query).
    Rejected { status: StatusCode, message: String },
    /// Inference failed after the input was accepted.
    Prediction(ModelError),
    /// The inference task itself did not complete.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Prediction(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Value {
        match self {
            ApiError::Validation(errors) => Value::Array(
                errors
                    .iter()
                    .map(|(index, e)| {
                        let loc = match index {
                            Some(i) => json!(["body", i, e.field]),
                            None => json!(["body", e.field]),
                        };
                        json!({ "loc": loc, "msg": e.message, "type": "value_error" })
                    })
                    .collect(),
            ),
            ApiError::Rejected { message, .. } => Value::String(message.clone()),
            ApiError::Prediction(err) => Value::String(format!("Prediction error: {err}")),
            ApiError::Internal(message) => Value::String(format!("Prediction error: {message}")),
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        ApiError::Prediction(err)
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<axum::extract::rejection::QueryRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self.detail());
        } else {
            tracing::debug!("rejected request ({status}): {}", self.detail());
        }
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
