use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

/// Failure of a spreadsheet-backed store operation.
///
/// These never escape the tool layer: they are handed back to the model as
/// `{"error": ...}` so it can explain the problem to the customer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to {op}.")]
    Backend { op: &'static str },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),
}

impl StoreError {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Backend { .. } => AppError::Internal(anyhow::anyhow!(err.to_string())),
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_message() {
        let err = StoreError::Backend { op: "book appointment" };
        assert_eq!(err.to_string(), "Failed to book appointment.");
        assert_eq!(err.to_json()["error"], "Failed to book appointment.");
    }

    #[test]
    fn test_status_codes() {
        let res = AppError::Conflict("dup".into()).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let res = AppError::Validation("bad".into()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let res = AppError::NotFound("Business not found".into()).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = AppError::from(StoreError::Backend { op: "fetch doctors" }).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
