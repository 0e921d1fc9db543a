//! 错误处理

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use xray_core::XrayError;

/// HTTP边界上的错误包装
#[derive(Debug)]
pub struct ApiError(pub XrayError);

impl From<XrayError> for ApiError {
    fn from(err: XrayError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            XrayError::NotFound(_) => StatusCode::NOT_FOUND,
            XrayError::Validation(_) => StatusCode::BAD_REQUEST,
            XrayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            XrayError::Storage(_)
            | XrayError::Database(_)
            | XrayError::Config(_)
            | XrayError::Io(_)
            | XrayError::Serialization(_)
            | XrayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }

        let body = Json(json!({
            "error": true,
            "message": self.0.message(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (XrayError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (XrayError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (XrayError::PayloadTooLarge("x".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (XrayError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (XrayError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
