use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use serde_json::Value;

use crate::services::ProviderError;

#[derive(Debug)]
pub struct Error {
    pub code: StatusCode,
    pub body: Json<Value>,
}

impl Error {
    pub fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code,
            body: Json(json!({"error": message})),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.code, self.body).into_response()
    }
}

impl From<ProviderError> for Error {
    fn from(error: ProviderError) -> Self {
        // Anything the provider throws surfaces as a 500 carrying the
        // error's text; the debug detail is only logged server-side.
        tracing::error!("provider failure: {error:?}");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("An unexpected server error occurred: {error}"),
        )
    }
}
