use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use bankcache_core::Error;

#[derive(Debug)]
pub enum ServerError {
    Core(Error),
    BadRequest(String),
    Unauthorized(&'static str),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn status_for_core_error(err: &Error) -> StatusCode {
    match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Provider { .. } => StatusCode::BAD_GATEWAY,
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Storage(_) | Error::Config(_) | Error::Io(_) | Error::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_core_error(err: Error) -> String {
    match err {
        err @ (Error::NotFound(_) | Error::Provider { .. } | Error::Validation(_)) => err.to_string(),
        other => {
            tracing::error!("internal error: {other}");
            "internal server error".to_string()
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ServerError::Core(err) => (status_for_core_error(&err), message_for_core_error(err)),
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            ServerError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };

        let mut response = (status, Json(ErrorBody { error })).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<Error> for ServerError {
    fn from(value: Error) -> Self {
        Self::Core(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let res = ServerError::from(Error::not_found("account a1")).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn provider_maps_to_502() {
        let res = ServerError::from(Error::provider(None, "timed out")).into_response();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn validation_maps_to_400() {
        let res = ServerError::from(Error::validation("count must be at least 1")).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_maps_to_500_without_detail() {
        let err = Error::storage("IO Error: could not open /secret/path.duckdb");
        assert_eq!(message_for_core_error(err), "internal server error");

        let res = ServerError::from(Error::storage("disk full")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let res = ServerError::Unauthorized("Authentication required").into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
