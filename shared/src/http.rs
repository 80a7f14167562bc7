//! HTTP helpers for the admin API.

use lambda_http::{Body, Response};
use serde::Serialize;

/// Response envelope consumed by the admin UI.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    /// Success with nothing to return.
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
        }
    }
}

/// Create a JSON response with the given status code and data.
///
/// The admin UI is served from another origin, so every response carries a
/// permissive CORS header.
pub fn json_response<T: Serialize>(
    status: u16,
    data: &T,
) -> Result<Response<Body>, lambda_http::Error> {
    Ok(cors_response(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))
        .map_err(Box::new)?)
}

/// Create an error response with the given status code and message.
pub fn error_response(
    status: u16,
    message: impl Into<String>,
) -> Result<Response<Body>, lambda_http::Error> {
    json_response(status, &ApiResponse::<()>::error(message))
}

/// Empty response to a CORS preflight request.
pub fn preflight_response() -> Result<Response<Body>, lambda_http::Error> {
    Ok(cors_response(200)
        .header("access-control-allow-methods", "OPTIONS,POST")
        .header("access-control-allow-headers", "Content-Type,Authorization")
        .body(Body::Empty)
        .map_err(Box::new)?)
}

fn cors_response(status: u16) -> lambda_http::http::response::Builder {
    Response::builder()
        .status(status)
        .header("access-control-allow-origin", "*")
}
