//! 请求参数解析失败时的统一响应

use actix_web::{HttpRequest, HttpResponse, error, error::InternalError};
use tracing::debug;

use crate::models::{ApiResponse, ErrorCode};

fn bad_request(err: impl std::fmt::Display + std::fmt::Debug + 'static, message: String) -> error::Error {
    let response = HttpResponse::BadRequest().json(ApiResponse::error_empty(
        ErrorCode::BadRequest,
        message,
    ));
    InternalError::from_response(err, response).into()
}

pub fn json_error_handler(err: error::JsonPayloadError, req: &HttpRequest) -> error::Error {
    debug!("Invalid JSON body for {}: {}", req.path(), err);
    let message = format!("Invalid request body: {err}");
    bad_request(err, message)
}

pub fn path_error_handler(err: error::PathError, req: &HttpRequest) -> error::Error {
    debug!("Invalid path parameter for {}: {}", req.path(), err);
    let message = format!("Invalid path parameter: {err}");
    bad_request(err, message)
}
