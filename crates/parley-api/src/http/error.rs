//! Application error type mapping to HTTP status codes and the error envelope.
//!
//! Framework-level failures (validation, authentication, permission,
//! not-found, internal) are wrapped as
//! `{"success": false, "error": {"code", "message", "details"?}}`.
//! Action-level rejections and provider errors keep their own bare bodies.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value, json};

use parley_core::ai::ChatRequestErrors;
use parley_types::ai::{AiError, AiErrorCode};
use parley_types::error::{NON_FIELD_ERRORS, ServiceError, ValidationErrors};
use parley_types::transcription::TranscriptionError;

/// Key under which a single human-readable message travels.
const DETAIL: &str = "detail";

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Any error bubbling out of a core service.
    Service(ServiceError),
    /// Bare envelope for a status with no further detail (unknown route, bad method).
    Status(StatusCode),
    /// Envelope for a status with a specific message.
    Detail(StatusCode, String),
    /// AI chat request that failed validation: reported in the AI error shape.
    InvalidChatRequest(ChatRequestErrors),
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        AppError::Service(e)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(e: ValidationErrors) -> Self {
        AppError::Service(ServiceError::Validation(e))
    }
}

impl From<AiError> for AppError {
    fn from(e: AiError) -> Self {
        AppError::Service(ServiceError::Ai(e))
    }
}

impl From<TranscriptionError> for AppError {
    fn from(e: TranscriptionError) -> Self {
        AppError::Service(ServiceError::Transcription(e))
    }
}

/// Machine-readable code for an HTTP status.
pub fn status_code_name(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "BAD_REQUEST".to_string(),
        401 => "UNAUTHORIZED".to_string(),
        403 => "FORBIDDEN".to_string(),
        404 => "NOT_FOUND".to_string(),
        405 => "METHOD_NOT_ALLOWED".to_string(),
        429 => "TOO_MANY_REQUESTS".to_string(),
        500 => "INTERNAL_SERVER_ERROR".to_string(),
        n => format!("ERROR_{n}"),
    }
}

/// Default user-facing message for an HTTP status.
pub fn status_message(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "Dữ liệu không hợp lệ.",
        401 => "Vui lòng đăng nhập để tiếp tục.",
        403 => "Bạn không có quyền thực hiện thao tác này.",
        404 => "Không tìm thấy tài nguyên yêu cầu.",
        405 => "Phương thức không được hỗ trợ.",
        429 => "Quá nhiều yêu cầu. Vui lòng thử lại sau.",
        500 => "Đã xảy ra lỗi máy chủ. Vui lòng thử lại sau.",
        _ => "Đã xảy ra lỗi.",
    }
}

/// Build the error envelope.
///
/// Field errors become `details` (single messages collapse to a string);
/// `non_field_errors` and `detail` replace the default message instead.
pub fn envelope(status: StatusCode, fields: Option<&ValidationErrors>, detail: Option<&str>) -> Value {
    let mut message = status_message(status).to_string();
    let mut details = Map::new();

    if let Some(fields) = fields {
        for (field, messages) in fields.iter() {
            match field.as_str() {
                NON_FIELD_ERRORS | DETAIL => {
                    if let Some(first) = messages.first() {
                        message = first.clone();
                    }
                }
                _ => {
                    let value = match messages.as_slice() {
                        [single] => Value::String(single.clone()),
                        many => json!(many),
                    };
                    details.insert(field.clone(), value);
                }
            }
        }
    }
    if let Some(detail) = detail {
        message = detail.to_string();
    }

    let mut error = json!({
        "code": status_code_name(status),
        "message": message,
    });
    if !details.is_empty() {
        error["details"] = Value::Object(details);
    }
    json!({ "success": false, "error": error })
}

fn transcription_status(e: &TranscriptionError) -> StatusCode {
    match e {
        TranscriptionError::Validation(_) => StatusCode::BAD_REQUEST,
        TranscriptionError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Status(status) => (status, envelope(status, None, None)),
            AppError::Detail(status, message) => (status, envelope(status, None, Some(&message))),
            AppError::InvalidChatRequest(errors) => {
                let mut err = AiError::new(AiErrorCode::InvalidRequest, "Dữ liệu không hợp lệ");
                if let Ok(Value::Object(details)) = serde_json::to_value(&errors) {
                    err = err.with_details(details);
                }
                (StatusCode::BAD_REQUEST, err.to_body())
            }
            AppError::Service(e) => match e {
                ServiceError::Validation(errors) => (
                    StatusCode::BAD_REQUEST,
                    envelope(StatusCode::BAD_REQUEST, Some(&errors), None),
                ),
                ServiceError::Unauthorized(msg) => (
                    StatusCode::UNAUTHORIZED,
                    envelope(StatusCode::UNAUTHORIZED, None, Some(&msg)),
                ),
                ServiceError::Forbidden => (
                    StatusCode::FORBIDDEN,
                    envelope(StatusCode::FORBIDDEN, None, None),
                ),
                ServiceError::NotFound => (
                    StatusCode::NOT_FOUND,
                    envelope(StatusCode::NOT_FOUND, None, None),
                ),
                ServiceError::Rejected(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
                ServiceError::RejectedField { field, message } => {
                    let mut body = Map::new();
                    body.insert(field, Value::String(message));
                    (StatusCode::BAD_REQUEST, Value::Object(body))
                }
                ServiceError::Ai(e) => {
                    tracing::error!(code = %e.code, "AI service error: {}", e.message);
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_body())
                }
                ServiceError::Transcription(e) => {
                    tracing::error!(code = e.code(), "Transcription error: {e}");
                    (transcription_status(&e), e.to_body())
                }
                ServiceError::Repository(e) => {
                    tracing::error!("Repository error: {e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        envelope(StatusCode::INTERNAL_SERVER_ERROR, None, None),
                    )
                }
                ServiceError::Internal(msg) => {
                    tracing::error!("Internal error: {msg}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        envelope(StatusCode::INTERNAL_SERVER_ERROR, None, None),
                    )
                }
            },
        };

        (status, Json(body)).into_response()
    }
}
