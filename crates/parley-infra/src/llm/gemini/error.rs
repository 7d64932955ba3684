//! Translation of Gemini HTTP failures into the user-facing `AiError` taxonomy.

use std::fmt;

use parley_types::ai::{AiError, AiErrorCode};

/// A failed attempt, tagged with whether another attempt may succeed.
#[derive(Debug)]
pub struct Failure {
    pub error: AiError,
    pub retryable: bool,
}

impl Failure {
    fn fatal(error: AiError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }

    fn transient(error: AiError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

/// Map a non-success status and its body. Only 500/503/504 are retried.
pub fn from_status(status: u16, body: &str) -> Failure {
    let lowered = body.to_lowercase();
    match status {
        400 if lowered.contains("api key") || lowered.contains("api_key") => {
            Failure::fatal(AiError::from_code(AiErrorCode::ApiKey))
        }
        400 => Failure::fatal(AiError::new(
            AiErrorCode::Generation,
            format!("Request không hợp lệ: {body}"),
        )),
        401 | 403 => Failure::fatal(AiError::new(
            AiErrorCode::ApiKey,
            "API key không có quyền truy cập.",
        )),
        404 => Failure::fatal(AiError::from_code(AiErrorCode::Model)),
        429 if lowered.contains("quota") => {
            Failure::fatal(AiError::from_code(AiErrorCode::QuotaExceeded))
        }
        429 => Failure::fatal(AiError::from_code(AiErrorCode::RateLimit)),
        504 => Failure::transient(AiError::from_code(AiErrorCode::Timeout)),
        503 => Failure::transient(AiError::new(
            AiErrorCode::Network,
            "Dịch vụ Gemini tạm thời không khả dụng.",
        )),
        500 => Failure::transient(AiError::new(
            AiErrorCode::Generation,
            "Lỗi server Gemini. Vui lòng thử lại.",
        )),
        _ if lowered.contains("blocked") || lowered.contains("safety") => {
            Failure::fatal(AiError::from_code(AiErrorCode::ContentFiltered))
        }
        _ => Failure::fatal(unknown(format!("HTTP {status}: {body}"))),
    }
}

/// Map a transport-level failure. Timeouts are retried; refused connections are not.
pub fn from_transport(err: &reqwest::Error) -> Failure {
    if err.is_timeout() {
        Failure::transient(AiError::from_code(AiErrorCode::Timeout))
    } else if err.is_connect() {
        Failure::fatal(AiError::from_code(AiErrorCode::Network))
    } else {
        Failure::fatal(unknown(err))
    }
}

pub fn unknown(detail: impl fmt::Display) -> AiError {
    AiError::new(AiErrorCode::Generation, format!("Lỗi không xác định: {detail}"))
}
