//! JSON body extractor with envelope-shaped rejections.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{StatusCode, header};
use serde::de::DeserializeOwned;

use crate::http::error::AppError;

pub const JSON_PARSE_ERROR: &str = "JSON parse error";

/// Like `axum::Json`, but an empty body reads as `{}` and parse failures
/// come back in the error envelope.
pub struct JsonBody<T>(pub T);

fn is_json_content_type(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json_content = is_json_content_type(req.headers());
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Status(rejection.status()))?;

        let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            &b"{}"[..]
        } else if !json_content {
            return Err(AppError::Status(StatusCode::UNSUPPORTED_MEDIA_TYPE));
        } else {
            bytes.as_ref()
        };

        serde_json::from_slice(body).map(JsonBody).map_err(|e| {
            tracing::debug!("Rejected request body: {e}");
            AppError::Detail(StatusCode::BAD_REQUEST, JSON_PARSE_ERROR.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Form {
        name: Option<String>,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn parses_json_body() {
        let JsonBody(form) = JsonBody::<Form>::from_request(
            request(Some("application/json; charset=utf-8"), r#"{"name":"Hương"}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(form.name.as_deref(), Some("Hương"));
    }

    #[tokio::test]
    async fn empty_body_reads_as_empty_object() {
        let JsonBody(form) = JsonBody::<Form>::from_request(request(None, ""), &())
            .await
            .unwrap();
        assert!(form.name.is_none());
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let err = JsonBody::<Form>::from_request(request(Some("application/json"), "{oops"), &())
            .await
            .err()
            .unwrap();
        match err {
            AppError::Detail(status, message) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, JSON_PARSE_ERROR);
            }
            other => panic!("unexpected rejection: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_content_type_is_unsupported() {
        let err = JsonBody::<Form>::from_request(request(Some("text/plain"), "name=x"), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Status(StatusCode::UNSUPPORTED_MEDIA_TYPE)));
    }
}
