//! Field-level validation helpers shared by the services.
//!
//! Messages follow the wording the API has always returned, so clients can
//! display them verbatim.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use parley_types::error::ValidationErrors;
use uuid::Uuid;

pub const REQUIRED: &str = "Trường này là bắt buộc.";
pub const BLANK: &str = "Trường này không được để trống.";
pub const INVALID_EMAIL: &str = "Nhập địa chỉ email hợp lệ.";
pub const PASSWORD_MISMATCH: &str = "Mật khẩu xác nhận không khớp.";
pub const MIN_PASSWORD_LEN: usize = 8;
pub const INVALID_DATETIME: &str = "Nhập một ngày/giờ hợp lệ.";
pub const INVALID_NUMBER: &str = "Nhập một số.";

/// Length in characters, not bytes. Vietnamese text is mostly multi-byte.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn invalid_choice(value: &str) -> String {
    format!("\"{value}\" không phải là lựa chọn hợp lệ.")
}

pub fn invalid_uuid(value: &str) -> String {
    format!("\"{value}\" không phải là UUID hợp lệ.")
}

pub fn max_value(limit: impl std::fmt::Display) -> String {
    format!("Đảm bảo giá trị này nhỏ hơn hoặc bằng {limit}.")
}

pub fn min_value(limit: impl std::fmt::Display) -> String {
    format!("Đảm bảo giá trị này lớn hơn hoặc bằng {limit}.")
}

pub fn min_length(limit: usize) -> String {
    format!("Đảm bảo trường này có ít nhất {limit} ký tự.")
}

pub fn max_length(limit: usize) -> String {
    format!("Đảm bảo trường này không có nhiều hơn {limit} ký tự.")
}

/// Parse an enum choice, recording an error under `field` on failure.
pub fn parse_choice<T: FromStr>(
    errors: &mut ValidationErrors,
    field: &str,
    raw: &str,
) -> Option<T> {
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.add(field, invalid_choice(raw));
            None
        }
    }
}

pub fn parse_uuid(errors: &mut ValidationErrors, field: &str, raw: &str) -> Option<Uuid> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, invalid_uuid(raw));
            None
        }
    }
}

/// Take a required string; records `REQUIRED` when absent.
pub fn required<'a>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&'a str>,
) -> Option<&'a str> {
    if value.is_none() {
        errors.add(field, REQUIRED);
    }
    value
}

/// Query-string values: an empty parameter counts as absent.
pub fn non_empty(raw: Option<String>) -> Option<String> {
    raw.filter(|v| !v.trim().is_empty())
}

/// Parse a query-string boolean (`true`/`false`/`1`/`0`, any case).
pub fn parse_bool(errors: &mut ValidationErrors, field: &str, raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => {
            errors.add(field, invalid_choice(raw));
            None
        }
    }
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_datetime(
    errors: &mut ValidationErrors,
    field: &str,
    raw: &str,
) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Some(dt.and_utc());
    }
    errors.add(field, INVALID_DATETIME);
    None
}

pub fn parse_int(errors: &mut ValidationErrors, field: &str, raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.add(field, INVALID_NUMBER);
            None
        }
    }
}

/// Pagination values are advisory: anything unparsable or negative is ignored.
pub fn parse_page_param(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n >= 0)
}

/// Minimal structural email check: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Password policy for registration and password changes.
pub fn check_password(errors: &mut ValidationErrors, field: &str, password: &str) {
    if char_len(password) < MIN_PASSWORD_LEN {
        errors.add(field, min_length(MIN_PASSWORD_LEN));
    }
}
