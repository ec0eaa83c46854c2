//! MIME types and header names used by responses

use hyper::header::HeaderValue;

pub const MIME_TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
pub const MIME_TEXT_HTML_UTF8: &str = "text/html; charset=utf-8";
pub const MIME_APPLICATION_JSON_UTF8: &str = "application/json; charset=utf-8";
pub const MIME_APPLICATION_FORM: &str = "application/x-www-form-urlencoded";
pub const MIME_APPLICATION_GRPC: &str = "application/grpc";

pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REQUEST_ID: &str = "x-request-id";

pub(crate) const NOSNIFF: HeaderValue = HeaderValue::from_static("nosniff");
