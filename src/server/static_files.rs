//! Static file serving
//!
//! Files are read below a fixed root and sent through the context's buffered
//! response with:
//! - MIME type detection
//! - ETag and Last-Modified headers
//! - Conditional requests (If-None-Match, If-Modified-Since)
//! - Cache-Control headers based on file type

use super::context::Context;
use super::error::HttpError;
use super::handler::HandlerResult;
use super::header::NOSNIFF;

use anyhow::{anyhow, Result};
use hyper::header::{
    HeaderValue, CACHE_CONTROL, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
    X_CONTENT_TYPE_OPTIONS,
};
use hyper::StatusCode;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::debug;

/// Files larger than this are refused (100MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Serves files relative to a filesystem root.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    max_file_size: u64,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request-relative path onto the root. Traversal is a bad request.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, HttpError> {
        if contains_dot_dot(rel) {
            return Err(HttpError::bad_request("invalid URL path"));
        }

        let mut path = self.root.clone();
        for component in Path::new(rel.trim_start_matches(['/', '\\'])).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return Err(HttpError::bad_request("invalid URL path")),
            }
        }
        Ok(path)
    }

    /// Send the file at `rel` into the context's response.
    pub async fn serve(&self, c: &mut Context, rel: &str) -> HandlerResult {
        let path = self.resolve(rel)?;

        let metadata = fs::metadata(&path).await?;
        if metadata.is_dir() {
            return Err(HttpError::not_found().into());
        }

        let file_size = metadata.len();
        if file_size > self.max_file_size {
            return Err(anyhow!("file too large: {:?} ({} bytes)", path, file_size));
        }

        let modified = metadata.modified().ok();
        let etag = format!("\"{}\"", generate_etag(&path, file_size, modified));

        if is_not_modified(c, &etag, modified) {
            debug!("not modified: {:?}", path);
            c.response_mut()
                .headers_mut()
                .insert(ETAG, HeaderValue::from_str(&etag)?);
            c.write_header(StatusCode::NOT_MODIFIED);
            return Ok(());
        }

        let mime_type = guess_mime_type(&path);
        debug!(
            "serving {:?} ({}, {} bytes, etag={})",
            path, mime_type, file_size, etag
        );

        let contents = fs::read(&path).await?;

        let headers = c.response_mut().headers_mut();
        headers.insert(ETAG, HeaderValue::from_str(&etag)?);
        if let Some(t) = modified {
            headers.insert(LAST_MODIFIED, HeaderValue::from_str(&format_http_date(t))?);
        }
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static(cache_control(&mime_type)),
        );
        headers.insert(X_CONTENT_TYPE_OPTIONS, NOSNIFF);

        c.blob(StatusCode::OK, &mime_type, &contents)
    }
}

/// Whether the client's cached copy is still fresh.
fn is_not_modified(c: &Context, etag: &str, modified: Option<SystemTime>) -> bool {
    if let Some(client_etag) = c.header(IF_NONE_MATCH.as_str()) {
        return client_etag
            .split(',')
            .map(str::trim)
            .any(|t| t == "*" || t == etag || t.trim_start_matches("W/") == etag);
    }

    // HTTP dates carry whole seconds only
    if let (Some(ims), Some(file_modified)) = (c.header(IF_MODIFIED_SINCE.as_str()), modified) {
        if let (Ok(client_time), Some(file_secs)) = (parse_http_date(ims), unix_secs(file_modified))
        {
            return unix_secs(client_time).map_or(false, |client_secs| file_secs <= client_secs);
        }
    }

    false
}

fn unix_secs(t: SystemTime) -> Option<u64> {
    t.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

/// Reports whether `path` has a `..` element.
pub fn contains_dot_dot(path: &str) -> bool {
    if !path.contains("..") {
        return false;
    }
    path.split(|c| c == '/' || c == '\\').any(|part| part == "..")
}

/// Generate ETag from file metadata
fn generate_etag(path: &Path, size: u64, modified: Option<SystemTime>) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    size.hash(&mut hasher);
    if let Some(secs) = modified.and_then(unix_secs) {
        secs.hash(&mut hasher);
    }

    format!("{:x}", hasher.finish())
}

/// Content type for a file, text types get an explicit charset.
fn guess_mime_type(path: &Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let needs_charset = mime.type_() == mime_guess::mime::TEXT
        || matches!(
            mime.essence_str(),
            "application/javascript" | "application/json" | "application/xml"
        );

    if needs_charset && mime.get_param("charset").is_none() {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.to_string()
    }
}

fn cache_control(mime_type: &str) -> &'static str {
    if mime_type.starts_with("image/")
        || mime_type.starts_with("font/")
        || mime_type.starts_with("application/javascript")
        || mime_type.starts_with("text/javascript")
        || mime_type.starts_with("text/css")
        || mime_type == "application/wasm"
    {
        "public, max-age=31536000, immutable"
    } else if mime_type.starts_with("text/html") {
        "no-cache, no-store, must-revalidate"
    } else if mime_type.starts_with("application/json") {
        "public, max-age=0, must-revalidate"
    } else if mime_type.starts_with("video/") || mime_type.starts_with("audio/") {
        "public, max-age=86400"
    } else {
        "public, max-age=3600"
    }
}

/// Format a SystemTime as an HTTP date (RFC 7231)
fn format_http_date(time: SystemTime) -> String {
    use chrono::{DateTime, Utc};

    let datetime: DateTime<Utc> = time.into();
    datetime.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn parse_http_date(s: &str) -> Result<SystemTime> {
    use chrono::{NaiveDateTime, Utc};

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%a, %d %b %Y %H:%M:%S GMT") {
        return Ok(dt.and_utc().into());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(s) {
        return Ok(dt.with_timezone(&Utc).into());
    }

    Err(anyhow!("invalid HTTP date: {:?}", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::RouteRegistry;
    use bytes::Bytes;
    use hyper::header::CONTENT_TYPE;
    use hyper::Request;
    use std::sync::Arc;

    fn context(req: Request<Bytes>) -> Context {
        let mut ctx = Context::new(Arc::new(RouteRegistry::new()));
        ctx.reset(req, None);
        ctx
    }

    #[test]
    fn test_contains_dot_dot() {
        assert!(contains_dot_dot("../etc/passwd"));
        assert!(contains_dot_dot("a/../../b"));
        assert!(contains_dot_dot("a\\..\\b"));
        assert!(!contains_dot_dot("a/..b/c"));
        assert!(!contains_dot_dot("file..txt"));
    }

    #[test]
    fn test_resolve() {
        let files = StaticFiles::new("/srv/www");
        assert_eq!(
            files.resolve("/css/site.css").unwrap(),
            PathBuf::from("/srv/www/css/site.css")
        );
        assert_eq!(
            files.resolve("../secret").unwrap_err().code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(
            guess_mime_type(Path::new("test.html")),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            guess_mime_type(Path::new("style.css")),
            "text/css; charset=utf-8"
        );
        assert_eq!(guess_mime_type(Path::new("image.png")), "image/png");
        assert_eq!(
            guess_mime_type(Path::new("unknown.zzzq")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_cache_control() {
        assert!(cache_control("image/png").contains("31536000"));
        assert!(cache_control("font/woff2").contains("31536000"));
        assert!(cache_control("text/html; charset=utf-8").contains("no-cache"));
        assert_eq!(cache_control("application/pdf"), "public, max-age=3600");
    }

    #[test]
    fn test_etag_generation() {
        let etag1 = generate_etag(Path::new("/test.html"), 1000, None);
        let etag2 = generate_etag(Path::new("/test.html"), 1000, None);
        assert_eq!(etag1, etag2);

        let etag3 = generate_etag(Path::new("/test.html"), 2000, None);
        assert_ne!(etag1, etag3);
    }

    #[test]
    fn test_http_date_round_trip_seconds() {
        let now = SystemTime::now();
        let parsed = parse_http_date(&format_http_date(now)).unwrap();
        assert_eq!(unix_secs(parsed), unix_secs(now));
        assert!(parse_http_date("yesterday").is_err());
    }

    #[tokio::test]
    async fn test_serve_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello world").unwrap();
        let files = StaticFiles::new(dir.path());

        let mut ctx = context(Request::new(Bytes::new()));
        files.serve(&mut ctx, "/hello.txt").await.unwrap();

        let res = ctx.response();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), b"hello world");
        assert_eq!(res.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert!(res.headers().contains_key(ETAG));
        assert!(res.headers().contains_key(LAST_MODIFIED));
    }

    #[tokio::test]
    async fn test_conditional_requests() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "let x = 1;").unwrap();
        let files = StaticFiles::new(dir.path());

        let mut ctx = context(Request::new(Bytes::new()));
        files.serve(&mut ctx, "app.js").await.unwrap();
        let etag = ctx.response().headers()[ETAG].clone();
        let last_modified = ctx.response().headers()[LAST_MODIFIED].clone();

        let req = Request::builder()
            .header(IF_NONE_MATCH, etag)
            .body(Bytes::new())
            .unwrap();
        let mut ctx = context(req);
        files.serve(&mut ctx, "app.js").await.unwrap();
        assert_eq!(ctx.response().status(), StatusCode::NOT_MODIFIED);
        assert!(ctx.response().body().is_empty());

        let req = Request::builder()
            .header(IF_MODIFIED_SINCE, last_modified)
            .body(Bytes::new())
            .unwrap();
        let mut ctx = context(req);
        files.serve(&mut ctx, "app.js").await.unwrap();
        assert_eq!(ctx.response().status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_missing_directory_and_oversized() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("big.bin"), vec![0u8; 64]).unwrap();

        let files = StaticFiles::new(dir.path());
        let mut ctx = context(Request::new(Bytes::new()));

        let err = files.serve(&mut ctx, "nope.txt").await.unwrap_err();
        assert_eq!(HttpError::from_error(&err).code(), StatusCode::NOT_FOUND);

        let err = files.serve(&mut ctx, "sub").await.unwrap_err();
        assert_eq!(HttpError::from_error(&err).code(), StatusCode::NOT_FOUND);

        let small = StaticFiles::new(dir.path()).with_max_file_size(10);
        let err = small.serve(&mut ctx, "big.bin").await.unwrap_err();
        assert_eq!(
            HttpError::from_error(&err).code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(!ctx.response().committed());
    }
}
