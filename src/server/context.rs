//! Per-request context
//!
//! A [`Context`] is the request view handed to handlers together with the
//! buffered [`Response`] they write into. Contexts are pooled by the
//! dispatcher and reset between requests.

use super::error::HttpError;
use super::handler::HandlerResult;
use super::header::*;
use super::render::Renderer;
use super::response::Response;
use super::static_files::StaticFiles;
use crate::mux::{RouteError, RouteRegistry};

use anyhow::anyhow;
use bytes::Bytes;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use hyper::http::Extensions;
use hyper::{Method, Request, StatusCode, Uri, Version};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

pub struct Context {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    /// Percent-decoded request path
    path: String,
    params: Vec<(String, String)>,
    data: Extensions,
    response: Response,
    routes: Arc<RouteRegistry>,
    renderer: Option<Arc<dyn Renderer>>,
}

impl Context {
    pub fn new(routes: Arc<RouteRegistry>) -> Self {
        Self {
            method: Method::GET,
            uri: Uri::default(),
            version: Version::default(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            path: String::new(),
            params: Vec::new(),
            data: Extensions::new(),
            response: Response::new(),
            routes,
            renderer: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Option<Arc<dyn Renderer>>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Load a new request, dropping everything left by the previous one.
    pub(crate) fn reset(&mut self, req: Request<Bytes>, remote_addr: Option<SocketAddr>) {
        let (parts, body) = req.into_parts();
        self.path = decode_path(parts.uri.path());
        self.method = parts.method;
        self.uri = parts.uri;
        self.version = parts.version;
        self.headers = parts.headers;
        self.body = body;
        self.remote_addr = remote_addr;
        self.params.clear();
        self.data.clear();
        self.response.reset();
    }

    /// Release request data held while the context sits idle.
    pub(crate) fn clear(&mut self) {
        self.headers.clear();
        self.body = Bytes::new();
        self.remote_addr = None;
        self.params.clear();
        self.data.clear();
        self.response.reset();
    }

    // === Request ===

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a request header, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Client address, trusting `X-Forwarded-For` and `X-Real-IP` first.
    pub fn real_ip(&self) -> String {
        if let Some(forwarded) = self.header(X_FORWARDED_FOR).filter(|v| !v.is_empty()) {
            return forwarded
                .split(',')
                .next()
                .unwrap_or(forwarded)
                .trim()
                .to_string();
        }
        if let Some(ip) = self.header(X_REAL_IP).filter(|v| !v.is_empty()) {
            return ip.to_string();
        }
        self.remote_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default()
    }

    /// Value of a named cookie from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.trim_matches('"'))
    }

    // === Route parameters ===

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub(crate) fn add_param(&mut self, name: &str, value: &str) {
        self.params.push((name.to_string(), value.to_string()));
    }

    pub(crate) fn take_path(&mut self) -> String {
        std::mem::take(&mut self.path)
    }

    pub(crate) fn restore_path(&mut self, path: String) {
        self.path = path;
    }

    // === Query and form ===

    pub fn query(&self) -> Vec<(String, String)> {
        self.uri.query().map(parse_urlencoded).unwrap_or_default()
    }

    pub fn query_value(&self, key: &str) -> Option<String> {
        self.query().into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn query_values(&self, key: &str) -> Vec<String> {
        self.query()
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v)
            .collect()
    }

    /// Fields of an `application/x-www-form-urlencoded` body.
    pub fn form(&self) -> Vec<(String, String)> {
        let is_form = self
            .header(CONTENT_TYPE.as_str())
            .map_or(false, |ct| ct.starts_with(MIME_APPLICATION_FORM));
        if !is_form {
            return Vec::new();
        }
        std::str::from_utf8(&self.body)
            .map(parse_urlencoded)
            .unwrap_or_default()
    }

    pub fn form_value(&self, name: &str) -> Option<String> {
        self.form().into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn form_values(&self, name: &str) -> Vec<String> {
        self.form()
            .into_iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v)
            .collect()
    }

    /// Decode a JSON request body.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| HttpError::bad_request(format!("invalid JSON body: {}", e)))
    }

    // === Request scoped data ===

    pub fn set<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.data.insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.data.get::<T>()
    }

    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.data.remove::<T>()
    }

    // === Reverse routing ===

    pub fn try_reverse(&self, name: &str, values: &[&dyn Display]) -> Result<String, RouteError> {
        self.routes.reverse(name, values)
    }

    pub fn reverse(&self, name: &str, values: &[&dyn Display]) -> String {
        match self.try_reverse(name, values) {
            Ok(uri) => uri,
            Err(e) => panic!("reverse error: {}", e),
        }
    }

    // === Response ===

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn write_header(&mut self, status: StatusCode) {
        self.response.write_header(status);
    }

    /// Wrap `err` as an [`HttpError`] unless it already is one.
    pub fn error<E>(&self, status: StatusCode, err: E) -> HttpError
    where
        E: Into<anyhow::Error>,
    {
        let err = err.into();
        match err.downcast::<HttpError>() {
            Ok(http) => http,
            Err(err) => HttpError::new(status, err.to_string()),
        }
    }

    pub fn no_content(&mut self, status: StatusCode) -> HandlerResult {
        self.write_header(status);
        Ok(())
    }

    pub fn string(&mut self, status: StatusCode, s: &str) -> HandlerResult {
        self.blob(status, MIME_TEXT_PLAIN_UTF8, s.as_bytes())
    }

    pub fn html(&mut self, status: StatusCode, html: &str) -> HandlerResult {
        self.blob(status, MIME_TEXT_HTML_UTF8, html.as_bytes())
    }

    pub fn blob(&mut self, status: StatusCode, content_type: &str, body: &[u8]) -> HandlerResult {
        let value = HeaderValue::from_str(content_type)?;
        self.response.headers_mut().insert(CONTENT_TYPE, value);
        self.write_header(status);
        self.response.write(body);
        Ok(())
    }

    /// Render template `name` with `data` and send it as HTML.
    pub fn render<T: Serialize + ?Sized>(
        &mut self,
        status: StatusCode,
        name: &str,
        data: &T,
    ) -> HandlerResult {
        let renderer = self
            .renderer
            .clone()
            .ok_or_else(|| anyhow!("no renderer registered for template {:?}", name))?;
        let data = serde_json::to_value(data)?;
        let html = renderer.render(name, &data)?;
        self.html(status, &html)
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> HandlerResult {
        let body = serde_json::to_vec(value)
            .map_err(|e| self.error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
        self.blob(status, MIME_APPLICATION_JSON_UTF8, &body)
    }

    pub fn redirect(&mut self, status: StatusCode, url: &str) -> HandlerResult {
        if !(300..=308).contains(&status.as_u16()) {
            return Err(HttpError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "invalid redirect status code",
            )
            .into());
        }
        let value = HeaderValue::from_str(url)?;
        self.response.headers_mut().insert(LOCATION, value);
        self.write_header(status);
        Ok(())
    }

    pub fn set_cookie(&mut self, cookie: &str) -> HandlerResult {
        let value = HeaderValue::from_str(cookie)?;
        self.response.headers_mut().append(SET_COOKIE, value);
        Ok(())
    }

    /// Send `file` from below `root`.
    pub async fn file(&mut self, root: impl AsRef<Path>, file: &str) -> HandlerResult {
        StaticFiles::new(root.as_ref()).serve(self, file).await
    }
}

/// Percent-decode a request path.
fn decode_path(raw: &str) -> String {
    if raw.is_empty() {
        return "/".to_string();
    }
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Parse `a=1&b=x+y` style pairs.
pub(crate) fn parse_urlencoded(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(k), decode_component(v))
        })
        .collect()
}

fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    percent_decode_str(&s).decode_utf8_lossy().into_owned()
}
