//! CORS middleware

use crate::server::{handler, middleware, MiddlewareFunc};

use hyper::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
};
use hyper::{Method, StatusCode};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct CorsOptions {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds
    pub max_age: u64,
}

impl Default for CorsOptions {
    /// Any origin, the common methods and headers, two days of preflight cache.
    fn default() -> Self {
        let strings = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        Self {
            allowed_origins: strings(&["*"]),
            allowed_methods: strings(&["GET", "POST", "PUT", "DELETE", "OPTIONS"]),
            allowed_headers: strings(&[
                "Content-Length",
                "Content-Type",
                "Authorization",
                "X-CSRF-Token",
            ]),
            allow_credentials: true,
            max_age: 172800,
        }
    }
}

impl CorsOptions {
    fn headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let values = [
            (ACCESS_CONTROL_ALLOW_ORIGIN, self.allowed_origins.join(", ")),
            (ACCESS_CONTROL_ALLOW_METHODS, self.allowed_methods.join(", ")),
            (ACCESS_CONTROL_ALLOW_HEADERS, self.allowed_headers.join(", ")),
            (ACCESS_CONTROL_MAX_AGE, self.max_age.to_string()),
            (
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                self.allow_credentials.to_string(),
            ),
        ];

        values
            .into_iter()
            .filter_map(|(name, value)| match HeaderValue::from_str(&value) {
                Ok(value) => Some((name, value)),
                Err(_) => {
                    warn!("skipping invalid CORS header {}: {:?}", name, value);
                    None
                }
            })
            .collect()
    }
}

/// Add `Access-Control-*` headers to every response. Preflight `OPTIONS`
/// requests are answered with 204 without reaching the handler.
pub fn cors(options: CorsOptions) -> MiddlewareFunc {
    let headers = Arc::new(options.headers());
    middleware(move |next| {
        let headers = headers.clone();
        handler(move |c| {
            let next = next.clone();
            let headers = headers.clone();
            Box::pin(async move {
                let response = c.response_mut().headers_mut();
                for (name, value) in headers.iter() {
                    response.insert(name.clone(), value.clone());
                }

                if c.method() == Method::OPTIONS {
                    return c.no_content(StatusCode::NO_CONTENT);
                }
                next(c).await
            })
        })
    })
}
