//! Handler, middleware and error handler types

use super::context::Context;
use super::error::HttpError;
use super::header::{MIME_TEXT_PLAIN_UTF8, NOSNIFF};

use futures::future::BoxFuture;
use hyper::header::{HeaderValue, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use hyper::StatusCode;
use std::sync::Arc;
use tracing::warn;

pub type HandlerResult = anyhow::Result<()>;

/// Responds to a request by writing into the context.
pub type HandlerFunc =
    Arc<dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync>;

/// Wraps a handler into another one.
pub type MiddlewareFunc = Arc<dyn Fn(HandlerFunc) -> HandlerFunc + Send + Sync>;

/// Writes the client-visible response for a failed request.
pub type ErrorHandlerFunc = Arc<dyn Fn(HttpError, &mut Context) + Send + Sync>;

/// Build a [`HandlerFunc`] from a closure.
///
/// ```
/// use velomux::server::handler;
/// use hyper::StatusCode;
///
/// let hello = handler(|c| Box::pin(async move { c.string(StatusCode::OK, "hello") }));
/// ```
pub fn handler<F>(f: F) -> HandlerFunc
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Build a [`MiddlewareFunc`] from a closure.
pub fn middleware<F>(f: F) -> MiddlewareFunc
where
    F: Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Compose `middleware` around `h`. The first entry is the outermost.
pub fn apply_middleware(h: HandlerFunc, middleware: &[MiddlewareFunc]) -> HandlerFunc {
    middleware.iter().rev().fold(h, |h, m| m(h))
}

pub fn default_not_found_handler() -> HandlerFunc {
    handler(|c| {
        Box::pin(async move {
            c.response_mut()
                .headers_mut()
                .insert(X_CONTENT_TYPE_OPTIONS, NOSNIFF);
            c.string(StatusCode::NOT_FOUND, "not found")
        })
    })
}

pub fn default_method_not_allowed_handler() -> HandlerFunc {
    handler(|c| {
        Box::pin(async move {
            c.response_mut()
                .headers_mut()
                .insert(X_CONTENT_TYPE_OPTIONS, NOSNIFF);
            c.string(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        })
    })
}

/// Plain-text error response: status line message as the body.
pub fn text_error_handler(err: HttpError, c: &mut Context) {
    if c.response().committed() {
        warn!("response already written, dropping error: {}", err);
        return;
    }
    let headers = c.response_mut().headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(MIME_TEXT_PLAIN_UTF8));
    headers.insert(X_CONTENT_TYPE_OPTIONS, NOSNIFF);
    c.write_header(err.code());
    c.response_mut().write(err.message().as_bytes());
}

/// JSON error response: `{"code":404,"msg":"..."}`.
pub fn json_error_handler(err: HttpError, c: &mut Context) {
    if c.response().committed() {
        warn!("response already written, dropping error: {}", err);
        return;
    }
    if let Err(e) = c.json(err.code(), &err) {
        warn!("failed to encode error response: {}", e);
    }
}

pub fn default_error_handler() -> ErrorHandlerFunc {
    Arc::new(text_error_handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::RouteRegistry;
    use bytes::Bytes;
    use hyper::Request;
    use parking_lot::Mutex;

    fn context() -> Context {
        let mut ctx = Context::new(Arc::new(RouteRegistry::new()));
        ctx.reset(Request::new(Bytes::new()), None);
        ctx
    }

    fn tracer(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> MiddlewareFunc {
        middleware(move |next| {
            let log = log.clone();
            handler(move |c| {
                let next = next.clone();
                let log = log.clone();
                Box::pin(async move {
                    log.lock().push(format!("{} in", name));
                    let res = next(c).await;
                    log.lock().push(format!("{} out", name));
                    res
                })
            })
        })
    }

    #[tokio::test]
    async fn test_first_middleware_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner_log = log.clone();
        let h = handler(move |_c| {
            let log = inner_log.clone();
            Box::pin(async move {
                log.lock().push("handler".to_string());
                Ok(())
            })
        });

        let chain = [tracer("a", log.clone()), tracer("b", log.clone())];
        let h = apply_middleware(h, &chain);

        let mut ctx = context();
        h(&mut ctx).await.unwrap();
        assert_eq!(
            *log.lock(),
            vec!["a in", "b in", "handler", "b out", "a out"]
        );
    }

    #[tokio::test]
    async fn test_default_not_found() {
        let mut ctx = context();
        default_not_found_handler()(&mut ctx).await.unwrap();
        assert_eq!(ctx.response().status(), StatusCode::NOT_FOUND);
        assert_eq!(ctx.response().headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(ctx.response().body(), b"not found");
    }

    #[test]
    fn test_error_handlers() {
        let mut ctx = context();
        text_error_handler(HttpError::forbidden(), &mut ctx);
        assert_eq!(ctx.response().status(), StatusCode::FORBIDDEN);
        assert_eq!(ctx.response().body(), b"403 Forbidden");

        let mut ctx = context();
        json_error_handler(HttpError::not_found(), &mut ctx);
        assert_eq!(ctx.response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ctx.response().body(),
            br#"{"code":404,"msg":"404 page not found"}"#
        );
    }

    #[test]
    fn test_error_handler_keeps_committed_response() {
        let mut ctx = context();
        ctx.string(StatusCode::OK, "partial").unwrap();
        text_error_handler(HttpError::internal(), &mut ctx);
        assert_eq!(ctx.response().status(), StatusCode::OK);
        assert_eq!(ctx.response().body(), b"partial");
    }
}
