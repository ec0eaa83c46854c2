//! Request dispatching
//!
//! A [`Dispatcher`] is the frozen form of an [`App`](super::App): the route
//! trie with every handler already wrapped in the global middleware chain,
//! plus the fallback handlers. It is shared read-only by all connections.

use super::context::Context;
use super::error::HttpError;
use super::handler::{ErrorHandlerFunc, HandlerFunc};
use super::header::MIME_APPLICATION_GRPC;
use super::pool::ContextPool;
use crate::mux::{Lookup, RouteRegistry, Router};

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Method, Request, Response};
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Static file fallback: requests under `prefix` go to `handler`.
pub(crate) struct StaticRoute {
    pub(crate) prefix: String,
    pub(crate) handler: HandlerFunc,
}

pub struct Dispatcher {
    pub(crate) router: Router<HandlerFunc>,
    pub(crate) static_route: Option<StaticRoute>,
    pub(crate) grpc: Option<HandlerFunc>,
    pub(crate) not_found: HandlerFunc,
    pub(crate) method_not_allowed: HandlerFunc,
    pub(crate) error_handler: ErrorHandlerFunc,
    pub(crate) pool: ContextPool,
}

impl Dispatcher {
    /// Run one request through routing, the handler chain and error handling.
    pub async fn dispatch(
        &self,
        req: Request<Bytes>,
        remote_addr: Option<SocketAddr>,
    ) -> Response<Full<Bytes>> {
        let mut ctx = self.pool.acquire(req, remote_addr);

        let handler = self.route(&mut ctx);
        if let Err(err) = handler(&mut ctx).await {
            let err = HttpError::from_error(&err);
            debug!("{} {} failed: {}", ctx.method(), ctx.path(), err);
            (self.error_handler)(err, &mut ctx);
        }

        let response = ctx.response_mut().take();
        self.pool.release(ctx);
        response
    }

    /// Pick the handler for the request in `ctx`, filling in path parameters.
    ///
    /// The trie is walked with the raw path so that an encoded `/` stays
    /// inside its segment; captured values are decoded afterwards. A path
    /// that only matches once decoded (a literal segment with escaped
    /// characters) is retried in decoded form.
    fn route(&self, ctx: &mut Context) -> HandlerFunc {
        let method = ctx.method().clone();
        if let Some(grpc) = self.grpc.as_ref().filter(|_| is_grpc(ctx)) {
            debug!("{} {} grpc", method, ctx.path());
            return grpc.clone();
        }

        let raw = match ctx.uri().path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };
        let path = ctx.take_path();

        let mut lookup = self.router.lookup(&method, &raw);
        let mut decoded = false;
        if matches!(lookup, Lookup::NotFound) && raw != path {
            lookup = self.router.lookup(&method, &path);
            decoded = true;
        }

        let handler = match lookup {
            Lookup::Found { handler, params } => {
                debug!("{} {} matched {} params", method, path, params.len());
                for (name, value) in params.iter() {
                    if decoded {
                        ctx.add_param(name, value);
                    } else {
                        ctx.add_param(name, &percent_decode_str(value).decode_utf8_lossy());
                    }
                }
                handler.clone()
            }
            Lookup::MethodNotAllowed { allowed } => {
                debug!("{} {} method not allowed", method, path);
                let allow = allowed
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    ctx.response_mut().headers_mut().insert(ALLOW, value);
                }
                self.method_not_allowed.clone()
            }
            Lookup::NotFound => match &self.static_route {
                Some(route) if under_prefix(&path, &route.prefix) => {
                    debug!("{} {} static", method, path);
                    route.handler.clone()
                }
                _ => {
                    debug!("{} {} not found", method, path);
                    self.not_found.clone()
                }
            },
        };

        ctx.restore_path(path);
        handler
    }

    pub fn router(&self) -> &Router<HandlerFunc> {
        &self.router
    }

    pub fn routes(&self) -> &Arc<RouteRegistry> {
        self.router.registry()
    }

    /// Idle contexts waiting in the pool.
    pub fn idle_contexts(&self) -> usize {
        self.pool.idle_count()
    }
}

/// `path` equals `prefix` or continues it with a new segment.
fn under_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

/// A gRPC call: POST with an `application/grpc*` content type.
fn is_grpc(ctx: &Context) -> bool {
    ctx.method() == Method::POST
        && ctx
            .header(CONTENT_TYPE.as_str())
            .map_or(false, |ct| ct.starts_with(MIME_APPLICATION_GRPC))
}

#[cfg(test)]
mod tests {
    use super::super::{handler, App};
    use super::under_prefix;
    use hyper::{Method, Request, StatusCode};

    #[test]
    fn test_under_prefix() {
        assert!(under_prefix("/assets", "/assets"));
        assert!(under_prefix("/assets/app.css", "/assets"));
        assert!(!under_prefix("/assetsX/app.css", "/assets"));
        assert!(!under_prefix("/other", "/assets"));
        assert!(under_prefix("/app.css", "/"));
    }

    #[tokio::test]
    async fn test_contexts_are_pooled() {
        let mut app = App::new();
        app.get(
            "ping",
            "/ping",
            handler(|c| Box::pin(async move { c.string(StatusCode::OK, "pong") })),
        );
        let dispatcher = app.into_dispatcher();

        for _ in 0..3 {
            let req = Request::builder()
                .method(Method::GET)
                .uri("/ping")
                .body(bytes::Bytes::new())
                .unwrap();
            let res = dispatcher.dispatch(req, None).await;
            assert_eq!(res.status(), StatusCode::OK);
        }
        assert_eq!(dispatcher.idle_contexts(), 1);
    }

    #[tokio::test]
    async fn test_params_do_not_leak_between_requests() {
        let mut app = App::new();
        app.get(
            "show",
            "/u/:id",
            handler(|c| {
                Box::pin(async move {
                    let body = format!("{:?}", c.params());
                    c.string(StatusCode::OK, &body)
                })
            }),
        );
        app.get(
            "list",
            "/u",
            handler(|c| {
                Box::pin(async move {
                    let body = format!("{:?}", c.params());
                    c.string(StatusCode::OK, &body)
                })
            }),
        );
        let dispatcher = app.into_dispatcher();

        let req = Request::get("/u/7").body(bytes::Bytes::new()).unwrap();
        dispatcher.dispatch(req, None).await;

        let req = Request::get("/u").body(bytes::Bytes::new()).unwrap();
        let res = dispatcher.dispatch(req, None).await;
        let body = http_body_util::BodyExt::collect(res.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&body[..], b"[]");
    }
}
