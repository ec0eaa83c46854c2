//! HTTP Server module
//!
//! Application building ([`App`], [`Group`]), request dispatching and the
//! connection loop, using Hyper and Tokio.

/// Per-method shorthands over `route`.
macro_rules! method_routes {
    ($($name:ident => $method:ident),+ $(,)?) => {
        $(
            #[doc = concat!("Register a `", stringify!($method), "` route. Panics on a registration error.")]
            pub fn $name(
                &mut self,
                name: &str,
                pattern: &str,
                h: $crate::server::HandlerFunc,
            ) -> &mut Self {
                self.route(name, ::hyper::Method::$method, pattern, h)
            }
        )+
    };
}

mod app;
mod context;
mod dispatch;
mod error;
mod group;
mod handler;
pub mod header;
mod pool;
mod render;
mod response;
mod static_files;

pub use app::App;
pub use context::Context;
pub use dispatch::Dispatcher;
pub use error::HttpError;
pub use group::Group;
pub use handler::{
    apply_middleware, default_error_handler, default_method_not_allowed_handler,
    default_not_found_handler, handler, json_error_handler, middleware, text_error_handler,
    ErrorHandlerFunc, HandlerFunc, HandlerResult, MiddlewareFunc,
};
pub use pool::ContextPool;
pub use render::{Renderer, TeraRenderer};
pub use response::Response;
pub use static_files::{contains_dot_dot, StaticFiles};

use crate::config::ServerConfig;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE, SERVER};
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use socket2::{SockRef, TcpKeepalive};
use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// velomux HTTP Server
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Bind the configured address and run the server
    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = self.config.listen_addr()?;

        info!("Starting velomux on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on http://{}", addr);

        self.serve(listener).await
    }

    /// Accept connections from `listener` until an error or cancellation.
    /// HTTP/1.1 and cleartext HTTP/2 are both accepted.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let max_body_size = self.config.max_body_size_bytes()?;
        let builder = auto::Builder::new(TokioExecutor::new());

        loop {
            let (stream, remote_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Accept error: {}", e);
                    continue;
                }
            };
            debug!("Accepted connection from {}", remote_addr);
            self.configure_stream(&stream);

            let dispatcher = self.dispatcher.clone();
            let builder = builder.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let dispatcher = dispatcher.clone();
                    async move { handle_request(req, remote_addr, dispatcher, max_body_size).await }
                });

                if let Err(e) = builder
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    if !is_connection_closed_error(&*e) {
                        error!("Connection error: {}", e);
                    }
                }
            });
        }
    }

    fn configure_stream(&self, stream: &TcpStream) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {}", e);
        }
        if let Some(period) = self.config.tcp_keepalive() {
            let keepalive = TcpKeepalive::new().with_time(period);
            if let Err(e) = SockRef::from(stream).set_tcp_keepalive(&keepalive) {
                warn!("Failed to enable TCP keep-alive: {}", e);
            }
        }
    }
}

/// Check if error is just a closed connection (not worth logging)
fn is_connection_closed_error(e: &(dyn Error + 'static)) -> bool {
    let mut source = Some(e);
    while let Some(err) = source {
        if let Some(hyper_err) = err.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() {
                return true;
            }
        }
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            );
        }
        source = err.source();
    }
    false
}

/// Collect the body under the size limit and dispatch.
async fn handle_request(
    req: Request<Incoming>,
    remote_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    max_body_size: usize,
) -> Result<hyper::Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let (parts, body) = req.into_parts();
    let mut response = match Limited::new(body, max_body_size).collect().await {
        Ok(body) => {
            let req = Request::from_parts(parts, body.to_bytes());
            dispatcher.dispatch(req, Some(remote_addr)).await
        }
        Err(e) => {
            let status = if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                StatusCode::PAYLOAD_TOO_LARGE
            } else {
                StatusCode::BAD_REQUEST
            };
            warn!("Failed to read body from {}: {}", remote_addr, e);
            plain_response(status)
        }
    };

    response
        .headers_mut()
        .entry(SERVER)
        .or_insert(HeaderValue::from_static(crate::SERVER_NAME));

    info!(
        "{} {} {} {} {:?}",
        remote_addr,
        method,
        uri,
        response.status().as_u16(),
        start.elapsed()
    );

    Ok(response)
}

fn plain_response(status: StatusCode) -> hyper::Response<Full<Bytes>> {
    let reason = status.canonical_reason().unwrap_or("error");
    let mut response = hyper::Response::new(Full::new(Bytes::from(reason)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(header::MIME_TEXT_PLAIN_UTF8),
    );
    response
}
