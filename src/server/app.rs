//! Application builder
//!
//! [`App`] collects routes, middleware and fallback handlers during startup.
//! [`App::into_dispatcher`] freezes it into the shared [`Dispatcher`].

use super::dispatch::{Dispatcher, StaticRoute};
use super::group::Group;
use super::handler::*;
use super::pool::ContextPool;
use super::render::Renderer;
use super::static_files::StaticFiles;
use super::Server;
use crate::config::Config;
use crate::mux::{pattern, RouteError, Router};

use hyper::Method;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub struct App {
    config: Config,
    router: Router<HandlerFunc>,
    middleware: Vec<MiddlewareFunc>,
    static_files: Option<(String, StaticFiles)>,
    renderer: Option<Arc<dyn Renderer>>,
    grpc: Option<HandlerFunc>,
    not_found: HandlerFunc,
    method_not_allowed: HandlerFunc,
    error_handler: ErrorHandlerFunc,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Build an app, serving `[static_files]` from `config` if present.
    pub fn with_config(config: Config) -> Self {
        let static_files = config.static_files.clone();
        let mut app = Self {
            config,
            router: Router::new(),
            middleware: Vec::new(),
            static_files: None,
            renderer: None,
            grpc: None,
            not_found: default_not_found_handler(),
            method_not_allowed: default_method_not_allowed_handler(),
            error_handler: default_error_handler(),
        };
        if let Some(files) = static_files {
            app.static_files(files.root, &files.prefix);
        }
        app
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Add middleware applied to every request, routed or not.
    /// The first one added runs outermost.
    pub fn use_middleware(&mut self, m: MiddlewareFunc) -> &mut Self {
        self.middleware.push(m);
        self
    }

    /// Routes registered through the group get `prefix` and the group's
    /// middleware.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group::new(self, prefix)
    }

    /// Serve files below `root` for unmatched requests under `prefix`.
    pub fn static_files(&mut self, root: impl Into<PathBuf>, prefix: &str) -> &mut Self {
        let prefix = pattern::normalize(prefix);
        let files = StaticFiles::new(root);
        debug!("static files {:?} under {}", files.root(), prefix);
        self.static_files = Some((prefix, files));
        self
    }

    /// Template engine behind [`Context::render`](super::Context::render).
    pub fn renderer(&mut self, renderer: Arc<dyn Renderer>) -> &mut Self {
        self.renderer = Some(renderer);
        self
    }

    /// Hand every gRPC call (POST with an `application/grpc*` content type)
    /// to `h` instead of the router.
    pub fn grpc_handler(&mut self, h: HandlerFunc) -> &mut Self {
        self.grpc = Some(h);
        self
    }

    pub fn not_found_handler(&mut self, h: HandlerFunc) -> &mut Self {
        self.not_found = h;
        self
    }

    pub fn method_not_allowed_handler(&mut self, h: HandlerFunc) -> &mut Self {
        self.method_not_allowed = h;
        self
    }

    pub fn error_handler(&mut self, h: ErrorHandlerFunc) -> &mut Self {
        self.error_handler = h;
        self
    }

    pub fn try_route(
        &mut self,
        name: &str,
        method: Method,
        pattern: &str,
        h: HandlerFunc,
    ) -> Result<&mut Self, RouteError> {
        self.try_route_with(name, method, pattern, h, &[])
    }

    /// Register a route whose handler is wrapped in `middleware` first.
    pub fn try_route_with(
        &mut self,
        name: &str,
        method: Method,
        pattern: &str,
        h: HandlerFunc,
        middleware: &[MiddlewareFunc],
    ) -> Result<&mut Self, RouteError> {
        self.router
            .insert(name, method, pattern, apply_middleware(h, middleware))?;
        Ok(self)
    }

    /// Like [`App::try_route`], but a bad registration aborts startup.
    pub fn route(&mut self, name: &str, method: Method, pattern: &str, h: HandlerFunc) -> &mut Self {
        self.route_with(name, method, pattern, h, &[])
    }

    pub fn route_with(
        &mut self,
        name: &str,
        method: Method,
        pattern: &str,
        h: HandlerFunc,
        middleware: &[MiddlewareFunc],
    ) -> &mut Self {
        match self.try_route_with(name, method, pattern, h, middleware) {
            Ok(app) => app,
            Err(e) => panic!("route error: {}", e),
        }
    }

    method_routes! {
        connect => CONNECT,
        delete => DELETE,
        get => GET,
        head => HEAD,
        options => OPTIONS,
        patch => PATCH,
        post => POST,
        put => PUT,
        trace => TRACE,
    }

    pub fn router(&self) -> &Router<HandlerFunc> {
        &self.router
    }

    pub fn try_reverse(&self, name: &str, values: &[&dyn Display]) -> Result<String, RouteError> {
        self.router.try_reverse(name, values)
    }

    pub fn reverse(&self, name: &str, values: &[&dyn Display]) -> String {
        self.router.reverse(name, values)
    }

    /// Freeze the app. Global middleware is wrapped around every handler
    /// here, once, instead of per request.
    pub fn into_dispatcher(self) -> Dispatcher {
        let App {
            router,
            middleware,
            static_files,
            renderer,
            grpc,
            not_found,
            method_not_allowed,
            error_handler,
            ..
        } = self;

        let wrap = |h: HandlerFunc| apply_middleware(h, &middleware);

        let static_route = static_files.map(|(prefix, files)| StaticRoute {
            handler: wrap(static_handler(prefix.clone(), files)),
            prefix,
        });
        let grpc = grpc.map(wrap);
        let not_found = wrap(not_found);
        let method_not_allowed = wrap(method_not_allowed);
        let router = router.map(wrap);
        let pool = ContextPool::new(router.registry().clone()).with_renderer(renderer);

        Dispatcher {
            router,
            static_route,
            grpc,
            not_found,
            method_not_allowed,
            error_handler,
            pool,
        }
    }

    /// Bind the configured address and serve until the future is dropped.
    pub async fn serve(self) -> anyhow::Result<()> {
        let config = self.config.server.clone();
        let server = Server::new(config, self.into_dispatcher());
        server.run().await
    }
}

/// Serve the request path, minus `prefix`, from `files`.
fn static_handler(prefix: String, files: StaticFiles) -> HandlerFunc {
    let prefix: Arc<str> = prefix.into();
    let files = Arc::new(files);
    handler(move |c| {
        let prefix = prefix.clone();
        let files = files.clone();
        Box::pin(async move {
            let rel = c
                .path()
                .strip_prefix(&*prefix)
                .unwrap_or_default()
                .to_string();
            files.serve(c, &rel).await
        })
    })
}
