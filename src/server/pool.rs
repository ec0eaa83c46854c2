//! Context pool
//!
//! Contexts keep their header map, body buffer and extension storage between
//! requests. Acquire and release are the only synchronized operations.

use super::context::Context;
use super::render::Renderer;
use crate::mux::RouteRegistry;

use bytes::Bytes;
use hyper::Request;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;

/// Idle contexts kept by default.
pub const DEFAULT_MAX_IDLE: usize = 1024;

pub struct ContextPool {
    idle: Mutex<Vec<Context>>,
    max_idle: usize,
    routes: Arc<RouteRegistry>,
    renderer: Option<Arc<dyn Renderer>>,
}

impl ContextPool {
    pub fn new(routes: Arc<RouteRegistry>) -> Self {
        Self::with_max_idle(routes, DEFAULT_MAX_IDLE)
    }

    pub fn with_max_idle(routes: Arc<RouteRegistry>, max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            routes,
            renderer: None,
        }
    }

    /// Contexts built by this pool render templates with `renderer`.
    pub fn with_renderer(mut self, renderer: Option<Arc<dyn Renderer>>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Take an idle context, or build one, and load `req` into it.
    pub fn acquire(&self, req: Request<Bytes>, remote_addr: Option<SocketAddr>) -> Context {
        let pooled = self.idle.lock().pop();
        let mut ctx = pooled.unwrap_or_else(|| {
            Context::new(self.routes.clone()).with_renderer(self.renderer.clone())
        });
        ctx.reset(req, remote_addr);
        ctx
    }

    /// Hand a finished context back. Contexts beyond the idle cap are dropped.
    pub fn release(&self, mut ctx: Context) {
        ctx.clear();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(ctx);
        }
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}
