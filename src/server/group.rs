//! Route groups

use super::app::App;
use super::handler::{HandlerFunc, MiddlewareFunc};
use crate::mux::RouteError;

use hyper::Method;

/// A set of routes sharing a path prefix and middleware.
///
/// Group middleware wraps outside of route-specific middleware, and nested
/// groups start with their parent's middleware.
pub struct Group<'a> {
    app: &'a mut App,
    prefix: String,
    middleware: Vec<MiddlewareFunc>,
}

impl<'a> Group<'a> {
    pub(crate) fn new(app: &'a mut App, prefix: &str) -> Self {
        Self {
            app,
            prefix: join("", prefix),
            middleware: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn use_middleware(&mut self, m: MiddlewareFunc) -> &mut Self {
        self.middleware.push(m);
        self
    }

    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group {
            prefix: join(&self.prefix, prefix),
            middleware: self.middleware.clone(),
            app: &mut *self.app,
        }
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

    pub fn try_route_with(
        &mut self,
        name: &str,
        method: Method,
        pattern: &str,
        h: HandlerFunc,
        middleware: &[MiddlewareFunc],
    ) -> Result<&mut Self, RouteError> {
        let chain: Vec<MiddlewareFunc> = self
            .middleware
            .iter()
            .chain(middleware)
            .cloned()
            .collect();
        let pattern = join(&self.prefix, pattern);
        self.app.try_route_with(name, method, &pattern, h, &chain)?;
        Ok(self)
    }

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
            Ok(group) => group,
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
}

/// `prefix` + `pattern` with exactly one `/` between them. An empty
/// pattern names the prefix itself.
fn join(prefix: &str, pattern: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let pattern = pattern.trim_start_matches('/');
    match (prefix.is_empty(), pattern.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => prefix.to_string(),
        (true, false) => format!("/{}", pattern),
        (false, false) => format!("{}/{}", prefix, pattern),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::handler;

    fn noop() -> HandlerFunc {
        handler(|_c| Box::pin(async { Ok(()) }))
    }

    #[test]
    fn test_join() {
        assert_eq!(join("", "api"), "/api");
        assert_eq!(join("/api/", "/users"), "/api/users");
        assert_eq!(join("/api", ""), "/api");
        assert_eq!(join("", ""), "/");
    }

    #[test]
    fn test_nested_prefixes() {
        let mut app = App::new();
        {
            let mut api = app.group("api");
            api.get("ping", "ping", noop());
            let mut v1 = api.group("/v1/");
            v1.get("user", "/users/:id", noop());
            assert_eq!(v1.prefix(), "/api/v1");
        }
        assert_eq!(app.reverse("ping", &[]), "/api/ping");
        assert_eq!(app.reverse("user", &[&"42"]), "/api/v1/users/42");
    }
}
