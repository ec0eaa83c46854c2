//! Path router
//!
//! Patterns are compiled into a compressed byte trie ([`entry::Entry`]).
//! Static segments match verbatim, `:name` segments capture one path segment.
//! When a static edge and a parameter edge both apply, the static one wins.
//!
//! ```
//! use velomux::mux::{Lookup, Router};
//! use hyper::Method;
//!
//! let mut router = Router::new();
//! router.insert("user", Method::GET, "/users/:id", "show").unwrap();
//! router.insert("new-user", Method::GET, "/users/new", "new").unwrap();
//!
//! match router.lookup(&Method::GET, "/users/42") {
//!     Lookup::Found { handler, params } => {
//!         assert_eq!(*handler, "show");
//!         assert_eq!(params.get("id"), Some("42"));
//!     }
//!     _ => unreachable!(),
//! }
//! ```

pub mod entity;
pub mod entry;
pub mod pattern;

pub use entity::{Entity, NamedRoute, RouteRegistry};
pub use entry::Entry;

use hyper::Method;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Registration and reverse routing failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("route name can not be empty")]
    EmptyName,
    #[error("route name {0:?} already registered")]
    DuplicateName(String),
    #[error("method {method} already registered for {pattern:?}")]
    DuplicateMethod { method: Method, pattern: String },
    #[error("invalid parameter in pattern {0:?}")]
    InvalidParam(String),
    #[error("pattern {pattern:?} conflicts with {existing:?}")]
    Conflict { pattern: String, existing: String },
    #[error("unknown route {0:?}")]
    UnknownRoute(String),
    #[error("route {name:?} needs {expected} params but got {got}")]
    ParamCount {
        name: String,
        expected: usize,
        got: usize,
    },
}

/// Captured parameters of a match, zipped with the entity's names.
#[derive(Debug, Clone)]
pub struct Params<'r, 'p> {
    names: &'r [String],
    values: Vec<&'p str>,
}

impl<'r, 'p> Params<'r, 'p> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&'p str> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'r str, &'p str)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// Outcome of a lookup.
#[derive(Debug)]
pub enum Lookup<'r, 'p, H> {
    Found { handler: &'r H, params: Params<'r, 'p> },
    /// The path matched but no handler exists for the method.
    MethodNotAllowed { allowed: &'r [Method] },
    NotFound,
}

impl<H> Lookup<'_, '_, H> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found { .. })
    }
}

/// Route table: trie, entities and names.
#[derive(Debug)]
pub struct Router<H> {
    root: Entry<usize>,
    entities: Vec<Entity<H>>,
    /// pattern shape -> entity index
    shapes: HashMap<String, usize>,
    registry: Arc<RouteRegistry>,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Self {
            root: Entry::root(),
            entities: Vec::new(),
            shapes: HashMap::new(),
            registry: Arc::new(RouteRegistry::new()),
        }
    }

    /// Register `handler` for `method` on `pattern` under a unique `name`.
    ///
    /// A pattern without a leading `/` gets one. Registering a second method on
    /// a known pattern reuses its entity.
    pub fn insert(
        &mut self,
        name: &str,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<(), RouteError> {
        if name.is_empty() {
            return Err(RouteError::EmptyName);
        }
        if self.registry.contains(name) {
            return Err(RouteError::DuplicateName(name.to_string()));
        }

        let pattern = pattern::normalize(pattern);
        pattern::validate(&pattern)?;

        let shape = pattern::shape(&pattern);
        match self.shapes.get(&shape).copied() {
            Some(id) => {
                let entity = &mut self.entities[id];
                if entity.pattern() != pattern {
                    return Err(RouteError::Conflict {
                        pattern,
                        existing: entity.pattern().to_string(),
                    });
                }
                entity.add_handler(method.clone(), handler)?;
            }
            None => {
                let id = self.entities.len();
                let mut names = Vec::new();
                self.root.insert(pattern.as_bytes(), id, &mut names);
                debug_assert_eq!(names.len(), pattern::param_names(&pattern).len());

                let mut entity = Entity::new(pattern.clone(), names);
                entity.add_handler(method.clone(), handler)?;
                self.entities.push(entity);
                self.shapes.insert(shape, id);
            }
        }

        debug!("route {} {} {}", name, method, pattern);
        Arc::make_mut(&mut self.registry).register(name, method, &pattern)
    }

    /// Resolve `path` for `method`.
    pub fn lookup<'r, 'p>(&'r self, method: &Method, path: &'p str) -> Lookup<'r, 'p, H> {
        let mut values = Vec::new();
        let id = match self.root.find(path, &mut values) {
            Some(&id) => id,
            None => return Lookup::NotFound,
        };

        let entity = &self.entities[id];
        match entity.handler(method) {
            Some(handler) => Lookup::Found {
                handler,
                params: Params {
                    names: entity.param_names(),
                    values,
                },
            },
            None => Lookup::MethodNotAllowed {
                allowed: entity.methods(),
            },
        }
    }

    /// Entity registered for exactly this pattern.
    pub fn entity(&self, pattern: &str) -> Option<&Entity<H>> {
        let pattern = pattern::normalize(pattern);
        self.shapes
            .get(&pattern::shape(&pattern))
            .map(|&id| &self.entities[id])
            .filter(|e| e.pattern() == pattern)
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    /// Registered routes ordered by name.
    pub fn routes(&self) -> impl Iterator<Item = (&str, &NamedRoute)> {
        self.registry.iter()
    }

    pub fn try_reverse(&self, name: &str, values: &[&dyn Display]) -> Result<String, RouteError> {
        self.registry.reverse(name, values)
    }

    /// Like [`Router::try_reverse`] but a drifted call site is fatal.
    pub fn reverse(&self, name: &str, values: &[&dyn Display]) -> String {
        match self.registry.reverse(name, values) {
            Ok(uri) => uri,
            Err(e) => panic!("reverse error: {}", e),
        }
    }

    pub fn root(&self) -> &Entry<usize> {
        &self.root
    }

    /// Transform every handler, keeping the trie as is.
    pub fn map<U>(self, mut f: impl FnMut(H) -> U) -> Router<U> {
        Router {
            root: self.root,
            entities: self.entities.into_iter().map(|e| e.map(&mut f)).collect(),
            shapes: self.shapes,
            registry: self.registry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found<'r, H: Copy + std::fmt::Debug>(lookup: Lookup<'r, '_, H>) -> (H, Vec<(String, String)>) {
        match lookup {
            Lookup::Found { handler, params } => (
                *handler,
                params
                    .iter()
                    .map(|(n, v)| (n.to_string(), v.to_string()))
                    .collect(),
            ),
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_routes() {
        let mut router = Router::new();
        let paths = ["/", "/about", "/about/team", "/api/v1/users", "/api/v2"];
        for (i, p) in paths.iter().enumerate() {
            router.insert(&format!("r{}", i), Method::GET, p, i).unwrap();
        }
        for (i, p) in paths.iter().enumerate() {
            assert_eq!(found(router.lookup(&Method::GET, p)).0, i);
        }
    }

    #[test]
    fn test_param_order() {
        let mut router = Router::new();
        router.insert("ab", Method::GET, "/a/:x/b/:y", 1).unwrap();

        let (h, params) = found(router.lookup(&Method::GET, "/a/1/b/2"));
        assert_eq!(h, 1);
        assert_eq!(
            params,
            vec![
                ("x".to_string(), "1".to_string()),
                ("y".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_method_specificity() {
        let mut router = Router::new();
        router.insert("list", Method::GET, "/items", 1).unwrap();
        router.insert("create", Method::POST, "items", 2).unwrap();

        assert_eq!(found(router.lookup(&Method::GET, "/items")).0, 1);
        assert_eq!(found(router.lookup(&Method::POST, "/items")).0, 2);
        match router.lookup(&Method::DELETE, "/items") {
            Lookup::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, &[Method::GET, Method::POST]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(router.lookup(&Method::GET, "/nothing"), Lookup::NotFound));
    }

    #[test]
    fn test_duplicate_name() {
        let mut router = Router::new();
        router.insert("home", Method::GET, "/", 1).unwrap();
        assert_eq!(
            router.insert("home", Method::GET, "/elsewhere", 2),
            Err(RouteError::DuplicateName("home".to_string()))
        );
        // the failed registration left no trace in the trie
        assert!(matches!(router.lookup(&Method::GET, "/elsewhere"), Lookup::NotFound));
    }

    #[test]
    fn test_conflicting_param_names() {
        let mut router = Router::new();
        router.insert("a", Method::GET, "/a/:id", 1).unwrap();
        assert!(matches!(
            router.insert("b", Method::POST, "/a/:name", 2),
            Err(RouteError::Conflict { .. })
        ));
        assert!(matches!(
            router.insert("c", Method::GET, "/a/:id", 3),
            Err(RouteError::DuplicateMethod { .. })
        ));
        assert!(!router.registry().contains("c"));
    }

    #[test]
    fn test_example_scenario() {
        let mut router = Router::new();
        router.insert("param", Method::GET, "/abc/:a/d", "param").unwrap();

        let (h, params) = found(router.lookup(&Method::GET, "/abc/123/d"));
        assert_eq!(h, "param");
        assert_eq!(params, vec![("a".to_string(), "123".to_string())]);

        router.insert("literal", Method::GET, "/abc/abc/d", "literal").unwrap();
        let (h, params) = found(router.lookup(&Method::GET, "/abc/abc/d"));
        assert_eq!(h, "literal");
        assert!(params.is_empty());
        assert_eq!(found(router.lookup(&Method::GET, "/abc/abd/d")).0, "param");
    }

    #[test]
    fn test_entity_and_map() {
        let mut router = Router::new();
        router.insert("u", Method::GET, "/u/:id", 2).unwrap();
        assert_eq!(router.entity("u/:id").unwrap().param_names(), &["id".to_string()]);
        assert!(router.entity("/u/:other").is_none());

        let router = router.map(|h| h * 10);
        assert_eq!(found(router.lookup(&Method::GET, "/u/1")).0, 20);
        assert_eq!(router.reverse("u", &[&9]), "/u/9");
    }

    #[test]
    #[should_panic(expected = "reverse error")]
    fn test_reverse_count_mismatch_is_fatal() {
        let mut router = Router::new();
        router.insert("u", Method::GET, "/u/:id", ()).unwrap();
        router.reverse("u", &[]);
    }
}
