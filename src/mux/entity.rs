//! Route entities and the route name registry

use super::pattern;
use super::RouteError;

use hyper::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

/// Characters escaped when a value is substituted into a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// The terminal record of a fully registered pattern.
#[derive(Debug)]
pub struct Entity<H> {
    pattern: String,
    handlers: HashMap<Method, H>,
    /// Registration order, used for the `Allow` header
    methods: Vec<Method>,
    param_names: Vec<String>,
}

impl<H> Entity<H> {
    pub fn new(pattern: String, param_names: Vec<String>) -> Self {
        Self {
            pattern,
            handlers: HashMap::new(),
            methods: Vec::new(),
            param_names,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn handler(&self, method: &Method) -> Option<&H> {
        self.handlers.get(method)
    }

    /// Register one more method on this pattern.
    pub fn add_handler(&mut self, method: Method, handler: H) -> Result<(), RouteError> {
        if self.handlers.contains_key(&method) {
            return Err(RouteError::DuplicateMethod {
                method,
                pattern: self.pattern.clone(),
            });
        }
        self.methods.push(method.clone());
        self.handlers.insert(method, handler);
        Ok(())
    }

    pub(crate) fn map<U>(self, mut f: impl FnMut(H) -> U) -> Entity<U> {
        Entity {
            pattern: self.pattern,
            handlers: self
                .handlers
                .into_iter()
                .map(|(method, h)| (method, f(h)))
                .collect(),
            methods: self.methods,
            param_names: self.param_names,
        }
    }
}

/// A named route as recorded in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRoute {
    pub method: Method,
    pub pattern: String,
}

/// Route name to pattern mapping, for duplicate checks and reverse routing.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: BTreeMap<String, NamedRoute>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&NamedRoute> {
        self.routes.get(name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NamedRoute)> {
        self.routes.iter().map(|(name, route)| (name.as_str(), route))
    }

    pub fn register(&mut self, name: &str, method: Method, pattern: &str) -> Result<(), RouteError> {
        if name.is_empty() {
            return Err(RouteError::EmptyName);
        }
        if self.contains(name) {
            return Err(RouteError::DuplicateName(name.to_string()));
        }
        self.routes.insert(
            name.to_string(),
            NamedRoute {
                method,
                pattern: pattern.to_string(),
            },
        );
        Ok(())
    }

    /// Build a concrete URL for `name`, filling parameters left to right.
    pub fn reverse(&self, name: &str, values: &[&dyn Display]) -> Result<String, RouteError> {
        let route = self
            .routes
            .get(name)
            .ok_or_else(|| RouteError::UnknownRoute(name.to_string()))?;

        let expected = pattern::param_names(&route.pattern).len();
        if expected != values.len() {
            return Err(RouteError::ParamCount {
                name: name.to_string(),
                expected,
                got: values.len(),
            });
        }

        let mut uri = String::with_capacity(route.pattern.len());
        let mut values = values.iter();
        let mut rest = route.pattern.as_str();

        while let Some(i) = rest.find(':') {
            uri.push_str(&rest[..i]);
            rest = &rest[i + 1..];
            let end = rest.find('/').unwrap_or(rest.len());
            rest = &rest[end..];

            if let Some(value) = values.next() {
                let value = value.to_string();
                uri.extend(utf8_percent_encode(&value, SEGMENT));
            }
        }
        uri.push_str(rest);

        Ok(uri)
    }
}
