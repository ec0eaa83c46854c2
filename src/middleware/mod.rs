//! Stock middleware
//!
//! Each constructor returns a [`MiddlewareFunc`](crate::server::MiddlewareFunc)
//! for [`App::use_middleware`](crate::server::App::use_middleware), a group,
//! or a single route.

mod cors;
mod jwt;
mod logger;
mod recover;

pub use cors::{cors, CorsOptions};
pub use jwt::{jwt, JwtClaims, JwtError, JwtManager};
pub use logger::logger;
pub use recover::recover;
