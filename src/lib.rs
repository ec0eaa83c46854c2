//! velomux - web-serving toolkit built around a compressed-trie router
//!
//! - [`mux`]: pattern splitting, the byte trie, route entities and reverse
//!   routing
//! - [`server`]: the application builder, per-request context, dispatching,
//!   static files and the Hyper connection loop
//! - [`middleware`]: logger, panic recovery, CORS and JWT
//!
//! # Example
//!
//! ```rust,no_run
//! use velomux::server::{handler, App};
//! use velomux::middleware;
//! use hyper::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut app = App::new();
//!     app.use_middleware(middleware::logger());
//!     app.get(
//!         "user",
//!         "/users/:id",
//!         handler(|c| {
//!             Box::pin(async move {
//!                 let id = c.param("id").unwrap_or_default().to_string();
//!                 c.string(StatusCode::OK, &id)
//!             })
//!         }),
//!     );
//!     app.serve().await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod middleware;
pub mod mux;
pub mod server;

pub use config::Config;
pub use server::{App, Server};

/// velomux version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name for HTTP headers
pub const SERVER_NAME: &str = "velomux";
