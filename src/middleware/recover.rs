//! Panic recovery middleware

use crate::server::{handler, middleware, HttpError, MiddlewareFunc};

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Turn a panicking handler into a 500 for the error handler.
pub fn recover() -> MiddlewareFunc {
    middleware(|next| {
        handler(move |c| {
            let next = next.clone();
            Box::pin(async move {
                let result = AssertUnwindSafe(next(c)).catch_unwind().await;
                match result {
                    Ok(result) => result,
                    Err(panic) => {
                        error!(
                            "[PANIC RECOVER] {} {}: {}",
                            c.method(),
                            c.uri(),
                            panic_message(panic.as_ref())
                        );
                        Err(HttpError::internal().into())
                    }
                }
            })
        })
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
