//! Access log middleware

use crate::server::header::X_REQUEST_ID;
use crate::server::{handler, middleware, HttpError, MiddlewareFunc};

use hyper::header::{REFERER, USER_AGENT};
use std::time::Instant;
use tracing::info;

/// Log one line per request:
/// `ip - id method uri status bytes latency "referer" "user-agent"`.
///
/// A handler error is logged with the status the error handler will send.
pub fn logger() -> MiddlewareFunc {
    middleware(|next| {
        handler(move |c| {
            let next = next.clone();
            Box::pin(async move {
                let start = Instant::now();
                let result = next(c).await;
                let latency = start.elapsed();

                let status = match &result {
                    Ok(()) => c.response().status(),
                    Err(e) => HttpError::from_error(e).code(),
                };
                let id = c
                    .header(X_REQUEST_ID)
                    .or_else(|| {
                        c.response()
                            .headers()
                            .get(X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                    })
                    .unwrap_or("-");

                info!(
                    "{} - {} {} {} {} {} {:?} {:?} {:?}",
                    c.real_ip(),
                    id,
                    c.method(),
                    c.uri(),
                    status.as_u16(),
                    c.response().size(),
                    latency,
                    c.header(REFERER.as_str()).unwrap_or(""),
                    c.header(USER_AGENT.as_str()).unwrap_or(""),
                );

                result
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::App;
    use bytes::Bytes;
    use hyper::{Request, StatusCode};

    #[tokio::test]
    async fn test_logger_passes_result_through() {
        let mut app = App::new();
        app.use_middleware(logger());
        app.get(
            "ok",
            "/ok",
            handler(|c| Box::pin(async move { c.string(StatusCode::OK, "fine") })),
        );
        app.get(
            "fail",
            "/fail",
            handler(|_c| Box::pin(async { Err(HttpError::forbidden().into()) })),
        );
        let dispatcher = app.into_dispatcher();

        let res = dispatcher
            .dispatch(Request::get("/ok").body(Bytes::new()).unwrap(), None)
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = dispatcher
            .dispatch(Request::get("/fail").body(Bytes::new()).unwrap(), None)
            .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
