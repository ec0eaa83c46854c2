//! Buffered response writer
//!
//! Handlers write status, headers and body into a [`Response`] held by the
//! request context. Nothing reaches the connection until dispatch finishes
//! and the buffer is turned into a hyper response.

use bytes::{Bytes, BytesMut};
use http_body_util::Full;
use hyper::header::HeaderMap;
use hyper::StatusCode;
use std::mem;
use tracing::warn;

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    /// Status has been (logically) written
    committed: bool,
    size: u64,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            committed: false,
            size: 0,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn committed(&self) -> bool {
        self.committed
    }

    /// Body bytes written so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Fix the status code. Only the first call counts.
    pub fn write_header(&mut self, status: StatusCode) {
        if self.committed {
            warn!(
                "superfluous Response::write_header call ({} after {})",
                status, self.status
            );
            return;
        }
        self.status = status;
        self.committed = true;
    }

    pub fn write(&mut self, buf: &[u8]) -> usize {
        if !self.committed {
            self.write_header(self.status);
        }
        self.body.extend_from_slice(buf);
        self.size += buf.len() as u64;
        buf.len()
    }

    pub(crate) fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
        self.committed = false;
        self.size = 0;
    }

    /// Move the buffered response out, leaving this one reset.
    pub(crate) fn take(&mut self) -> hyper::Response<Full<Bytes>> {
        let mut response = hyper::Response::new(Full::new(self.body.split().freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = mem::take(&mut self.headers);
        self.reset();
        response
    }
}
