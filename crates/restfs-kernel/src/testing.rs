//! Test doubles for the transport seam.
//!
//! [`MockTransport`] records every request and answers from, in order:
//! sticky rules registered with [`MockTransport::on`], then a FIFO queue of
//! scripted replies, then a 404.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::gateway::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::route::Method;

type Reply = Result<HttpResponse, TransportError>;

struct Rule {
    method: Method,
    url_suffix: String,
    reply: Reply,
}

/// Recording, scriptable [`Transport`].
#[derive(Default)]
pub struct MockTransport {
    rules: Mutex<Vec<Rule>>,
    queue: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.requests().len())
            .finish()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `method` on URLs ending in `url_suffix` with `status`/`body`.
    pub fn on(&self, method: Method, url_suffix: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.rules
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Rule {
                method,
                url_suffix: url_suffix.to_string(),
                reply: Ok(HttpResponse::new(status, body)),
            });
    }

    /// Queue one reply.
    pub fn push_response(&self, status: u16, body: impl Into<Vec<u8>>) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(HttpResponse::new(status, body)));
    }

    /// Queue one transport failure.
    pub fn push_error(&self, error: TransportError) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// `(method, url)` of every request sent so far.
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.requests()
            .into_iter()
            .map(|r| (r.method, r.url))
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let rule_reply = self
            .rules
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|r| r.method == request.method && request.url.ends_with(&r.url_suffix))
            .map(|r| r.reply.clone());

        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        if let Some(reply) = rule_reply {
            return reply;
        }
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::new(404, Vec::new())))
    }
}
