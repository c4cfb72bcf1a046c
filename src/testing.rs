//! Scripted transport for unit tests
//!
//! Records every outbound request and replays queued responses, so tests
//! can assert on wire parameters and count network calls without a server.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::OAuth2Error;
use crate::transport::{TokenTransport, TransportRequest, TransportResponse};

/// In-memory [`TokenTransport`] with scripted responses and a request log
#[derive(Debug, Default)]
pub(crate) struct MockTokenTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, OAuth2Error>>>,
    requests: Mutex<Vec<TransportRequest>>,
    latency: Mutex<Option<Duration>>,
}

impl MockTokenTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response; the status may be any HTTP status
    pub(crate) fn enqueue_success(&self, status: u16, body: &str) {
        // Mutex poisoning is acceptable in test mocks.
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(TransportResponse { status, body: body.to_string() }));
    }

    /// Queue a transport-level failure
    pub(crate) fn enqueue_error(&self, err: OAuth2Error) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    /// Delay every call, to force overlap in concurrency tests
    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Number of calls that reached the transport
    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The `index`-th recorded request
    pub(crate) fn request(&self, index: usize) -> TransportRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl TokenTransport for MockTokenTransport {
    async fn post(&self, request: TransportRequest) -> Result<TransportResponse, OAuth2Error> {
        let latency = *self.latency.lock().unwrap();
        self.requests.lock().unwrap().push(request);

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(OAuth2Error::Transport {
                status: None,
                message: "no scripted response".to_string(),
            })
        })
    }
}
