//! Purpose: Correlate inbound call requests with published results.
//! Exports: `Bridge`, `handle_request`, `CALLS_TOPIC`, `RESULTS_TOPIC`.
//! Role: Decode, dispatch, and respond; one independent task per message.
//! Invariants: Every accepted request publishes exactly one response with its id.
//! Invariants: Requests with an empty id or path are discarded without a response.
//! Invariants: Handler tasks never serialize behind each other; responses may
//! overtake slower calls.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info};

use crate::core::capability::Capability;
use crate::core::dispatch::{self, Outcome};
use crate::core::wire::{CallRequest, CallResponse};
use crate::transport::{Inbound, Publish};

pub const CALLS_TOPIC: &str = "yk-calls";
pub const RESULTS_TOPIC: &str = "yk-results";

/// The call-dispatch side of the bridge: a read-only capability tree plus a
/// shared publish handle for results.
pub struct Bridge {
    root: Arc<Capability>,
    publisher: Arc<dyn Publish>,
}

impl Bridge {
    pub fn new(root: Arc<Capability>, publisher: Arc<dyn Publish>) -> Self {
        Self { root, publisher }
    }

    /// Drive the subscribe loop until the inbound transport closes. Each
    /// message spawns its own handler task, so a slow invocation never holds
    /// up the messages behind it.
    pub async fn run<S: Inbound>(&self, mut inbound: S) {
        loop {
            match inbound.next_message().await {
                Ok(Some((topic, payload))) => {
                    if topic != CALLS_TOPIC {
                        continue;
                    }
                    let root = Arc::clone(&self.root);
                    let publisher = Arc::clone(&self.publisher);
                    tokio::spawn(async move {
                        if let Some(response) = handle_request(&root, &payload).await {
                            publish_response(publisher.as_ref(), &response).await;
                        }
                    });
                }
                Ok(None) => {
                    info!("inbound transport closed, stopping call handler");
                    return;
                }
                Err(err) => {
                    error!("inbound transport failed: {err}");
                    return;
                }
            }
        }
    }
}

/// Decode one inbound payload and run it through the dispatcher. Returns
/// `None` when the message must be dropped without a response: undecodable
/// bodies (logged) and requests missing an id or path (silent).
pub async fn handle_request(root: &Capability, payload: &[u8]) -> Option<CallResponse> {
    let request: CallRequest = match serde_json::from_slice(payload) {
        Ok(request) => request,
        Err(err) => {
            error!("invalid call request payload: {err}");
            return None;
        }
    };
    if request.id.is_empty() || request.path.is_empty() {
        return None;
    }

    let outcome = dispatch::dispatch(root, &request.path, request.args).await;
    if let Outcome::Failure { message, .. } = &outcome {
        error!("call '{}' to path '{}' failed: {message}", request.id, request.path);
    }
    Some(CallResponse::from_outcome(request.id, outcome))
}

async fn publish_response(publisher: &dyn Publish, response: &CallResponse) {
    let payload = match serde_json::to_vec(response) {
        Ok(payload) => payload,
        Err(err) => {
            error!("failed to encode call response '{}': {err}", response.id);
            return;
        }
    };
    if let Err(err) = publisher.publish(RESULTS_TOPIC, Bytes::from(payload)).await {
        error!("failed to publish call response '{}': {err}", response.id);
    }
}
