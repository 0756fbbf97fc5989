//! Purpose: Fan platform channel-message events out on the broadcast topic.
//! Exports: `ChannelMessageEvent`, `EVENTS_TOPIC`, `envelope`, `forward_events`.
//! Role: Fire-and-forget one-way flow; no correlation id, no response.
//! Invariants: Event names on the wire stay fixed per the broadcast contract.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{error, warn};

use crate::transport::Publish;

pub const EVENTS_TOPIC: &str = "rp-events";

/// The fixed set of domain events the bridge republishes.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelMessageEvent {
    Created(Value),
    Edited(Value),
    Deleted(Value),
}

impl ChannelMessageEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelMessageEvent::Created(_) => "channelMessageCreated",
            ChannelMessageEvent::Edited(_) => "channelMessageEdited",
            ChannelMessageEvent::Deleted(_) => "channelMessageDeleted",
        }
    }

    pub fn payload(&self) -> &Value {
        match self {
            ChannelMessageEvent::Created(payload)
            | ChannelMessageEvent::Edited(payload)
            | ChannelMessageEvent::Deleted(payload) => payload,
        }
    }
}

/// Broadcast envelope tagging each event with its wire name.
pub fn envelope(event: &ChannelMessageEvent) -> Value {
    json!({
        "rootEventName": event.name(),
        "rootEvent": event.payload(),
    })
}

/// Republish every event from `events` until the sender side closes. Lagged
/// receivers skip ahead; publish failures are logged and dropped.
pub async fn forward_events(
    publisher: Arc<dyn Publish>,
    mut events: broadcast::Receiver<ChannelMessageEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("event forwarder lagged, skipped {skipped} events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };
        let payload = match serde_json::to_vec(&envelope(&event)) {
            Ok(payload) => payload,
            Err(err) => {
                error!("failed to encode {} event: {err}", event.name());
                continue;
            }
        };
        if let Err(err) = publisher.publish(EVENTS_TOPIC, Bytes::from(payload)).await {
            error!("failed to publish {} event: {err}", event.name());
        }
    }
}
