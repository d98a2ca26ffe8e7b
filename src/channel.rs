//! Cross-context channel between the host page and the overlay frame
//!
//! Messages are a closed tagged union serialised as
//! `{"type": "INITIAL_CONTENT", "content": ...}`,
//! `{"type": "INSERT_RESPONSE", "response": ...}` and `{"type": "CLOSE_POPUP"}`.
//! Anything else arriving on the host window is ignored.

use crate::config::AssistConfig;
use crate::dom::HostPage;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A message crossing the host/frame boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelMessage {
    /// Host → frame: the text captured when the trigger was activated
    #[serde(alias = "INITIAL_EMAIL_CONTENT")]
    InitialContent { content: String },

    /// Frame → host: put this reply into the compose box
    InsertResponse { response: String },

    /// Frame → host: dismiss the overlay
    ClosePopup,
}

impl ChannelMessage {
    /// Decode a message payload, returning `None` for unknown tags or shapes
    pub fn decode(data: &serde_json::Value) -> Option<Self> {
        match serde_json::from_value(data.clone()) {
            Ok(message) => Some(message),
            Err(e) => {
                log::debug!("Ignoring unrecognised channel payload: {}", e);
                None
            }
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        // Serialising a plain enum of strings cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ChannelMessage::InitialContent { .. } => "INITIAL_CONTENT",
            ChannelMessage::InsertResponse { .. } => "INSERT_RESPONSE",
            ChannelMessage::ClosePopup => "CLOSE_POPUP",
        }
    }
}

/// Which senders the host accepts messages from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    Any,
    Only(String),
}

impl OriginPolicy {
    pub fn accepts(&self, origin: &str) -> bool {
        match self {
            OriginPolicy::Any => true,
            OriginPolicy::Only(expected) => expected == origin,
        }
    }
}

/// Host end of the channel
#[derive(Debug, Clone)]
pub struct Channel {
    policy: OriginPolicy,
    frame_origin: String,
}

impl Channel {
    pub fn new(config: &AssistConfig) -> Self {
        let frame_origin = config.frame_origin();
        let policy = if config.origin_policy.accept_any_origin {
            OriginPolicy::Any
        } else {
            OriginPolicy::Only(frame_origin.clone())
        };
        Self { policy, frame_origin }
    }

    pub fn policy(&self) -> &OriginPolicy {
        &self.policy
    }

    /// Filter and decode an inbound `message` event
    pub fn accept_inbound(&self, origin: &str, data: &serde_json::Value) -> Option<ChannelMessage> {
        if !self.policy.accepts(origin) {
            log::warn!("Rejected channel message from untrusted origin {}", origin);
            return None;
        }
        ChannelMessage::decode(data)
    }

    /// Post a message into the overlay frame, addressed to the frame's origin
    pub fn send<P: HostPage + ?Sized>(&self, page: &mut P, frame_id: &str, message: &ChannelMessage) -> Result<bool> {
        let delivered = page.post_to_frame(frame_id, message, &self.frame_origin)?;
        if delivered {
            log::debug!("Posted {} to frame #{}", message.tag(), frame_id);
        } else {
            log::debug!("Frame #{} gone before {} could be posted", frame_id, message.tag());
        }
        Ok(delivered)
    }
}
