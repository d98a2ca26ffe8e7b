//! Immutable assistant configuration
//!
//! A single [`AssistConfig`] is built at startup (defaults or a JSON file) and
//! shared as `Arc<AssistConfig>` with every component that needs identifiers,
//! geometry or the frame origin.

use crate::error::{AssistError, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc, time::Duration};
use url::{Origin, Url};

/// Top-level configuration shared by all components
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssistConfig {
    pub trigger: TriggerConfig,
    pub overlay: OverlayConfig,

    /// Settle delay after a mutation batch before the trigger is re-created
    pub reinject_delay_ms: u64,

    /// How often the tab driver drains page events
    pub poll_interval_ms: u64,

    pub origin_policy: OriginPolicyConfig,
    pub notices: NoticeConfig,
    pub backend: BackendConfig,
}

/// Identity, label and fallback position of the injected trigger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TriggerConfig {
    pub id: String,
    pub class: String,
    pub label: String,
    pub title: String,
    pub fallback_top_px: u32,
    pub fallback_right_px: u32,
    pub fallback_z_index: u32,
}

/// Frame identity, entry document and geometry of the overlay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlayConfig {
    pub frame_id: String,
    pub close_id: String,
    pub frame_url: Url,
    pub width_px: u32,
    pub height_px: u32,
    pub max_width_vw: u32,
    pub max_height_vh: u32,
    pub z_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OriginPolicyConfig {
    /// Accept inbound channel messages from any origin instead of only the frame's
    pub accept_any_origin: bool,
}

/// User-visible notice texts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoticeConfig {
    pub no_content: String,
    pub copied_to_clipboard: String,
    pub clipboard_unavailable: String,
}

/// Where the reply generator posts requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub endpoint: Url,
    pub timeout_secs: u64,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            trigger: TriggerConfig::default(),
            overlay: OverlayConfig::default(),
            reinject_delay_ms: 1000,
            poll_interval_ms: 200,
            origin_policy: OriginPolicyConfig::default(),
            notices: NoticeConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            id: "smart-email-assistant-btn".to_string(),
            class: "sea-assistant-button".to_string(),
            label: "Smart Email Assistant".to_string(),
            title: "Generate smart email response".to_string(),
            fallback_top_px: 10,
            fallback_right_px: 10,
            fallback_z_index: 10000,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            frame_id: "smart-email-popup".to_string(),
            close_id: "smart-email-popup-close".to_string(),
            frame_url: default_url("http://localhost:4200/index.html"),
            width_px: 800,
            height_px: 600,
            max_width_vw: 90,
            max_height_vh: 90,
            z_index: 10001,
        }
    }
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            no_content: "Please select or compose an email to generate a response.".to_string(),
            copied_to_clipboard: "Email response copied to clipboard!".to_string(),
            clipboard_unavailable: "Could not copy the response to the clipboard. Here it is:".to_string(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_url("http://localhost:8080/api/email/generate"),
            timeout_secs: 60,
        }
    }
}

fn default_url(literal: &str) -> Url {
    Url::parse(literal).expect("default URL literal is valid")
}

impl AssistConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parse configuration from a JSON document
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method: set the embedded application's entry document
    pub fn with_frame_url(mut self, url: Url) -> Self {
        self.overlay.frame_url = url;
        self
    }

    /// Builder method: set the reply backend endpoint
    pub fn with_backend_endpoint(mut self, url: Url) -> Self {
        self.backend.endpoint = url;
        self
    }

    /// Builder method: accept channel messages from any origin
    pub fn accept_any_origin(mut self, accept: bool) -> Self {
        self.origin_policy.accept_any_origin = accept;
        self
    }

    /// Freeze into the shared form handed to components
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Check the invariants components rely on
    pub fn validate(&self) -> Result<()> {
        let ids = [
            ("trigger.id", &self.trigger.id),
            ("overlay.frame_id", &self.overlay.frame_id),
            ("overlay.close_id", &self.overlay.close_id),
        ];
        for (name, value) in ids {
            if value.trim().is_empty() {
                return Err(AssistError::InvalidConfig(format!("{} must not be empty", name)));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(AssistError::InvalidConfig(format!("{} must not contain whitespace", name)));
            }
        }

        if self.trigger.id == self.overlay.frame_id
            || self.trigger.id == self.overlay.close_id
            || self.overlay.frame_id == self.overlay.close_id
        {
            return Err(AssistError::InvalidConfig("element identifiers must be distinct".to_string()));
        }

        if self.overlay.width_px == 0 || self.overlay.height_px == 0 {
            return Err(AssistError::InvalidConfig("overlay dimensions must be positive".to_string()));
        }

        Ok(())
    }

    pub fn reinject_delay(&self) -> Duration {
        Duration::from_millis(self.reinject_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Origin of the embedded application, used to address and authenticate channel messages
    ///
    /// Extension schemes have opaque origins in the URL standard, but browsers
    /// report them as `scheme://host`, so that form is used instead.
    pub fn frame_origin(&self) -> String {
        let url = &self.overlay.frame_url;
        match url.origin() {
            tuple @ Origin::Tuple(..) => tuple.ascii_serialization(),
            Origin::Opaque(_) => match url.host_str() {
                Some(host) => format!("{}://{}", url.scheme(), host),
                None => "null".to_string(),
            },
        }
    }
}
