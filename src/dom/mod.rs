//! Host document access
//!
//! This module defines what the assistant needs from a host page:
//! - HostPage: the operations the content script performs on a live document
//! - ElementNode: description of nodes the assistant inserts
//! - MemoryPage: an in-process document implementing HostPage, queried with
//!   `scraper` selectors

pub mod element;
pub mod memory;

pub use element::ElementNode;
pub use memory::MemoryPage;

use crate::channel::ChannelMessage;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Attribute marking inserted nodes whose clicks are intercepted ("trigger" or "close")
pub const ROLE_ATTRIBUTE: &str = "data-mail-assist-role";

/// Attribute carrying the overlay generation on the frame element
pub const GENERATION_ATTRIBUTE: &str = "data-mail-assist-generation";

/// Document readiness as reported by `document.readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    /// Whether the body exists and can receive nodes
    pub fn is_parsed(self) -> bool {
        !matches!(self, ReadyState::Loading)
    }
}

/// Where an inserted node goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "selector", rename_all = "snake_case")]
pub enum Placement {
    /// Last child of the first element matching the selector
    AppendTo(String),
    /// Immediately before the first element matching the selector, as its sibling
    Before(String),
    /// Last child of the document body
    Body,
}

/// Operations the assistant performs on a host document
///
/// The document is owned by the host application and may change between
/// any two calls. Absence is reported through `bool`/`Option` results;
/// errors are reserved for transport or evaluation failures.
pub trait HostPage {
    fn ready_state(&self) -> Result<ReadyState>;

    /// Whether an element with this id is attached
    fn has_id(&self, id: &str) -> Result<bool>;

    /// Whether any element matches the selector
    fn exists(&self, selector: &str) -> Result<bool>;

    /// `textContent` of the first matching element
    fn text_of(&self, selector: &str) -> Result<Option<String>>;

    /// Text of the window's active selection (empty when nothing is selected)
    fn selection_text(&self) -> Result<String>;

    /// Insert a node; `false` when the anchor is gone
    fn insert(&mut self, element: &ElementNode, placement: &Placement) -> Result<bool>;

    /// Detach the element with this id; `false` when it was not present
    fn remove_by_id(&mut self, id: &str) -> Result<bool>;

    /// Focus the first matching element and replace its content with plain text
    fn replace_text(&mut self, selector: &str, text: &str) -> Result<bool>;

    fn write_clipboard(&mut self, text: &str) -> Result<()>;

    /// Show a short message to the user
    fn notify(&mut self, message: &str) -> Result<()>;

    /// Post a channel message into the frame with this id; `false` when the frame is gone
    fn post_to_frame(&mut self, frame_id: &str, message: &ChannelMessage, target_origin: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_state_parsing() {
        let state: ReadyState = serde_json::from_str("\"interactive\"").unwrap();
        assert_eq!(state, ReadyState::Interactive);
        assert!(state.is_parsed());
        assert!(!ReadyState::Loading.is_parsed());
    }

    #[test]
    fn test_placement_json_shape() {
        let json = serde_json::to_value(Placement::Before("[role=\"button\"]".to_string())).unwrap();
        assert_eq!(json["kind"], "before");
        assert_eq!(json["selector"], "[role=\"button\"]");

        let json = serde_json::to_value(Placement::Body).unwrap();
        assert_eq!(json["kind"], "body");
    }
}
