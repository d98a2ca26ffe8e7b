//! `HostPage` over a live Chrome tab
//!
//! Every operation is a call into a small page-side shim (`content_shim.js`)
//! evaluated through the DevTools protocol. Arguments are passed as JSON
//! literals and results come back as JSON strings. The shim also buffers
//! page events, which are collected with [`CdpPage::drain_events`].

use crate::channel::ChannelMessage;
use crate::dom::{ElementNode, HostPage, Placement, ReadyState};
use crate::error::{AssistError, Result};
use crate::event::PageEvent;
use headless_chrome::Tab;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const SHIM_SOURCE: &str = include_str!("content_shim.js");

#[derive(Debug, Deserialize)]
struct ClipboardOutcome {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// A browser tab seen through the page shim
#[derive(Clone)]
pub struct CdpPage {
    tab: Arc<Tab>,
}

impl CdpPage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Install the shim unless it is already present; returns whether it was installed now
    pub fn install_shim(&self) -> Result<bool> {
        let installed: bool = self.evaluate_json(SHIM_SOURCE)?;
        if installed {
            log::debug!("Installed page shim in {}", self.tab.get_url());
        }
        Ok(installed)
    }

    /// Collect the events buffered since the last drain
    ///
    /// `None` means the shim is gone, which happens after the tab navigates.
    /// Events the shim produced in an unexpected shape are logged and skipped.
    pub fn drain_events(&self) -> Result<Option<Vec<PageEvent>>> {
        let raw: Option<Vec<Value>> =
            self.evaluate_json("window.__mailAssist ? JSON.stringify(window.__mailAssist.drain()) : JSON.stringify(null)")?;

        Ok(raw.map(|values| {
            values
                .into_iter()
                .filter_map(|value| match serde_json::from_value::<PageEvent>(value) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        log::warn!("{}", AssistError::ShimProtocol(e.to_string()));
                        None
                    }
                })
                .collect()
        }))
    }

    fn call<T: DeserializeOwned>(&self, method: &str, args: &[Value]) -> Result<T> {
        let args = args.iter().map(Value::to_string).collect::<Vec<_>>().join(", ");
        self.evaluate_json(&format!("JSON.stringify(window.__mailAssist.{}({}))", method, args))
    }

    fn evaluate_json<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
        let result = self
            .tab
            .evaluate(expression, false)
            .map_err(|e| AssistError::EvaluationFailed(e.to_string()))?;

        let value = result
            .value
            .ok_or_else(|| AssistError::EvaluationFailed("No value returned from page".to_string()))?;
        let json: String = serde_json::from_value(value).map_err(|e| AssistError::ShimProtocol(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| AssistError::ShimProtocol(e.to_string()))
    }
}

fn json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| AssistError::ShimProtocol(e.to_string()))
}

impl HostPage for CdpPage {
    fn ready_state(&self) -> Result<ReadyState> {
        self.evaluate_json("JSON.stringify(document.readyState)")
    }

    fn has_id(&self, id: &str) -> Result<bool> {
        self.call("hasId", &[json(id)?])
    }

    fn exists(&self, selector: &str) -> Result<bool> {
        self.call("exists", &[json(selector)?])
    }

    fn text_of(&self, selector: &str) -> Result<Option<String>> {
        self.call("textOf", &[json(selector)?])
    }

    fn selection_text(&self) -> Result<String> {
        self.call("selectionText", &[])
    }

    fn insert(&mut self, element: &ElementNode, placement: &Placement) -> Result<bool> {
        self.call("insert", &[json(element)?, json(placement)?])
    }

    fn remove_by_id(&mut self, id: &str) -> Result<bool> {
        self.call("removeById", &[json(id)?])
    }

    fn replace_text(&mut self, selector: &str, text: &str) -> Result<bool> {
        self.call("replaceText", &[json(selector)?, json(text)?])
    }

    fn write_clipboard(&mut self, text: &str) -> Result<()> {
        let expression = format!("window.__mailAssist.writeClipboard({})", json(text)?);
        let result = self
            .tab
            .evaluate(&expression, true)
            .map_err(|e| AssistError::ClipboardFailed(e.to_string()))?;

        let raw = result
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| AssistError::ClipboardFailed("No result from clipboard write".to_string()))?;
        let outcome: ClipboardOutcome =
            serde_json::from_str(&raw).map_err(|e| AssistError::ShimProtocol(e.to_string()))?;

        if outcome.ok {
            Ok(())
        } else {
            Err(AssistError::ClipboardFailed(
                outcome.error.unwrap_or_else(|| "Unknown clipboard error".to_string()),
            ))
        }
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        let _: bool = self.call("notify", &[json(message)?])?;
        Ok(())
    }

    fn post_to_frame(&mut self, frame_id: &str, message: &ChannelMessage, target_origin: &str) -> Result<bool> {
        self.call("postToFrame", &[json(frame_id)?, message.to_value(), json(target_origin)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shim_exposes_every_call() {
        for method in [
            "drain",
            "hasId",
            "exists",
            "textOf",
            "selectionText",
            "insert",
            "removeById",
            "replaceText",
            "writeClipboard",
            "notify",
            "postToFrame",
        ] {
            assert!(SHIM_SOURCE.contains(&format!("{}: function", method)), "shim lacks {}", method);
        }
    }

    #[test]
    fn test_shim_keeps_intercepted_clicks_from_host() {
        // Both the trigger and the close button swallow the click before host handlers see it.
        let handler = SHIM_SOURCE
            .split("'click',")
            .nth(1)
            .and_then(|rest| rest.split("'load',").next())
            .unwrap();
        assert_eq!(handler.matches("e.preventDefault();").count(), 2);
        assert_eq!(handler.matches("e.stopPropagation();").count(), 2);
        assert!(handler.contains("kind: 'trigger_activated', selection: selectionText()"));
    }

    #[test]
    fn test_shim_event_kinds_decode() {
        for kind in ["ready", "trigger_activated", "close_requested"] {
            let event: PageEvent = serde_json::from_value(serde_json::json!({ "kind": kind })).unwrap();
            assert!(SHIM_SOURCE.contains(&format!("kind: '{}'", kind)));
            assert_ne!(serde_json::to_value(&event).unwrap()["kind"], Value::Null);
        }

        let event: PageEvent = serde_json::from_value(serde_json::json!({
            "kind": "mutations", "records": 2, "added_nodes": 3, "removed_nodes": 0
        }))
        .unwrap();
        assert!(matches!(event, PageEvent::Mutations(batch) if batch.added_nodes == 3));
    }
}
