//! Trigger injection and reconciliation
//!
//! The trigger is identified by a fixed id. Reconciliation is idempotent:
//! when the id is present nothing happens, otherwise the trigger is built and
//! placed at the best known anchor, or pinned to the viewport when no anchor
//! matches. Mutation batches schedule reconciliation through one pending
//! deadline, so bursts of host re-renders cause a single rebuild.

use crate::config::AssistConfig;
use crate::dom::{ElementNode, HostPage, Placement, ROLE_ATTRIBUTE};
use crate::error::Result;
use crate::event::MutationBatch;
use crate::extractor::{ContentSource, extract_content_with_selection};
use crate::locator::{Host, locate_trigger_anchor};
use crate::overlay::OverlayManager;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

const ICON_PATH: &str = "M12 2C6.48 2 2 6.48 2 12s4.48 10 10 10 10-4.48 10-10S17.52 2 12 2zm-2 15l-5-5 \
                         1.41-1.41L10 14.17l7.59-7.59L19 8l-9 9z";

/// Result of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "placement", content = "host", rename_all = "snake_case")]
pub enum Reconciled {
    AlreadyPresent,
    Anchored(Host),
    Fallback,
}

/// Result of activating the trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Activation {
    Opened { source: ContentSource, length: usize },
    NoContent,
}

/// Keeps exactly one trigger in the page
#[derive(Debug)]
pub struct TriggerInjector {
    config: Arc<AssistConfig>,
    deadline: Option<Instant>,
}

impl TriggerInjector {
    pub fn new(config: Arc<AssistConfig>) -> Self {
        Self { config, deadline: None }
    }

    /// When the pending reconciliation is due, if one is scheduled
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_present<P: HostPage + ?Sized>(&self, page: &P) -> Result<bool> {
        page.has_id(&self.config.trigger.id)
    }

    /// Make sure the trigger exists, creating and placing it if needed
    pub fn ensure_present<P: HostPage + ?Sized>(&self, page: &mut P) -> Result<Reconciled> {
        if self.is_present(page)? {
            return Ok(Reconciled::AlreadyPresent);
        }

        if let Some(probe) = locate_trigger_anchor(page)? {
            if page.insert(&self.build_trigger(false), &probe.placement())? {
                log::debug!("Placed trigger at {:?} anchor '{}'", probe.host, probe.selector);
                return Ok(Reconciled::Anchored(probe.host));
            }
            log::debug!("Anchor '{}' vanished before insertion", probe.selector);
        }

        page.insert(&self.build_trigger(true), &Placement::Body)?;
        log::debug!("No anchor matched; trigger pinned to the viewport");
        Ok(Reconciled::Fallback)
    }

    /// React to a batch of DOM changes by scheduling reconciliation
    ///
    /// Only one deadline is kept: while one is pending, further batches do not
    /// postpone it.
    pub fn on_mutations<P: HostPage + ?Sized>(&mut self, page: &P, batch: &MutationBatch, now: Instant) -> Result<()> {
        if !batch.qualifies() || self.deadline.is_some() {
            return Ok(());
        }
        if !self.is_present(page)? {
            self.deadline = Some(now + self.config.reinject_delay());
            log::debug!("Trigger missing after mutations; reconciling in {:?}", self.config.reinject_delay());
        }
        Ok(())
    }

    /// Run the scheduled reconciliation if its deadline has passed
    pub fn on_tick<P: HostPage + ?Sized>(&mut self, page: &mut P, now: Instant) -> Result<Option<Reconciled>> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.ensure_present(page).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Handle trigger activation: extract content and open the overlay, or tell the user there is nothing to use
    ///
    /// `selection` is the selection captured with the activation, if the page reported one.
    pub fn activate<P: HostPage + ?Sized>(
        &self,
        page: &mut P,
        overlay: &mut OverlayManager,
        selection: Option<&str>,
    ) -> Result<Activation> {
        match extract_content_with_selection(page, selection)? {
            Some(content) => {
                let length = content.text.chars().count();
                overlay.open(page, content.text)?;
                Ok(Activation::Opened {
                    source: content.source,
                    length,
                })
            }
            None => {
                log::debug!("Trigger activated with no extractable content");
                page.notify(&self.config.notices.no_content)?;
                Ok(Activation::NoContent)
            }
        }
    }

    fn build_trigger(&self, pinned: bool) -> ElementNode {
        let trigger = &self.config.trigger;
        let icon = ElementNode::new("svg")
            .with_attribute("width", "16")
            .with_attribute("height", "16")
            .with_attribute("viewBox", "0 0 24 24")
            .with_attribute("fill", "none")
            .with_child(
                ElementNode::new("path")
                    .with_attribute("d", ICON_PATH)
                    .with_attribute("fill", "currentColor"),
            );

        let mut button = ElementNode::new("button")
            .with_id(trigger.id.as_str())
            .with_class(trigger.class.as_str())
            .with_attribute("type", "button")
            .with_attribute("title", trigger.title.as_str())
            .with_attribute(ROLE_ATTRIBUTE, "trigger")
            .with_child(icon)
            .with_child(ElementNode::new("span").with_text(trigger.label.as_str()));

        if pinned {
            button.add_attribute(
                "style",
                format!(
                    "position: fixed; top: {}px; right: {}px; z-index: {};",
                    trigger.fallback_top_px, trigger.fallback_right_px, trigger.fallback_z_index
                ),
            );
        }
        button
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryPage;
    use std::time::Duration;

    fn injector() -> TriggerInjector {
        TriggerInjector::new(AssistConfig::default().into_shared())
    }

    #[test]
    fn test_fallback_is_pinned_to_viewport() {
        let injector = injector();
        let mut page = MemoryPage::with_body(vec![ElementNode::new("main")]);

        assert_eq!(injector.ensure_present(&mut page).unwrap(), Reconciled::Fallback);
        let style = page.attribute_of("#smart-email-assistant-btn", "style").unwrap().unwrap();
        assert!(style.contains("position: fixed; top: 10px; right: 10px; z-index: 10000;"));
        assert_eq!(
            page.text_of("#smart-email-assistant-btn").unwrap().as_deref(),
            Some("Smart Email Assistant")
        );
    }

    #[test]
    fn test_anchored_trigger_has_no_fixed_style() {
        let injector = injector();
        let mut page = MemoryPage::with_body(vec![ElementNode::new("div").with_attribute("role", "toolbar")]);

        assert_eq!(injector.ensure_present(&mut page).unwrap(), Reconciled::Anchored(Host::Gmail));
        assert_eq!(page.count(r#"[role="toolbar"] #smart-email-assistant-btn"#).unwrap(), 1);
        assert_eq!(page.attribute_of("#smart-email-assistant-btn", "style").unwrap(), None);
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let injector = injector();
        let mut page = MemoryPage::new();

        injector.ensure_present(&mut page).unwrap();
        assert_eq!(injector.ensure_present(&mut page).unwrap(), Reconciled::AlreadyPresent);
        assert_eq!(page.count("#smart-email-assistant-btn").unwrap(), 1);
    }

    #[test]
    fn test_single_pending_deadline() {
        let mut injector = injector();
        let mut page = MemoryPage::new();
        let start = Instant::now();
        let batch = MutationBatch { records: 1, added_nodes: 1, removed_nodes: 0 };

        injector.on_mutations(&page, &batch, start).unwrap();
        injector.on_mutations(&page, &batch, start + Duration::from_millis(600)).unwrap();
        assert_eq!(injector.deadline(), Some(start + Duration::from_millis(1000)));

        assert_eq!(injector.on_tick(&mut page, start + Duration::from_millis(999)).unwrap(), None);
        assert_eq!(
            injector.on_tick(&mut page, start + Duration::from_millis(1000)).unwrap(),
            Some(Reconciled::Fallback)
        );
        assert_eq!(injector.deadline(), None);
    }

    #[test]
    fn test_mutations_ignored_while_trigger_present() {
        let mut injector = injector();
        let mut page = MemoryPage::new();
        injector.ensure_present(&mut page).unwrap();

        let batch = MutationBatch { records: 5, added_nodes: 9, removed_nodes: 2 };
        injector.on_mutations(&page, &batch, Instant::now()).unwrap();
        assert_eq!(injector.deadline(), None);

        injector.on_mutations(&page, &MutationBatch::default(), Instant::now()).unwrap();
        assert_eq!(injector.deadline(), None);
    }

    #[test]
    fn test_activate_without_content_notifies() {
        let config = AssistConfig::default().into_shared();
        let injector = TriggerInjector::new(config.clone());
        let mut overlay = OverlayManager::new(config);
        let mut page = MemoryPage::new();

        assert_eq!(injector.activate(&mut page, &mut overlay, None).unwrap(), Activation::NoContent);
        assert_eq!(page.notices(), ["Please select or compose an email to generate a response."]);
        assert!(!overlay.is_open(&page).unwrap());
    }

    #[test]
    fn test_activate_with_selection_opens_overlay() {
        let config = AssistConfig::default().into_shared();
        let injector = TriggerInjector::new(config.clone());
        let mut overlay = OverlayManager::new(config);
        let mut page = MemoryPage::new();
        page.set_selection("Can we move the call?");

        let activation = injector.activate(&mut page, &mut overlay, None).unwrap();
        assert_eq!(
            activation,
            Activation::Opened { source: ContentSource::Selection, length: 21 }
        );
        assert!(overlay.is_open(&page).unwrap());
        assert!(page.notices().is_empty());
    }
}
