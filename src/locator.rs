//! Known anchor points in supported email clients
//!
//! Probes are tried in one fixed order across all hosts rather than detecting
//! the host first, so a page that matches nothing simply yields `None` and the
//! caller falls back to positional placement.

use crate::dom::{HostPage, Placement};
use crate::error::Result;
use serde::Serialize;

/// Email client a probe was written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Host {
    Gmail,
    Outlook,
}

/// How the trigger attaches to a matched anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    /// Append as last child of the anchor
    Append,
    /// Insert as the anchor's preceding sibling
    Before,
}

/// A structural probe for placing the trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnchorProbe {
    pub host: Host,
    pub selector: &'static str,
    pub kind: AnchorKind,
}

impl AnchorProbe {
    pub fn placement(&self) -> Placement {
        match self.kind {
            AnchorKind::Append => Placement::AppendTo(self.selector.to_string()),
            AnchorKind::Before => Placement::Before(self.selector.to_string()),
        }
    }
}

/// A probe for an element whose text is read or replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextProbe {
    pub host: Host,
    pub selector: &'static str,
}

/// Trigger anchors, highest priority first
pub const TRIGGER_ANCHORS: &[AnchorProbe] = &[
    AnchorProbe {
        host: Host::Gmail,
        selector: r#"[role="toolbar"]"#,
        kind: AnchorKind::Append,
    },
    AnchorProbe {
        host: Host::Gmail,
        selector: r#"[role="button"][aria-label*="Send"]"#,
        kind: AnchorKind::Before,
    },
    AnchorProbe {
        host: Host::Outlook,
        selector: r#"[data-app-section="MailCompose"]"#,
        kind: AnchorKind::Append,
    },
    AnchorProbe {
        host: Host::Outlook,
        selector: ".ms-Button-flexContainer",
        kind: AnchorKind::Append,
    },
];

/// Compose boxes, highest priority first
pub const COMPOSE_BOXES: &[TextProbe] = &[
    TextProbe {
        host: Host::Gmail,
        selector: r#"[role="textbox"][aria-label*="Message Body"]"#,
    },
    TextProbe {
        host: Host::Outlook,
        selector: r#"[data-app-section="MailCompose"] [role="textbox"]"#,
    },
];

/// Containers of the message being read, highest priority first
pub const SELECTED_MESSAGES: &[TextProbe] = &[
    TextProbe {
        host: Host::Gmail,
        selector: ".ii.gt .ii.gt",
    },
    TextProbe {
        host: Host::Outlook,
        selector: ".allowTextSelection",
    },
];

/// First trigger anchor present in the page
pub fn locate_trigger_anchor<P: HostPage + ?Sized>(page: &P) -> Result<Option<&'static AnchorProbe>> {
    first_present(page, TRIGGER_ANCHORS, |probe| probe.selector)
}

/// First compose box present in the page
pub fn locate_compose_box<P: HostPage + ?Sized>(page: &P) -> Result<Option<&'static TextProbe>> {
    first_present(page, COMPOSE_BOXES, |probe| probe.selector)
}

fn first_present<P, T>(page: &P, probes: &'static [T], selector: impl Fn(&T) -> &'static str) -> Result<Option<&'static T>>
where
    P: HostPage + ?Sized,
{
    for probe in probes {
        if page.exists(selector(probe))? {
            return Ok(Some(probe));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementNode, MemoryPage};
    use scraper::Selector;

    #[test]
    fn test_all_probe_selectors_parse() {
        let selectors = TRIGGER_ANCHORS
            .iter()
            .map(|p| p.selector)
            .chain(COMPOSE_BOXES.iter().map(|p| p.selector))
            .chain(SELECTED_MESSAGES.iter().map(|p| p.selector));
        for selector in selectors {
            assert!(Selector::parse(selector).is_ok(), "probe '{}' must parse", selector);
        }
    }

    #[test]
    fn test_no_anchor_is_none() {
        let page = MemoryPage::with_body(vec![ElementNode::new("main").with_text("Inbox")]);
        assert_eq!(locate_trigger_anchor(&page).unwrap(), None);
        assert_eq!(locate_compose_box(&page).unwrap(), None);
    }

    #[test]
    fn test_priority_beats_document_order() {
        // Outlook container comes first in the document, Gmail's toolbar still wins.
        let page = MemoryPage::with_body(vec![
            ElementNode::new("div").with_class("ms-Button-flexContainer"),
            ElementNode::new("div").with_attribute("data-app-section", "MailCompose"),
            ElementNode::new("div").with_attribute("role", "toolbar"),
        ]);

        let probe = locate_trigger_anchor(&page).unwrap().unwrap();
        assert_eq!(probe.host, Host::Gmail);
        assert_eq!(probe.placement(), Placement::AppendTo(r#"[role="toolbar"]"#.to_string()));
    }

    #[test]
    fn test_send_button_anchor_inserts_before() {
        let page = MemoryPage::with_body(vec![ElementNode::new("div").with_child(
            ElementNode::new("div")
                .with_attribute("role", "button")
                .with_attribute("aria-label", "Send \u{202a}(Ctrl-Enter)\u{202c}"),
        )]);

        let probe = locate_trigger_anchor(&page).unwrap().unwrap();
        assert_eq!(probe.kind, AnchorKind::Before);
    }

    #[test]
    fn test_outlook_compose_box() {
        let page = MemoryPage::with_body(vec![ElementNode::new("div")
            .with_attribute("data-app-section", "MailCompose")
            .with_child(ElementNode::new("div").with_attribute("role", "textbox"))]);

        let probe = locate_compose_box(&page).unwrap().unwrap();
        assert_eq!(probe.host, Host::Outlook);
    }
}
