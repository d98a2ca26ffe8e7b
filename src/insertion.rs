use crate::config::AssistConfig;
use crate::dom::HostPage;
use crate::error::Result;
use crate::locator::{Host, locate_compose_box};
use serde::Serialize;

/// Where a generated reply ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "target", content = "host", rename_all = "snake_case")]
pub enum Insertion {
    ComposeBox(Host),
    Clipboard,
    /// Clipboard was unavailable; the reply was shown in a notice instead
    Notice,
}

/// Put a reply into the compose box, falling back to the clipboard
///
/// The compose box content is replaced wholesale, as plain text. The reply is
/// never dropped: without a compose box it goes to the clipboard, and if that
/// fails it is shown to the user.
pub fn insert_response<P: HostPage + ?Sized>(page: &mut P, config: &AssistConfig, response: &str) -> Result<Insertion> {
    if let Some(probe) = locate_compose_box(page)? {
        if page.replace_text(probe.selector, response)? {
            log::info!("Inserted reply into {:?} compose box", probe.host);
            return Ok(Insertion::ComposeBox(probe.host));
        }
    }

    match page.write_clipboard(response) {
        Ok(()) => {
            page.notify(&config.notices.copied_to_clipboard)?;
            log::info!("No compose box found; reply copied to clipboard");
            Ok(Insertion::Clipboard)
        }
        Err(e) => {
            log::warn!("No compose box and clipboard write failed: {}", e);
            page.notify(&format!("{}\n\n{}", config.notices.clipboard_unavailable, response))?;
            Ok(Insertion::Notice)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementNode, MemoryPage};

    #[test]
    fn test_replaces_gmail_compose() {
        let mut page = MemoryPage::with_body(vec![ElementNode::new("div")
            .with_id("body-editor")
            .with_attribute("role", "textbox")
            .with_attribute("aria-label", "Message Body")
            .with_child(ElementNode::new("div").with_text("old draft"))]);

        let inserted = insert_response(&mut page, &AssistConfig::default(), "Thanks,\nSam").unwrap();
        assert_eq!(inserted, Insertion::ComposeBox(Host::Gmail));
        assert_eq!(page.text_of("#body-editor").unwrap().as_deref(), Some("Thanks,\nSam"));
        assert_eq!(page.focused_id().as_deref(), Some("body-editor"));
        assert!(page.clipboard().is_none());
    }

    #[test]
    fn test_markup_is_inserted_as_text() {
        let mut page = MemoryPage::with_body(vec![ElementNode::new("div")
            .with_attribute("role", "textbox")
            .with_attribute("aria-label", "Message Body")]);

        insert_response(&mut page, &AssistConfig::default(), "<img src=x onerror=alert(1)>").unwrap();
        assert_eq!(page.count("img").unwrap(), 0);
    }

    #[test]
    fn test_clipboard_fallback() {
        let mut page = MemoryPage::new();
        let inserted = insert_response(&mut page, &AssistConfig::default(), "Z").unwrap();

        assert_eq!(inserted, Insertion::Clipboard);
        assert_eq!(page.clipboard(), Some("Z"));
        assert_eq!(page.notices(), ["Email response copied to clipboard!"]);
    }

    #[test]
    fn test_notice_when_clipboard_denied() {
        let mut page = MemoryPage::new();
        page.set_clipboard_available(false);

        let inserted = insert_response(&mut page, &AssistConfig::default(), "Z").unwrap();
        assert_eq!(inserted, Insertion::Notice);
        assert!(page.notices()[0].ends_with("\n\nZ"));
    }
}
