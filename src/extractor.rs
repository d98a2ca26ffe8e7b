use crate::dom::HostPage;
use crate::error::Result;
use crate::locator::{COMPOSE_BOXES, Host, SELECTED_MESSAGES, TextProbe};
use serde::Serialize;

/// Where extracted text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "host", rename_all = "snake_case")]
pub enum ContentSource {
    ComposeBox(Host),
    SelectedMessage(Host),
    Selection,
}

/// Email text captured at activation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedContent {
    pub text: String,
    pub source: ContentSource,
}

/// Read the text the user is most plausibly replying to
///
/// Candidates are compose boxes, then selected-message containers, then the
/// window selection; the first one with non-whitespace text wins. `None`
/// means there is nothing to work with, which the caller reports to the user.
pub fn extract_content<P: HostPage + ?Sized>(page: &P) -> Result<Option<ExtractedContent>> {
    extract_content_with_selection(page, None)
}

/// Like [`extract_content`], but with the selection captured earlier (at
/// activation) standing in for the live one
pub fn extract_content_with_selection<P: HostPage + ?Sized>(
    page: &P,
    captured_selection: Option<&str>,
) -> Result<Option<ExtractedContent>> {
    if let Some((probe, text)) = first_with_text(page, COMPOSE_BOXES)? {
        return Ok(Some(ExtractedContent {
            text,
            source: ContentSource::ComposeBox(probe.host),
        }));
    }

    if let Some((probe, text)) = first_with_text(page, SELECTED_MESSAGES)? {
        return Ok(Some(ExtractedContent {
            text,
            source: ContentSource::SelectedMessage(probe.host),
        }));
    }

    let selection = match captured_selection {
        Some(captured) => captured.to_string(),
        None => page.selection_text()?,
    };
    let selection = selection.trim();
    if !selection.is_empty() {
        return Ok(Some(ExtractedContent {
            text: selection.to_string(),
            source: ContentSource::Selection,
        }));
    }

    Ok(None)
}

fn first_with_text<P: HostPage + ?Sized>(
    page: &P,
    probes: &'static [TextProbe],
) -> Result<Option<(&'static TextProbe, String)>> {
    for probe in probes {
        if let Some(text) = page.text_of(probe.selector)? {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Ok(Some((probe, trimmed.to_string())));
            }
        }
    }
    Ok(None)
}
