//! In-process host document
//!
//! `MemoryPage` keeps a parsed `scraper::Html` document and implements
//! [`HostPage`] against it. Inserted subtrees are serialised to markup and
//! parsed the way a browser would parse them; queries go through
//! `scraper::Selector`. Besides the trait it exposes the knobs a host
//! application would turn (re-rendering subtrees, changing the text
//! selection, finishing a frame load, clicking) so the assistant can be
//! exercised without a browser.

use super::element::{ElementNode, escape_html};
use super::{GENERATION_ATTRIBUTE, HostPage, Placement, ROLE_ATTRIBUTE, ReadyState};
use crate::channel::ChannelMessage;
use crate::error::{AssistError, Result};
use crate::event::{MutationBatch, PageEvent};
use ego_tree::{NodeId, NodeMut, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};

const SKELETON: &str = "<!DOCTYPE html><html><head></head><body></body></html>";

/// Detached nodes tolerated before the document is rebuilt without them
const COMPACT_THRESHOLD: usize = 64;

/// A message posted into a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePost {
    pub frame_id: String,
    pub message: ChannelMessage,
    pub target_origin: String,
}

#[derive(Debug)]
pub struct MemoryPage {
    document: Html,
    body: NodeId,
    detached: usize,
    ready_state: ReadyState,
    selection: String,
    clipboard: Option<String>,
    clipboard_available: bool,
    notices: Vec<String>,
    frame_posts: Vec<FramePost>,
    focused: Option<NodeId>,
    pending_mutations: MutationBatch,
    intercepted_clicks: usize,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPage {
    /// Create a fully loaded page with an empty body
    pub fn new() -> Self {
        let document = Html::parse_document(SKELETON);
        let body = document
            .tree
            .root()
            .descendants()
            .find(|node| node.value().as_element().is_some_and(|e| e.name() == "body"))
            .map(|node| node.id())
            .unwrap_or_else(|| document.tree.root().id());

        Self {
            document,
            body,
            detached: 0,
            ready_state: ReadyState::Complete,
            selection: String::new(),
            clipboard: None,
            clipboard_available: true,
            notices: Vec::new(),
            frame_posts: Vec::new(),
            focused: None,
            pending_mutations: MutationBatch::default(),
            intercepted_clicks: 0,
        }
    }

    /// Create a page whose body holds the given subtrees
    pub fn with_body(children: Vec<ElementNode>) -> Self {
        let mut page = Self::new();
        for child in &children {
            page.graft(page.body, None, &child.to_html());
        }
        page.pending_mutations = MutationBatch::default();
        page
    }

    pub fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
    }

    /// Replace the window selection
    pub fn set_selection(&mut self, text: impl Into<String>) {
        self.selection = text.into();
    }

    /// Make clipboard writes fail, as when the page lacks permission
    pub fn set_clipboard_available(&mut self, available: bool) {
        self.clipboard_available = available;
    }

    /// Append a subtree under the first element matching `parent_selector`
    pub fn mount(&mut self, parent_selector: &str, element: ElementNode) -> Result<bool> {
        match self.query_first(parent_selector)? {
            Some(parent) => {
                self.attach(parent, None, &element);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Detach every element matching the selector, as a host re-render would
    pub fn remove_matching(&mut self, selector: &str) -> Result<usize> {
        let matches = self.query_all(selector)?;
        let mut removed = 0;
        for node in matches {
            // An earlier removal may already have taken this node with its ancestor.
            if self.is_attached(node) && !self.holds_body(node) {
                self.detach(node);
                self.record(MutationBatch {
                    records: 1,
                    added_nodes: 0,
                    removed_nodes: 1,
                });
                removed += 1;
            }
        }
        self.compact_if_sparse();
        Ok(removed)
    }

    /// Number of elements matching the selector
    pub fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.query_all(selector)?.len())
    }

    /// Value of an attribute on the first matching element
    pub fn attribute_of(&self, selector: &str, name: &str) -> Result<Option<String>> {
        Ok(self
            .query_first(selector)?
            .and_then(|id| self.element(id))
            .and_then(|element| element.value().attr(name))
            .map(str::to_string))
    }

    /// Click the first matching element
    ///
    /// Clicks inside an element carrying [`ROLE_ATTRIBUTE`] are intercepted
    /// (default handling and propagation suppressed) and reported as the
    /// matching event. A trigger click captures the selection as it is at the
    /// moment of the click.
    pub fn click(&mut self, selector: &str) -> Result<Option<PageEvent>> {
        let Some(target) = self.query_first(selector)?.and_then(|id| self.document.tree.get(id)) else {
            return Ok(None);
        };

        let role = std::iter::successors(Some(target), |node| node.parent())
            .filter_map(|node| node.value().as_element())
            .find_map(|element| element.attr(ROLE_ATTRIBUTE))
            .map(str::to_string);

        let event = match role.as_deref() {
            Some("trigger") => PageEvent::TriggerActivated {
                selection: Some(self.selection.clone()),
            },
            Some("close") => PageEvent::CloseRequested,
            _ => return Ok(None),
        };
        self.intercepted_clicks += 1;
        Ok(Some(event))
    }

    /// Finish loading the frame with this id, producing its load event
    pub fn finish_frame_load(&self, frame_id: &str) -> Option<PageEvent> {
        let element = self.find_by_id(frame_id).and_then(|id| self.element(id))?;
        if element.value().name() != "iframe" {
            return None;
        }
        let generation = element
            .value()
            .attr(GENERATION_ATTRIBUTE)
            .and_then(|g| g.parse().ok())
            .unwrap_or(0);
        Some(PageEvent::FrameLoaded {
            frame_id: frame_id.to_string(),
            generation,
        })
    }

    /// Mutations recorded since the last call, as one batch event
    pub fn take_mutations(&mut self) -> Option<PageEvent> {
        let batch = std::mem::take(&mut self.pending_mutations);
        (!batch.is_empty()).then_some(PageEvent::Mutations(batch))
    }

    /// Messages posted into frames so far
    pub fn frame_posts(&self) -> &[FramePost] {
        &self.frame_posts
    }

    pub fn take_frame_posts(&mut self) -> Vec<FramePost> {
        std::mem::take(&mut self.frame_posts)
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    /// Id attribute of the focused element
    pub fn focused_id(&self) -> Option<String> {
        self.focused
            .and_then(|id| self.element(id))
            .and_then(|element| element.value().id())
            .map(str::to_string)
    }

    /// Number of clicks whose default handling was suppressed
    pub fn intercepted_clicks(&self) -> usize {
        self.intercepted_clicks
    }

    /// Nodes held by the document tree, attached or not
    pub fn allocated_nodes(&self) -> usize {
        self.document.tree.values().count()
    }

    /// Rebuild the body subtree as an `ElementNode`
    pub fn snapshot(&self) -> ElementNode {
        self.document
            .tree
            .get(self.body)
            .and_then(to_element)
            .unwrap_or_else(|| ElementNode::new("body"))
    }

    fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.document.tree.get(id).and_then(ElementRef::wrap)
    }

    fn query_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let selector = parse_selector(selector)?;
        Ok(self
            .document
            .tree
            .root()
            .descendants()
            .filter(|node| ElementRef::wrap(*node).is_some_and(|element| selector.matches(&element)))
            .map(|node| node.id())
            .collect())
    }

    fn query_first(&self, selector: &str) -> Result<Option<NodeId>> {
        let selector = parse_selector(selector)?;
        Ok(self
            .document
            .tree
            .root()
            .descendants()
            .find(|node| ElementRef::wrap(*node).is_some_and(|element| selector.matches(&element)))
            .map(|node| node.id()))
    }

    fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.document
            .tree
            .root()
            .descendants()
            .find(|node| node.value().as_element().and_then(|e| e.id()) == Some(id))
            .map(|node| node.id())
    }

    fn text_content(&self, id: NodeId) -> String {
        self.element(id).map(|element| element.text().collect()).unwrap_or_default()
    }

    fn is_attached(&self, id: NodeId) -> bool {
        let root = self.document.tree.root().id();
        self.document
            .tree
            .get(id)
            .is_some_and(|node| node.id() == root || node.ancestors().any(|a| a.id() == root))
    }

    /// Whether detaching `id` would take the body with it
    fn holds_body(&self, id: NodeId) -> bool {
        self.document
            .tree
            .get(self.body)
            .is_some_and(|body| body.id() == id || body.ancestors().any(|a| a.id() == id))
    }

    fn record(&mut self, batch: MutationBatch) {
        self.pending_mutations.merge(batch);
    }

    /// Attach a subtree under `parent`, before `before` when given
    fn attach(&mut self, parent: NodeId, before: Option<NodeId>, element: &ElementNode) {
        self.graft(parent, before, &element.to_html());
        self.record(MutationBatch {
            records: 1,
            added_nodes: 1,
            removed_nodes: 0,
        });
    }

    /// Parse `markup` in body context and copy the resulting nodes into the document
    fn graft(&mut self, parent: NodeId, before: Option<NodeId>, markup: &str) {
        let fragment = Html::parse_fragment(markup);
        for source in fragment.root_element().children() {
            let value = source.value().clone();
            let copied = match before {
                Some(anchor) => self.document.tree.get_mut(anchor).map(|mut a| a.insert_before(value).id()),
                None => self.document.tree.get_mut(parent).map(|mut p| p.append(value).id()),
            };
            if let Some(mut node) = copied.and_then(|id| self.document.tree.get_mut(id)) {
                copy_children(&mut node, source, &mut []);
            }
        }
    }

    /// Detach a subtree; the caller records the mutation
    fn detach(&mut self, id: NodeId) {
        let size = self.document.tree.get(id).map(|node| node.descendants().count()).unwrap_or(0);
        if let Some(mut node) = self.document.tree.get_mut(id) {
            node.detach();
        }
        self.detached += size;
        if self.focused.is_some_and(|focused| !self.is_attached(focused)) {
            self.focused = None;
        }
    }

    /// Rebuild the tree from its attached nodes once detached ones dominate it
    fn compact_if_sparse(&mut self) {
        let attached = self.document.tree.root().descendants().count();
        if self.detached <= attached.max(COMPACT_THRESHOLD) {
            return;
        }

        let mut fresh = Html::new_document();
        let mut watch = [(self.body, None), (self.focused.unwrap_or(self.body), None)];
        copy_children(&mut fresh.tree.root_mut(), self.document.tree.root(), &mut watch);

        self.body = watch[0].1.unwrap_or_else(|| fresh.tree.root().id());
        self.focused = self.focused.and(watch[1].1);
        self.document = fresh;
        self.detached = 0;
        log::trace!("Compacted in-memory document to {} nodes", attached);
    }
}

/// Copy the children of `source` under `target`, noting where watched nodes land
fn copy_children(target: &mut NodeMut<'_, Node>, source: NodeRef<'_, Node>, watch: &mut [(NodeId, Option<NodeId>)]) {
    for child in source.children() {
        let mut copied = target.append(child.value().clone());
        for (from, to) in watch.iter_mut() {
            if *from == child.id() {
                *to = Some(copied.id());
            }
        }
        copy_children(&mut copied, child, watch);
    }
}

fn to_element(node: NodeRef<'_, Node>) -> Option<ElementNode> {
    let element = node.value().as_element()?;
    let mut out = ElementNode::new(element.name());
    for (name, value) in element.attrs() {
        out.add_attribute(name, value);
    }

    let mut text = String::new();
    for child in node.children() {
        match child.value() {
            Node::Text(t) => text.push_str(&t.text),
            Node::Element(_) => out.children.extend(to_element(child)),
            _ => {}
        }
    }
    if !text.is_empty() {
        out.text_content = Some(text);
    }
    Some(out)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AssistError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

impl HostPage for MemoryPage {
    fn ready_state(&self) -> Result<ReadyState> {
        Ok(self.ready_state)
    }

    fn has_id(&self, id: &str) -> Result<bool> {
        Ok(self.find_by_id(id).is_some())
    }

    fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.query_first(selector)?.is_some())
    }

    fn text_of(&self, selector: &str) -> Result<Option<String>> {
        Ok(self.query_first(selector)?.map(|id| self.text_content(id)))
    }

    fn selection_text(&self) -> Result<String> {
        Ok(self.selection.clone())
    }

    fn insert(&mut self, element: &ElementNode, placement: &Placement) -> Result<bool> {
        match placement {
            Placement::Body => {
                self.attach(self.body, None, element);
                Ok(true)
            }
            Placement::AppendTo(selector) => match self.query_first(selector)? {
                Some(parent) => {
                    self.attach(parent, None, element);
                    Ok(true)
                }
                None => Ok(false),
            },
            Placement::Before(selector) => {
                let anchor = self.query_first(selector)?;
                let parent = anchor
                    .and_then(|a| self.document.tree.get(a))
                    .and_then(|a| a.parent())
                    .map(|p| p.id());
                match (parent, anchor) {
                    (Some(parent), Some(anchor)) => {
                        self.attach(parent, Some(anchor), element);
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }
        }
    }

    fn remove_by_id(&mut self, id: &str) -> Result<bool> {
        match self.find_by_id(id) {
            Some(node) if !self.holds_body(node) => {
                self.detach(node);
                self.record(MutationBatch {
                    records: 1,
                    added_nodes: 0,
                    removed_nodes: 1,
                });
                self.compact_if_sparse();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn replace_text(&mut self, selector: &str, text: &str) -> Result<bool> {
        let Some(target) = self.query_first(selector)? else {
            return Ok(false);
        };

        let children: Vec<NodeId> = self
            .document
            .tree
            .get(target)
            .map(|node| node.children().map(|c| c.id()).collect())
            .unwrap_or_default();
        let removed = children.len();
        for child in children {
            self.detach(child);
        }

        let mut escaped = String::new();
        escape_html(text, false, &mut escaped);
        self.graft(target, None, &escaped);
        self.record(MutationBatch {
            records: 1,
            added_nodes: usize::from(!text.is_empty()),
            removed_nodes: removed,
        });

        self.focused = Some(target);
        self.compact_if_sparse();
        Ok(true)
    }

    fn write_clipboard(&mut self, text: &str) -> Result<()> {
        if !self.clipboard_available {
            return Err(AssistError::ClipboardFailed("clipboard access denied".to_string()));
        }
        self.clipboard = Some(text.to_string());
        Ok(())
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        self.notices.push(message.to_string());
        Ok(())
    }

    fn post_to_frame(&mut self, frame_id: &str, message: &ChannelMessage, target_origin: &str) -> Result<bool> {
        let is_frame = self
            .find_by_id(frame_id)
            .and_then(|id| self.element(id))
            .is_some_and(|element| element.value().name() == "iframe");
        if !is_frame {
            return Ok(false);
        }
        self.frame_posts.push(FramePost {
            frame_id: frame_id.to_string(),
            message: message.clone(),
            target_origin: target_origin.to_string(),
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gmail_like() -> MemoryPage {
        MemoryPage::with_body(vec![
            ElementNode::new("div")
                .with_attribute("role", "toolbar")
                .with_child(ElementNode::new("span").with_id("first")),
            ElementNode::new("div").with_id("compose").with_child(
                ElementNode::new("div")
                    .with_attribute("role", "textbox")
                    .with_attribute("aria-label", "Message Body")
                    .with_text("  Hello  ")
                    .with_child(ElementNode::new("b").with_text("there")),
            ),
        ])
    }

    #[test]
    fn test_with_body_starts_clean() {
        let mut page = gmail_like();
        assert!(page.take_mutations().is_none());
        assert_eq!(page.snapshot().count_elements(), 6);
    }

    #[test]
    fn test_query_and_text() {
        let page = gmail_like();
        assert!(page.exists("[role=\"toolbar\"]").unwrap());
        assert!(page.has_id("first").unwrap());
        assert_eq!(
            page.text_of("[role=\"textbox\"][aria-label*=\"Message\"]").unwrap().as_deref(),
            Some("  Hello  there")
        );
        assert_eq!(page.text_of(".missing").unwrap(), None);
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let page = gmail_like();
        assert!(matches!(
            page.exists("div[role="),
            Err(AssistError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_markup_in_text_stays_text() {
        let page = MemoryPage::with_body(vec![ElementNode::new("div").with_id("note").with_text("<b>hi</b> & bye")]);
        assert_eq!(page.text_of("#note").unwrap().as_deref(), Some("<b>hi</b> & bye"));
        assert_eq!(page.count("b").unwrap(), 0);
    }

    #[test]
    fn test_insert_before_keeps_sibling_order() {
        let mut page = gmail_like();
        let inserted = page
            .insert(&ElementNode::new("button").with_id("new"), &Placement::Before("#first".to_string()))
            .unwrap();
        assert!(inserted);

        let toolbar = &page.snapshot().children[0];
        assert_eq!(toolbar.children[0].id(), Some("new"));
        assert_eq!(toolbar.children[1].id(), Some("first"));
    }

    #[test]
    fn test_insert_reports_missing_anchor() {
        let mut page = MemoryPage::new();
        let element = ElementNode::new("button");
        assert!(!page.insert(&element, &Placement::AppendTo("#nowhere".to_string())).unwrap());
        assert!(!page.insert(&element, &Placement::Before("#nowhere".to_string())).unwrap());
        assert!(page.take_mutations().is_none());
    }

    #[test]
    fn test_remove_matching_records_mutations() {
        let mut page = gmail_like();
        // The textbox div is detached together with #compose.
        assert_eq!(page.remove_matching("div").unwrap(), 2);
        assert!(!page.has_id("first").unwrap());

        match page.take_mutations() {
            Some(PageEvent::Mutations(batch)) => {
                assert!(batch.qualifies());
                assert_eq!(batch.removed_nodes, 2);
            }
            other => panic!("Expected mutation batch, got {:?}", other),
        }
    }

    #[test]
    fn test_body_is_never_removed() {
        let mut page = gmail_like();
        assert_eq!(page.remove_matching("body").unwrap(), 0);
        assert_eq!(page.remove_matching("html").unwrap(), 0);
        assert!(page.exists("[role=\"toolbar\"]").unwrap());
    }

    #[test]
    fn test_remove_absent_id_is_noop() {
        let mut page = gmail_like();
        assert!(!page.remove_by_id("ghost").unwrap());
        assert!(page.take_mutations().is_none());
    }

    #[test]
    fn test_replace_text_focuses_and_drops_children() {
        let mut page = gmail_like();
        assert!(page.replace_text("[role=\"textbox\"]", "Reply <3").unwrap());
        assert_eq!(page.text_of("[role=\"textbox\"]").unwrap().as_deref(), Some("Reply <3"));
        assert_eq!(page.count("b").unwrap(), 0);
        assert_eq!(page.focused_id(), None);

        assert!(page.replace_text("#compose", "Whole").unwrap());
        assert_eq!(page.focused_id().as_deref(), Some("compose"));
    }

    #[test]
    fn test_click_resolves_role_through_ancestors() {
        let mut page = MemoryPage::with_body(vec![
            ElementNode::new("button")
                .with_attribute(ROLE_ATTRIBUTE, "trigger")
                .with_child(ElementNode::new("svg").with_id("icon")),
            ElementNode::new("a").with_id("plain"),
        ]);
        page.set_selection("quoted");

        assert_eq!(
            page.click("#icon").unwrap(),
            Some(PageEvent::TriggerActivated { selection: Some("quoted".to_string()) })
        );
        assert_eq!(page.click("#plain").unwrap(), None);
        assert_eq!(page.intercepted_clicks(), 1);
    }

    #[test]
    fn test_frame_posts_require_iframe() {
        let mut page = MemoryPage::with_body(vec![
            ElementNode::new("iframe").with_id("popup").with_attribute(GENERATION_ATTRIBUTE, "4"),
            ElementNode::new("div").with_id("not-a-frame"),
        ]);
        let message = ChannelMessage::ClosePopup;

        assert!(page.post_to_frame("popup", &message, "*").unwrap());
        assert!(!page.post_to_frame("not-a-frame", &message, "*").unwrap());
        assert_eq!(page.frame_posts().len(), 1);
        assert_eq!(
            page.finish_frame_load("popup"),
            Some(PageEvent::FrameLoaded { frame_id: "popup".to_string(), generation: 4 })
        );
        assert_eq!(page.finish_frame_load("not-a-frame"), None);
    }

    #[test]
    fn test_detached_nodes_are_reclaimed() {
        let mut page = MemoryPage::with_body(vec![ElementNode::new("div").with_id("app")]);
        page.replace_text("#app", "").unwrap();

        for round in 0..200 {
            let toolbar = ElementNode::new("div")
                .with_attribute("role", "toolbar")
                .with_child(ElementNode::new("span").with_text(format!("render {}", round)));
            assert!(page.mount("#app", toolbar).unwrap());
            assert_eq!(page.remove_matching("[role=\"toolbar\"]").unwrap(), 1);
        }

        assert!(page.allocated_nodes() < 2 * COMPACT_THRESHOLD);
        assert!(page.has_id("app").unwrap());
        assert_eq!(page.focused_id().as_deref(), Some("app"));
        assert!(page.mount("#app", ElementNode::new("span").with_id("after")).unwrap());
        assert_eq!(page.count("body #app #after").unwrap(), 1);
    }

    #[test]
    fn test_clipboard_denied() {
        let mut page = MemoryPage::new();
        page.set_clipboard_available(false);
        assert!(matches!(page.write_clipboard("x"), Err(AssistError::ClipboardFailed(_))));
        assert_eq!(page.clipboard(), None);
    }
}
