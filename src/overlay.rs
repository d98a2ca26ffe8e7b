//! Overlay hosting the embedded assistant
//!
//! The overlay is a frame plus a close affordance, both identified by fixed
//! ids. Opening always removes any existing overlay first, so at most one is
//! attached at a time. The initial content is handed off only after the frame
//! reports that it finished loading.

use crate::channel::{Channel, ChannelMessage};
use crate::config::AssistConfig;
use crate::dom::{ElementNode, GENERATION_ATTRIBUTE, HostPage, Placement, ROLE_ATTRIBUTE};
use crate::error::Result;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingHandoff {
    generation: u64,
    content: String,
}

/// Owner of the one-overlay-at-a-time invariant
#[derive(Debug)]
pub struct OverlayManager {
    config: Arc<AssistConfig>,
    generation: u64,
    pending: Option<PendingHandoff>,
}

impl OverlayManager {
    pub fn new(config: Arc<AssistConfig>) -> Self {
        Self {
            config,
            generation: 0,
            pending: None,
        }
    }

    /// Generation of the most recently opened overlay (0 before the first open)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a content handoff is still waiting for the frame to load
    pub fn has_pending_handoff(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_open<P: HostPage + ?Sized>(&self, page: &P) -> Result<bool> {
        page.has_id(&self.config.overlay.frame_id)
    }

    /// Replace any existing overlay with a fresh one that will receive `content`
    pub fn open<P: HostPage + ?Sized>(&mut self, page: &mut P, content: impl Into<String>) -> Result<()> {
        self.close(page)?;

        self.generation += 1;
        let generation = self.generation;

        page.insert(&self.frame_element(generation), &Placement::Body)?;
        page.insert(&self.close_element(), &Placement::Body)?;

        self.pending = Some(PendingHandoff {
            generation,
            content: content.into(),
        });
        log::info!("Opened assistant overlay (generation {})", generation);
        Ok(())
    }

    /// Deliver the initial content once the current frame has loaded
    ///
    /// Load signals for another frame or an earlier generation are ignored.
    /// Delivery happens at most once per open and is never retried.
    pub fn on_frame_loaded<P: HostPage + ?Sized>(
        &mut self,
        page: &mut P,
        channel: &Channel,
        frame_id: &str,
        generation: u64,
    ) -> Result<bool> {
        if frame_id != self.config.overlay.frame_id {
            return Ok(false);
        }
        let Some(pending) = self.pending.take_if(|p| p.generation == generation) else {
            log::debug!("Ignoring load of stale overlay frame (generation {})", generation);
            return Ok(false);
        };

        channel.send(
            page,
            frame_id,
            &ChannelMessage::InitialContent {
                content: pending.content,
            },
        )
    }

    /// Remove the frame and its close affordance; a no-op when neither is attached
    pub fn close<P: HostPage + ?Sized>(&mut self, page: &mut P) -> Result<bool> {
        self.pending = None;
        let frame_removed = page.remove_by_id(&self.config.overlay.frame_id)?;
        let close_removed = page.remove_by_id(&self.config.overlay.close_id)?;
        if frame_removed || close_removed {
            log::info!("Closed assistant overlay");
        }
        Ok(frame_removed || close_removed)
    }

    fn frame_element(&self, generation: u64) -> ElementNode {
        let overlay = &self.config.overlay;
        let style = format!(
            "position: fixed; top: 50%; left: 50%; transform: translate(-50%, -50%); \
             width: {}px; height: {}px; max-width: {}vw; max-height: {}vh; \
             border: none; border-radius: 12px; box-shadow: 0 20px 60px rgba(0, 0, 0, 0.3); \
             z-index: {}; background: white;",
            overlay.width_px, overlay.height_px, overlay.max_width_vw, overlay.max_height_vh, overlay.z_index
        );

        ElementNode::new("iframe")
            .with_id(overlay.frame_id.as_str())
            .with_attribute("src", overlay.frame_url.as_str())
            .with_attribute("style", style)
            .with_attribute(GENERATION_ATTRIBUTE, generation.to_string())
    }

    fn close_element(&self) -> ElementNode {
        let overlay = &self.config.overlay;
        // Track the frame's top-right corner, including when the viewport caps shrink it.
        let half_height = format!("min({}px, {}vh)", overlay.height_px / 2, overlay.max_height_vh as f32 / 2.0);
        let half_width = format!("min({}px, {}vw)", overlay.width_px / 2, overlay.max_width_vw as f32 / 2.0);
        let style = format!(
            "position: fixed; top: calc(50% - {} + 10px); left: calc(50% + {} - 40px); \
             width: 30px; height: 30px; border: none; background: rgba(0, 0, 0, 0.7); color: white; \
             border-radius: 50%; cursor: pointer; z-index: {}; font-size: 18px; line-height: 1;",
            half_height,
            half_width,
            overlay.z_index + 1
        );

        ElementNode::new("button")
            .with_id(overlay.close_id.as_str())
            .with_attribute(ROLE_ATTRIBUTE, "close")
            .with_attribute("aria-label", "Close assistant")
            .with_attribute("style", style)
            .with_text("\u{00d7}")
    }
}
