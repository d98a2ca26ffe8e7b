//! Host-side coordinator
//!
//! `ContentScript` owns the page binding and the components that act on it,
//! and processes page events one at a time. Everything that waits (the
//! re-injection delay, the frame load) is expressed as state advanced by
//! [`ContentScript::handle_event`] and [`ContentScript::tick`], so the same
//! code runs against a live tab or an in-memory page.

use crate::channel::{Channel, ChannelMessage};
use crate::config::AssistConfig;
use crate::dom::HostPage;
use crate::error::Result;
use crate::event::PageEvent;
use crate::extractor::{ExtractedContent, extract_content};
use crate::injector::{Activation, Reconciled, TriggerInjector};
use crate::insertion::{Insertion, insert_response};
use crate::overlay::OverlayManager;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// What handling one event led to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    None,
    Reconciled { result: Reconciled },
    ReconcileScheduled,
    Activated { activation: Activation },
    OverlayClosed { removed: bool },
    ContentDelivered,
    ResponseInserted { insertion: Insertion },
    MessageIgnored,
}

/// Snapshot of the coordinator's view of the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub trigger_present: bool,
    pub overlay_open: bool,
    pub overlay_generation: u64,
    pub awaiting_frame_load: bool,
    pub reconcile_pending: bool,
}

pub struct ContentScript<P: HostPage> {
    page: P,
    config: Arc<AssistConfig>,
    injector: TriggerInjector,
    overlay: OverlayManager,
    channel: Channel,
}

impl<P: HostPage> ContentScript<P> {
    pub fn new(page: P, config: Arc<AssistConfig>) -> Self {
        Self {
            injector: TriggerInjector::new(config.clone()),
            overlay: OverlayManager::new(config.clone()),
            channel: Channel::new(&config),
            page,
            config,
        }
    }

    /// Attach to the page: place the trigger now if the document is parsed,
    /// otherwise wait for [`PageEvent::Ready`]
    pub fn start(&mut self) -> Result<Effect> {
        if self.page.ready_state()?.is_parsed() {
            let result = self.injector.ensure_present(&mut self.page)?;
            Ok(Effect::Reconciled { result })
        } else {
            log::debug!("Document still loading; waiting for ready signal");
            Ok(Effect::None)
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn config(&self) -> &Arc<AssistConfig> {
        &self.config
    }

    pub fn into_page(self) -> P {
        self.page
    }

    /// Handle one page event
    pub fn handle_event(&mut self, event: PageEvent, now: Instant) -> Result<Effect> {
        match event {
            PageEvent::Ready => {
                let result = self.injector.ensure_present(&mut self.page)?;
                Ok(Effect::Reconciled { result })
            }
            PageEvent::Mutations(batch) => {
                let was_pending = self.injector.deadline().is_some();
                self.injector.on_mutations(&self.page, &batch, now)?;
                if !was_pending && self.injector.deadline().is_some() {
                    Ok(Effect::ReconcileScheduled)
                } else {
                    Ok(Effect::None)
                }
            }
            PageEvent::TriggerActivated { selection } => self.activate_with_selection(selection.as_deref()),
            PageEvent::CloseRequested => self.close_overlay(),
            PageEvent::FrameLoaded { frame_id, generation } => {
                let delivered = self
                    .overlay
                    .on_frame_loaded(&mut self.page, &self.channel, &frame_id, generation)?;
                Ok(if delivered { Effect::ContentDelivered } else { Effect::None })
            }
            PageEvent::Message { origin, data } => match self.channel.accept_inbound(&origin, &data) {
                Some(message) => self.handle_message(message),
                None => Ok(Effect::MessageIgnored),
            },
        }
    }

    /// Advance timers; runs a due reconciliation
    pub fn tick(&mut self, now: Instant) -> Result<Effect> {
        match self.injector.on_tick(&mut self.page, now)? {
            Some(result) => Ok(Effect::Reconciled { result }),
            None => Ok(Effect::None),
        }
    }

    /// Dispatch a decoded inbound channel message
    ///
    /// Messages are handled whether or not an overlay is open; with none open
    /// a close request is a no-op.
    pub fn handle_message(&mut self, message: ChannelMessage) -> Result<Effect> {
        match message {
            ChannelMessage::ClosePopup => self.close_overlay(),
            ChannelMessage::InsertResponse { response } => {
                let insertion = self.insert_response(&response)?;
                Ok(Effect::ResponseInserted { insertion })
            }
            ChannelMessage::InitialContent { .. } => {
                log::warn!("Ignoring INITIAL_CONTENT sent to the host page");
                Ok(Effect::MessageIgnored)
            }
        }
    }

    /// Run the activation flow as if the trigger had been clicked
    pub fn activate(&mut self) -> Result<Effect> {
        self.activate_with_selection(None)
    }

    fn activate_with_selection(&mut self, selection: Option<&str>) -> Result<Effect> {
        let activation = self.injector.activate(&mut self.page, &mut self.overlay, selection)?;
        Ok(Effect::Activated { activation })
    }

    pub fn close_overlay(&mut self) -> Result<Effect> {
        let removed = self.overlay.close(&mut self.page)?;
        Ok(Effect::OverlayClosed { removed })
    }

    pub fn insert_response(&mut self, response: &str) -> Result<Insertion> {
        insert_response(&mut self.page, &self.config, response)
    }

    pub fn extract_content(&self) -> Result<Option<ExtractedContent>> {
        extract_content(&self.page)
    }

    pub fn status(&self) -> Result<Status> {
        Ok(Status {
            trigger_present: self.injector.is_present(&self.page)?,
            overlay_open: self.overlay.is_open(&self.page)?,
            overlay_generation: self.overlay.generation(),
            awaiting_frame_load: self.overlay.has_pending_handoff(),
            reconcile_pending: self.injector.deadline().is_some(),
        })
    }
}
