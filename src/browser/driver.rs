use crate::browser::page::CdpPage;
use crate::browser::session::BrowserSession;
use crate::config::AssistConfig;
use crate::content_script::{ContentScript, Effect};
use crate::dom::HostPage;
use crate::error::Result;
use crate::event::PageEvent;
use std::sync::Arc;
use std::time::Instant;

/// Runs the content script against the active tab of a browser session
///
/// The page is polled: each [`TabDriver::pump`] drains the events the shim
/// buffered, feeds them to the content script and advances its timers. When
/// the tab has navigated away the shim is gone; the driver installs it again
/// and starts a fresh content script for the new document.
pub struct TabDriver {
    session: BrowserSession,
    script: ContentScript<CdpPage>,
}

impl TabDriver {
    pub fn attach(session: BrowserSession, config: Arc<AssistConfig>) -> Result<Self> {
        let script = Self::start_script(&session, config)?;
        Ok(Self { session, script })
    }

    fn start_script(session: &BrowserSession, config: Arc<AssistConfig>) -> Result<ContentScript<CdpPage>> {
        let page = CdpPage::new(session.tab()?);
        page.install_shim()?;
        let mut script = ContentScript::new(page, config);
        let effect = script.start()?;
        log::info!("Attached to {}: {:?}", script.page().tab().get_url(), effect);
        Ok(script)
    }

    pub fn session(&self) -> &BrowserSession {
        &self.session
    }

    pub fn script(&self) -> &ContentScript<CdpPage> {
        &self.script
    }

    pub fn script_mut(&mut self) -> &mut ContentScript<CdpPage> {
        &mut self.script
    }

    /// Navigate the tab and attach to the new document
    pub fn navigate(&mut self, url: &str) -> Result<()> {
        self.session.navigate(url)?;
        self.session.wait_for_navigation()?;
        self.reattach()
    }

    fn reattach(&mut self) -> Result<()> {
        let config = self.script.config().clone();
        self.script = Self::start_script(&self.session, config)?;
        Ok(())
    }

    /// Process everything that happened in the page since the last pump
    ///
    /// Returns the effects of the handled events, without the no-ops. A
    /// failing event or timer is logged and does not discard the effects
    /// already produced.
    pub fn pump(&mut self, now: Instant) -> Result<Vec<Effect>> {
        let Some(events) = self.script.page().drain_events()? else {
            log::info!("Page shim missing after navigation; reattaching");
            self.reattach()?;
            return Ok(Vec::new());
        };

        Ok(dispatch(&mut self.script, events, now))
    }

    /// Pump at the configured poll interval until cancelled
    #[cfg(feature = "cli")]
    pub async fn run(&mut self, cancel: tokio_util::sync::CancellationToken) -> Result<()> {
        let interval = self.script.config().poll_interval();
        log::info!("Driving tab every {:?}", interval);

        loop {
            match self.pump(Instant::now()) {
                Ok(effects) => {
                    for effect in effects {
                        log::info!("{:?}", effect);
                    }
                }
                Err(e) => log::warn!("Pump failed: {}", e),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        if let Err(e) = self.script.close_overlay() {
            log::debug!("Failed to close overlay on shutdown: {}", e);
        }
        log::info!("Driver stopped");
        Ok(())
    }
}

/// Feed drained events to the script and advance its timers
fn dispatch<P: HostPage>(script: &mut ContentScript<P>, events: Vec<PageEvent>, now: Instant) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(events.len() + 1);
    for event in events {
        log::debug!("Page event: {:?}", event);
        match script.handle_event(event, now) {
            Ok(effect) => effects.push(effect),
            Err(e) => log::warn!("Failed to handle page event: {}", e),
        }
    }
    match script.tick(now) {
        Ok(effect) => effects.push(effect),
        Err(e) => log::warn!("Failed to run scheduled reconciliation: {}", e),
    }

    effects.retain(|effect| *effect != Effect::None);
    effects
}
