use crate::assistant::{HttpReplyGenerator, ReplyGenerator};
use crate::browser::{BrowserSession, LaunchOptions, TabDriver};
use crate::config::AssistConfig;
use crate::error::Result as AssistResult;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::router::tool::ToolRouter,
    model::{ServerCapabilities, ServerInfo},
    tool_handler,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// MCP server exposing the assistant flow on a driven browser tab
#[derive(Clone)]
pub struct AssistServer {
    driver: Arc<Mutex<TabDriver>>,
    generator: Arc<dyn ReplyGenerator>,
    tool_router: ToolRouter<Self>,
}

impl AssistServer {
    pub fn new(driver: TabDriver, generator: Arc<dyn ReplyGenerator>) -> Self {
        Self {
            driver: Arc::new(Mutex::new(driver)),
            generator,
            tool_router: Self::tool_router(),
        }
    }

    /// Launch a browser and talk to the configured HTTP backend
    pub fn with_options(options: LaunchOptions, config: Arc<AssistConfig>) -> AssistResult<Self> {
        let generator = HttpReplyGenerator::new(&config.backend)?;
        let session = BrowserSession::launch(options)?;
        let driver = TabDriver::attach(session, config)?;
        Ok(Self::new(driver, Arc::new(generator)))
    }

    /// Keep processing page events between tool calls
    ///
    /// Clicks on the trigger, host re-renders and frame messages are handled
    /// at the configured poll interval until `cancel` fires. Must be called
    /// from within a Tokio runtime.
    pub fn spawn_page_pump(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let driver = self.driver.clone();
        tokio::spawn(async move {
            let period = match driver.lock() {
                Ok(driver) => driver.script().config().poll_interval(),
                Err(e) => {
                    log::error!("Driver lock poisoned, page pump not started: {}", e);
                    return;
                }
            };
            log::info!("Pumping page events every {:?}", period);

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => pump_once(&driver),
                }
            }
            log::info!("Page pump stopped");
        })
    }

    pub(crate) fn driver(&self) -> std::result::Result<MutexGuard<'_, TabDriver>, McpError> {
        self.driver
            .lock()
            .map_err(|e| McpError::internal_error(format!("Driver lock poisoned: {}", e), None))
    }

    pub(crate) fn generator(&self) -> &dyn ReplyGenerator {
        self.generator.as_ref()
    }
}

fn pump_once(driver: &Mutex<TabDriver>) {
    let mut driver = match driver.lock() {
        Ok(driver) => driver,
        Err(e) => {
            log::warn!("Driver lock poisoned: {}", e);
            return;
        }
    };
    match driver.pump(Instant::now()) {
        Ok(effects) => {
            for effect in effects {
                log::info!("{:?}", effect);
            }
        }
        Err(e) => log::warn!("Pump failed: {}", e),
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for AssistServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Email reply assistant on a driven webmail tab. Navigate to the mail client, \
                 extract the email being read or composed, draft a reply in a chosen tone and \
                 insert it into the compose box."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
