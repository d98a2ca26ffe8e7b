//! # mail-assist
//!
//! Coordination layer for a smart email reply assistant running inside webmail
//! pages (Gmail, Outlook on the web).
//!
//! ## Features
//!
//! - **Trigger injection**: keeps one "Smart Email Assistant" button in the
//!   page, placed next to the host's compose toolbar or pinned to the viewport,
//!   and restores it after the host re-renders
//! - **Content extraction**: picks the email being composed, the message being
//!   read, or the user's selection
//! - **Overlay**: hosts the assistant application in a sandboxed frame and hands
//!   it the extracted email once it has loaded
//! - **Channel**: validated, typed messages between page and frame
//! - **Insertion**: writes a generated reply into the compose box, falling back
//!   to the clipboard
//! - **MCP Server**: exposes the whole flow to agents
//!
//! ## Library Usage
//!
//! The core is written against [`HostPage`]. [`MemoryPage`] is an in-process
//! document useful for tests and embedding; [`CdpPage`] drives a real tab.
//!
//! ```rust
//! use mail_assist::{AssistConfig, ContentScript, ElementNode, MemoryPage, PageEvent};
//! use std::time::Instant;
//!
//! # fn main() -> mail_assist::Result<()> {
//! let page = MemoryPage::with_body(vec![ElementNode::new("div").with_attribute("role", "toolbar")]);
//! let mut script = ContentScript::new(page, AssistConfig::default().into_shared());
//! script.start()?;
//!
//! script.page_mut().set_selection("Can we move our call to Thursday?");
//! script.handle_event(PageEvent::TriggerActivated { selection: None }, Instant::now())?;
//! assert!(script.status()?.overlay_open);
//! # Ok(())
//! # }
//! ```
//!
//! ### Driving a browser tab
//!
//! ```rust,no_run
//! use mail_assist::{AssistConfig, BrowserSession, LaunchOptions, TabDriver};
//! use std::time::Instant;
//!
//! # fn main() -> mail_assist::Result<()> {
//! let session = BrowserSession::launch(LaunchOptions::new().headless(false))?;
//! let mut driver = TabDriver::attach(session, AssistConfig::default().into_shared())?;
//! driver.navigate("https://mail.google.com")?;
//! loop {
//!     for effect in driver.pump(Instant::now())? {
//!         println!("{:?}", effect);
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(200));
//! }
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`content_script`]: event-driven coordinator owning all components below
//! - [`locator`], [`extractor`], [`injector`], [`overlay`], [`channel`], [`insertion`]
//! - [`dom`]: host document abstraction, selector engine and in-memory page
//! - [`browser`]: Chrome session, CDP page binding and tab driver
//! - [`assistant`]: the embedded form, tones and reply backend client
//! - [`config`], [`error`], [`event`]
//! - [`mcp`]: Model Context Protocol server (requires `mcp-handler` feature)

pub mod assistant;
pub mod browser;
pub mod channel;
pub mod config;
pub mod content_script;
pub mod dom;
pub mod error;
pub mod event;
pub mod extractor;
pub mod injector;
pub mod insertion;
pub mod locator;
pub mod overlay;

#[cfg(feature = "mcp-handler")]
pub mod mcp;

pub use assistant::{AssistantForm, GenerateError, HttpReplyGenerator, ReplyGenerator, ReplyRequest, ToneKind};
pub use browser::{BrowserSession, CdpPage, ConnectionOptions, LaunchOptions, TabDriver};
pub use channel::{Channel, ChannelMessage, OriginPolicy};
pub use config::AssistConfig;
pub use content_script::{ContentScript, Effect, Status};
pub use dom::{ElementNode, HostPage, MemoryPage, Placement, ReadyState};
pub use error::{AssistError, Result};
pub use event::{MutationBatch, PageEvent};

#[cfg(feature = "mcp-handler")]
pub use mcp::AssistServer;
#[cfg(feature = "mcp-handler")]
pub use rmcp::ServiceExt;
