//! Live browser binding over the Chrome DevTools Protocol

pub mod config;
pub mod driver;
pub mod page;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use driver::TabDriver;
pub use page::CdpPage;
pub use session::BrowserSession;
