//! MCP (Model Context Protocol) server for the email assistant
//!
//! Each tool works on the tab owned by the server's [`TabDriver`](crate::browser::TabDriver).
//! Page events are pumped in the background by
//! [`AssistServer::spawn_page_pump`] and again before every tool runs, so the
//! tools see the same state a user clicking in the page would.

pub mod handler;
pub use handler::AssistServer;

use crate::assistant::{AssistantForm, ToneKind, draft_reply};
use crate::error::AssistError;
use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    tool, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Navigate tool parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NavigateParams {
    /// URL of the mail client page
    pub url: String,
}

/// Draft tool parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DraftParams {
    /// Email text to reply to; extracted from the page when omitted
    #[serde(default)]
    pub email_content: Option<String>,
    /// Tone of the reply (default: professional)
    #[serde(default)]
    pub tone: ToneKind,
    /// Free-text tone, required when tone is "custom"
    #[serde(default)]
    pub custom_tone: Option<String>,
}

/// Insert tool parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InsertParams {
    /// Reply text to place into the compose box
    pub response: String,
}

fn internal(e: AssistError) -> McpError {
    McpError::internal_error(e.to_string(), None)
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[tool_router]
impl AssistServer {
    /// Navigate the driven tab
    #[tool(description = "Navigate the assistant's browser tab to a webmail URL and attach to the page")]
    fn assist_navigate(&self, params: Parameters<NavigateParams>) -> Result<CallToolResult, McpError> {
        let mut driver = self.driver()?;
        driver.navigate(&params.0.url).map_err(internal)?;
        let status = driver.script().status().map_err(internal)?;
        json_result(&status)
    }

    /// Report trigger and overlay state
    #[tool(description = "Report whether the assistant button is present and whether the overlay is open")]
    fn assist_status(&self) -> Result<CallToolResult, McpError> {
        let mut driver = self.driver()?;
        driver.pump(Instant::now()).map_err(internal)?;
        let status = driver.script().status().map_err(internal)?;
        json_result(&status)
    }

    /// Extract the email the user is working on
    #[tool(description = "Extract the email being composed or read, or the selected text")]
    fn assist_extract_content(&self) -> Result<CallToolResult, McpError> {
        let mut driver = self.driver()?;
        driver.pump(Instant::now()).map_err(internal)?;
        match driver.script().extract_content().map_err(internal)? {
            Some(content) => json_result(&content),
            None => Ok(CallToolResult::success(vec![Content::text(
                driver.script().config().notices.no_content.clone(),
            )])),
        }
    }

    /// Activate the assistant as if its button had been clicked
    #[tool(description = "Open the assistant overlay with the current email content, as if the assistant button was clicked")]
    fn assist_activate(&self) -> Result<CallToolResult, McpError> {
        let mut driver = self.driver()?;
        driver.pump(Instant::now()).map_err(internal)?;
        let effect = driver.script_mut().activate().map_err(internal)?;
        json_result(&effect)
    }

    /// Generate a reply through the backend
    #[tool(description = "Draft a reply to an email in the given tone (professional, casual, friendly or custom)")]
    async fn assist_draft_reply(&self, params: Parameters<DraftParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let email_content = match params.email_content {
            Some(content) => content,
            None => {
                let mut driver = self.driver()?;
                driver.pump(Instant::now()).map_err(internal)?;
                driver
                    .script()
                    .extract_content()
                    .map_err(internal)?
                    .map(|content| content.text)
                    .unwrap_or_default()
            }
        };

        let mut form = AssistantForm::new();
        form.set_email_content(email_content);
        form.select_tone(params.tone);
        form.set_custom_tone(params.custom_tone.unwrap_or_default());

        match draft_reply(&mut form, self.generator()).await {
            Some(reply) => Ok(CallToolResult::success(vec![Content::text(reply)])),
            None => match form.error_message() {
                Some(message) => Err(McpError::invalid_request(message.to_string(), None)),
                None => Ok(CallToolResult::success(vec![Content::text(String::new())])),
            },
        }
    }

    /// Insert a reply into the page
    #[tool(description = "Insert reply text into the open compose box, falling back to the clipboard")]
    fn assist_insert_response(&self, params: Parameters<InsertParams>) -> Result<CallToolResult, McpError> {
        let mut driver = self.driver()?;
        driver.pump(Instant::now()).map_err(internal)?;
        let insertion = driver.script_mut().insert_response(&params.0.response).map_err(internal)?;
        json_result(&insertion)
    }

    /// Close the overlay
    #[tool(description = "Close the assistant overlay if it is open")]
    fn assist_close_overlay(&self) -> Result<CallToolResult, McpError> {
        let mut driver = self.driver()?;
        let effect = driver.script_mut().close_overlay().map_err(internal)?;
        json_result(&effect)
    }
}
