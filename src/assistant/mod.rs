//! The assistant that runs inside the overlay frame: tone selection, form
//! state and the reply backend client.

pub mod form;
pub mod generator;
pub mod tone;

pub use form::{AssistantForm, FormPhase, draft_reply};
pub use generator::{GenerateError, HttpReplyGenerator, ReplyGenerator, ReplyRequest};
pub use tone::{Tone, ToneKind};
