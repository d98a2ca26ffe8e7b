use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tone choices offered by the assistant form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ToneKind {
    #[default]
    Professional,
    Casual,
    Friendly,
    Custom,
}

impl ToneKind {
    pub const ALL: [ToneKind; 4] = [ToneKind::Professional, ToneKind::Casual, ToneKind::Friendly, ToneKind::Custom];

    pub fn as_str(self) -> &'static str {
        match self {
            ToneKind::Professional => "professional",
            ToneKind::Casual => "casual",
            ToneKind::Friendly => "friendly",
            ToneKind::Custom => "custom",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ToneKind::Professional => "Professional",
            ToneKind::Casual => "Casual",
            ToneKind::Friendly => "Friendly",
            ToneKind::Custom => "Custom",
        }
    }
}

impl fmt::Display for ToneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated tone; `Custom` always carries non-empty text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tone {
    Professional,
    Casual,
    Friendly,
    Custom(String),
}

impl Tone {
    /// Combine a tone kind with the free-text field; `None` when custom text is blank
    pub fn from_parts(kind: ToneKind, custom: &str) -> Option<Self> {
        match kind {
            ToneKind::Professional => Some(Tone::Professional),
            ToneKind::Casual => Some(Tone::Casual),
            ToneKind::Friendly => Some(Tone::Friendly),
            ToneKind::Custom => {
                let custom = custom.trim();
                (!custom.is_empty()).then(|| Tone::Custom(custom.to_string()))
            }
        }
    }

    /// Value sent to the backend as `tone`
    pub fn request_value(&self) -> &str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Friendly => "friendly",
            Tone::Custom(text) => text,
        }
    }
}
