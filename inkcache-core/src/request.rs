//! Decoded render request types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagram theme. Anything other than the literal `"dark"` is `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Dark,
}

impl Theme {
    /// Map the raw `theme` query value. Fails open to `Default`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("dark") => Theme::Dark,
            _ => Theme::Default,
        }
    }

    /// Name passed to the renderer.
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A diagram to render, owned by one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRequest {
    pub diagram_source: String,
    pub theme: Theme,
}
