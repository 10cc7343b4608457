//! Browser service request and response types

use serde::{Deserialize, Serialize};

// ============================================================================
// SESSION TYPES
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
}

// ============================================================================
// RENDER TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RenderRequest<'a> {
    pub diagram: &'a str,
    pub theme: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderResponse {
    pub markup: String,
}
