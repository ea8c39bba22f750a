use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::classify::{Classification, Palette, ProjectRecord, ScoreTier, ScoreTierCounts};
use crate::lifecycle::ConnectionState;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClassifyProjectParams {
    /// Project status label: "Draft", "Planning", "Approved", "In Progress" or "Completed".
    #[serde(default)]
    pub status: String,
    /// Project category label: "Highway", "Transit" or "Active Transportation".
    #[serde(default)]
    pub category: String,
    /// Project score, conventionally 0-100.
    #[serde(default)]
    pub score: i64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SummarizeProjectsParams {
    /// Projects to classify, in display order.
    pub projects: Vec<ProjectRecord>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClassifyReportStatusParams {
    /// Report status label such as "Published", "Draft" or "Under Review".
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClassifyModerationParams {
    /// Moderation status: "approved", "rejected" or "pending".
    #[serde(default)]
    pub status: String,
    /// AI moderation risk score between 0 and 1, if one was computed.
    pub ai_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectClassificationResponse {
    pub status_tier: Palette,
    pub category_tier: Palette,
    pub score_tier: ScoreTier,
    /// Palette used to render the score itself.
    pub score_palette: Palette,
}

impl From<Classification> for ProjectClassificationResponse {
    fn from(c: Classification) -> Self {
        Self {
            status_tier: c.status_tier,
            category_tier: c.category_tier,
            score_tier: c.score_tier,
            score_palette: c.score_tier.palette(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectSummaryResponse {
    pub projects: Vec<ProjectClassificationResponse>,
    pub score_tiers: ScoreTierCounts,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PaletteResponse {
    pub tier: Palette,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModerationClassificationResponse {
    pub status_tier: Palette,
    pub ai_score_tier: Palette,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreStatusResponse {
    pub state: ConnectionState,
    /// Store URI with credentials masked.
    pub uri: String,
    /// Result of a live PING; false when not connected.
    pub healthy: bool,
    pub error: Option<String>,
}
