use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use transportvoice_common::classify::{
    self, classify_moderation_score, classify_moderation_status, classify_report_status,
};
use transportvoice_common::error::StoreError;
use transportvoice_common::lifecycle::{ConnectionState, LifecycleManager};
use transportvoice_common::mcp_api::{
    ClassifyModerationParams, ClassifyProjectParams, ClassifyReportStatusParams,
    ModerationClassificationResponse, PaletteResponse, ProjectClassificationResponse,
    ProjectSummaryResponse, StoreStatusResponse, SummarizeProjectsParams,
};
use transportvoice_common::store::StoreBackend;

const MAX_BATCH: usize = 1_000;

#[derive(Clone)]
pub struct PlanningServer {
    store: LifecycleManager<StoreBackend>,
    tool_router: ToolRouter<PlanningServer>,
}

impl PlanningServer {
    pub fn new(store: LifecycleManager<StoreBackend>) -> Self {
        Self {
            store,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl PlanningServer {
    #[tool(description = "Classify a project's status, category and score into display tiers.")]
    async fn classify_project(
        &self,
        Parameters(params): Parameters<ClassifyProjectParams>,
    ) -> Result<Json<ProjectClassificationResponse>, String> {
        let classification = classify::classify(&params.status, &params.category, params.score);
        Ok(Json(classification.into()))
    }

    #[tool(description = "Classify a list of projects and tally them by score tier.")]
    async fn summarize_projects(
        &self,
        Parameters(params): Parameters<SummarizeProjectsParams>,
    ) -> Result<Json<ProjectSummaryResponse>, String> {
        if params.projects.len() > MAX_BATCH {
            return Err(format!(
                "too many projects: {} (max {MAX_BATCH})",
                params.projects.len()
            ));
        }

        let summary = classify::summarize(&params.projects);
        let total = summary.score_tiers.total();
        Ok(Json(ProjectSummaryResponse {
            projects: summary.classifications.into_iter().map(Into::into).collect(),
            score_tiers: summary.score_tiers,
            total,
        }))
    }

    #[tool(description = "Classify a report status (e.g. 'Published', 'Under Review') into a display tier.")]
    async fn classify_report_status(
        &self,
        Parameters(params): Parameters<ClassifyReportStatusParams>,
    ) -> Result<Json<PaletteResponse>, String> {
        Ok(Json(PaletteResponse {
            tier: classify_report_status(&params.status),
        }))
    }

    #[tool(description = "Classify a moderated comment's status and AI risk score into display tiers.")]
    async fn classify_moderation(
        &self,
        Parameters(params): Parameters<ClassifyModerationParams>,
    ) -> Result<Json<ModerationClassificationResponse>, String> {
        Ok(Json(ModerationClassificationResponse {
            status_tier: classify_moderation_status(&params.status),
            ai_score_tier: classify_moderation_score(params.ai_score),
        }))
    }

    #[tool(description = "Report the planning store connection state, connecting first if needed, and PING it.")]
    async fn store_status(&self) -> Result<Json<StoreStatusResponse>, String> {
        info!("store_status tool invoked");

        let error = match self.store.state() {
            ConnectionState::Connected => self.store.health_check().await.err(),
            ConnectionState::Closed => Some(StoreError::Lifecycle),
            ConnectionState::Unconnected | ConnectionState::Connecting => {
                self.store.connect().await.err()
            }
        };
        let state = self.store.state();

        Ok(Json(StoreStatusResponse {
            state,
            uri: self.store.redacted_uri().to_string(),
            healthy: error.is_none() && state == ConnectionState::Connected,
            error: error.map(|e| e.to_string()),
        }))
    }
}

#[tool_handler]
impl ServerHandler for PlanningServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "transportvoice-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "TransportVoice planning MCP server. Use classify_project and summarize_projects \
                 for project badges and dashboard roll-ups, classify_report_status and \
                 classify_moderation for report and comment badges, and store_status to check \
                 the planning store connection."
                    .to_string(),
            ),
        }
    }
}
