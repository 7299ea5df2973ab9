//! MCP tools for the weekly questers decomposition.
//!
//! Requests carry materialized snapshot rows (typically produced by the
//! warehouse collaborator); the tools run the pure engine over them and
//! return either the rendered report or the structured result.

use anyhow::Result;
use questers_decomposition::{Annotations, DecompositionEngine, DecompositionResult};
use questers_protocol::{EntitySnapshot, OverallSnapshot, ReportConfig};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Path of a TOML report config; defaults apply when unset.
const CONFIG_ENV: &str = "QUESTERS_CONFIG";

/// Questers MCP service
#[derive(Clone)]
pub struct QuestersService {
    /// Defaults for requests that carry no config override
    config: ReportConfig,
    /// Tool router
    tool_router: ToolRouter<Self>,
}

impl QuestersService {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            tool_router: Self::tool_router(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let config = match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                log::info!("loading report config from {path}");
                ReportConfig::from_toml_path(&path)?
            }
            Err(_) => ReportConfig::default(),
        };
        Ok(Self::new(config))
    }

    fn engine(&self, config_override: Option<ReportConfig>) -> Result<DecompositionEngine> {
        let config = config_override.unwrap_or_else(|| self.config.clone());
        Ok(DecompositionEngine::new(config)?)
    }
}

#[tool_handler]
impl ServerHandler for QuestersService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Questers decomposition explains why weekly distinct questers moved. \
                 Use 'weekly_decomposition' for the report. If it lists reclassification \
                 candidates, confirm with the user which are truly discontinued, then \
                 rerun with those ids in 'overrides'. Use 'decomposition_json' for the \
                 structured result and 'reclassification_candidates' to preview \
                 candidates without a full run."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Tool Input/Output Schemas
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DecompositionRequest {
    /// Per-game snapshot rows for the two-week comparison window
    pub entities: Vec<EntitySnapshot>,

    /// Independently computed whole-ecosystem counts (not a sum of rows)
    pub overall: OverallSnapshot,

    /// Entity ids confirmed as discontinued despite residual activity
    #[serde(default)]
    pub overrides: Vec<String>,

    /// Report options; server defaults apply when omitted
    pub config: Option<ReportConfig>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CandidatesRequest {
    /// Per-game snapshot rows for the two-week comparison window
    pub entities: Vec<EntitySnapshot>,

    /// Curr/prev collapse ratio; defaults to the server config's value
    pub ratio: Option<f64>,
}

#[derive(Debug, Serialize)]
struct DecompositionJson {
    result: DecompositionResult,
    annotations: Annotations,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl QuestersService {
    /// Full weekly report
    #[tool(
        description = "Explain the week-over-week quester change: headline, human/bot summary, New/Discontinued/Continuing decomposition with per-game lines, driver bullets, and a watch list."
    )]
    pub async fn weekly_decomposition(
        &self,
        Parameters(request): Parameters<DecompositionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let engine = match self.engine(request.config) {
            Ok(engine) => engine,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(format!("Error: {e}"))])),
        };
        let overrides: BTreeSet<String> = request.overrides.into_iter().collect();

        match engine.report(&request.entities, &request.overall, &overrides) {
            Ok(report) => Ok(CallToolResult::success(vec![Content::text(report)])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!("Error: {e}"))])),
        }
    }

    /// Structured decomposition result
    #[tool(
        description = "Run the same decomposition as weekly_decomposition but return the structured result (buckets, per-entity contributions, reconciliation, signal tags) as JSON."
    )]
    pub async fn decomposition_json(
        &self,
        Parameters(request): Parameters<DecompositionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let engine = match self.engine(request.config) {
            Ok(engine) => engine,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(format!("Error: {e}"))])),
        };
        let overrides: BTreeSet<String> = request.overrides.into_iter().collect();

        let result = match engine.run(&request.entities, &request.overall, &overrides) {
            Ok(result) => result,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(format!("Error: {e}"))])),
        };
        let annotations = engine.annotate(&result);
        let payload = DecompositionJson {
            result,
            annotations,
        };

        Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(&payload).unwrap_or_default(),
        )]))
    }

    /// Preview discontinuation candidates
    #[tool(
        description = "List games that dropped below the collapse ratio (default 5% of the previous week) but still show residual activity. Confirm these with the user before passing them as overrides."
    )]
    pub async fn reclassification_candidates(
        &self,
        Parameters(request): Parameters<CandidatesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ratio = request.ratio.unwrap_or(self.config.reclassify_ratio);
        if !(0.0..=1.0).contains(&ratio) {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "Error: ratio must be within [0, 1], got {ratio}"
            ))]));
        }
        for entity in &request.entities {
            if let Err(e) = entity.validate() {
                return Ok(CallToolResult::error(vec![Content::text(format!("Error: {e}"))]));
            }
        }

        let classification =
            questers_decomposition::classify(&request.entities, &BTreeSet::new(), ratio);

        Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(&classification.candidates).unwrap_or_default(),
        )]))
    }
}
