//! Questers MCP Server
//!
//! Explains week-over-week quester movement to AI agents via MCP.
//!
//! ## Tools
//!
//! - `weekly_decomposition` - full text report: headline, summary table,
//!   bucket tree, drivers, watch list
//! - `decomposition_json` - the same run as structured JSON
//! - `reclassification_candidates` - entities that collapsed hard enough to
//!   look discontinued, for confirm-then-rerun flows
//!
//! ## Usage
//!
//! Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "questers": {
//!       "command": "questers-mcp"
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use rmcp::transport::stdio;
use rmcp::ServiceExt;

mod tools;

use tools::QuestersService;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging to stderr only; stdout is for the MCP protocol.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    log::info!("Starting Questers MCP server");

    let service = QuestersService::from_env()?;
    let server = service.serve(stdio()).await?;

    server.waiting().await?;

    log::info!("Questers MCP server stopped");
    Ok(())
}
