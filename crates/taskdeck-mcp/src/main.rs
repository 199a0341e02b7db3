mod tools;
mod version;

use std::path::PathBuf;

use clap::Parser;
use rust_mcp_sdk::error::SdkResult;
use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, ProtocolVersion, ServerCapabilities, ServerCapabilitiesTools,
};
use rust_mcp_sdk::{
    mcp_server::{server_runtime, McpServerOptions},
    McpServer, StdioTransport, ToMcpServerHandler, TransportOptions,
};
use tracing_subscriber::EnvFilter;

use crate::tools::{McpContext, TaskdeckServerHandler};

#[derive(Parser)]
#[command(name = "taskdeck-mcp", version = version::FULL)]
struct Args {
    /// Directory holding tasks.json; overrides TASKS_DIR for every call.
    #[arg(long)]
    dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> SdkResult<()> {
    // Stdout carries the MCP protocol; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let server_details = InitializeResult {
        server_info: Implementation {
            name: "taskdeck".into(),
            version: version::FULL.into(),
            title: Some("Taskdeck MCP Server".into()),
            description: Some("MCP server for session-scoped task lists".into()),
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools { list_changed: None }),
            ..Default::default()
        },
        meta: None,
        instructions: Some("Taskdeck MCP server".into()),
        protocol_version: ProtocolVersion::V2025_11_25.into(),
    };

    let transport = StdioTransport::new(TransportOptions::default())?;
    let handler = TaskdeckServerHandler {
        context: McpContext {
            default_dir: args.dir,
        },
    };

    let server = server_runtime::create_server(McpServerOptions {
        server_details,
        transport,
        handler: handler.to_mcp_server_handler(),
        task_store: None,
        client_task_store: None,
    });

    tracing::info!("taskdeck MCP server started");
    server.start().await
}
