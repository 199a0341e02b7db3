use tempfile::TempDir;

use rust_mcp_sdk::schema::{
    CallToolRequestParams, ClientCapabilities, Implementation, InitializeRequestParams,
    LATEST_PROTOCOL_VERSION,
};
use rust_mcp_sdk::{
    mcp_client::{client_runtime, ClientHandler, McpClientOptions},
    McpClient, StdioTransport, ToMcpClientHandler, TransportOptions,
};

use async_trait::async_trait;

struct NoopClientHandler;

#[async_trait]
impl ClientHandler for NoopClientHandler {}

fn client_details() -> InitializeRequestParams {
    InitializeRequestParams {
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "taskdeck-mcp-test".into(),
            version: "0.1.0".into(),
            title: Some("Taskdeck MCP Test".into()),
            description: Some("Integration test client".into()),
            icons: vec![],
            website_url: None,
        },
        protocol_version: LATEST_PROTOCOL_VERSION.into(),
        meta: None,
    }
}

async fn call(
    client: &std::sync::Arc<impl McpClient>,
    name: &str,
    arguments: serde_json::Value,
) -> serde_json::Value {
    let result = client
        .request_tool_call(CallToolRequestParams {
            name: name.to_string(),
            arguments: Some(arguments.as_object().expect("object args").clone()),
            meta: None,
            task: None,
        })
        .await
        .unwrap_or_else(|err| panic!("tool call {name}: {err}"));
    let text = result
        .content
        .first()
        .expect("content")
        .as_text_content()
        .expect("text content")
        .text
        .clone();
    serde_json::from_str(&text).expect("json payload")
}

#[tokio::test]
async fn mcp_task_lifecycle_over_stdio() {
    let temp = TempDir::new().expect("tempdir");
    let dir = temp.path().display().to_string();

    let server_bin = env!("CARGO_BIN_EXE_taskdeck-mcp");
    let transport = StdioTransport::create_with_server_launch(
        server_bin,
        vec!["--dir".to_string(), dir],
        None,
        TransportOptions::default(),
    )
    .expect("transport");

    let client = client_runtime::create_client(McpClientOptions {
        client_details: client_details(),
        transport,
        handler: NoopClientHandler.to_mcp_client_handler(),
        task_store: None,
        server_task_store: None,
    });

    client.clone().start().await.expect("start client");

    let version = call(&client, "version", serde_json::json!({})).await;
    assert_eq!(version["name"], "taskdeck");

    let added = call(
        &client,
        "add_tasks",
        serde_json::json!({"session_id": "s1", "titles": ["a", "b"]}),
    )
    .await;
    let tasks = added["added"].as_array().expect("added");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["id"], 1);
    assert_eq!(tasks[1]["id"], 2);

    let updated = call(
        &client,
        "update_task",
        serde_json::json!({"session_id": "s1", "id": 1, "status": "done"}),
    )
    .await;
    assert_eq!(updated["updated"]["status"], "done");

    let missing = call(
        &client,
        "update_task",
        serde_json::json!({"session_id": "s1", "id": 42, "status": "done"}),
    )
    .await;
    assert_eq!(missing["error"], "Task not found");

    let cleared = call(
        &client,
        "clear_tasks",
        serde_json::json!({"session_id": "s1"}),
    )
    .await;
    assert_eq!(cleared["deleted"], 1);

    // The file on disk is the session map the viewer reads.
    let raw = std::fs::read_to_string(temp.path().join("tasks.json")).expect("tasks.json");
    let on_disk: serde_json::Value = serde_json::from_str(&raw).expect("map");
    assert_eq!(on_disk["s1"].as_array().expect("session").len(), 1);
    assert_eq!(on_disk["s1"][0]["title"], "b");
}
