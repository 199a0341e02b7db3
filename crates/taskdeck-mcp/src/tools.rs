use std::path::PathBuf;

use async_trait::async_trait;
use rust_mcp_sdk::macros::{mcp_tool, JsonSchema};
use rust_mcp_sdk::schema::{
    schema_utils::CallToolError, CallToolRequestParams, CallToolResult, ListToolsResult,
    PaginatedRequestParams, RpcError, TextContent,
};
use rust_mcp_sdk::tool_box;
use rust_mcp_sdk::{mcp_server::ServerHandler, McpServer};
use serde::{Deserialize, Serialize};

use crate::version;

use taskdeck_core::store::{resolve_tasks_dir, StoreError, TaskStore};
use taskdeck_core::task::TaskStatus;

#[derive(Clone)]
pub struct McpContext {
    pub default_dir: Option<PathBuf>,
}

fn resolve_store(context: &McpContext, dir: Option<&str>) -> TaskStore {
    let dir_value = dir.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    });
    let dir = dir_value
        .or_else(|| context.default_dir.clone())
        .unwrap_or_else(resolve_tasks_dir);
    TaskStore::new(dir)
}

fn ok_text(content: String) -> Result<CallToolResult, CallToolError> {
    Ok(CallToolResult::text_content(vec![TextContent::from(
        content,
    )]))
}

fn ok_json(value: serde_json::Value) -> Result<CallToolResult, CallToolError> {
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string());
    ok_text(text)
}

fn store_error(err: StoreError) -> CallToolError {
    // Lock timeouts are retryable; say so in the message the agent sees.
    if err.is_retryable() {
        return CallToolError::from_message(format!("{err} (retry the call)"));
    }
    CallToolError::from_message(err.to_string())
}

#[mcp_tool(name = "version", description = "Return Taskdeck version information.")]
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct VersionTool {}

#[mcp_tool(
    name = "add_tasks",
    description = "Add one or more tasks to a session. Each task starts as pending."
)]
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct AddTasksTool {
    /// Session the tasks belong to.
    pub session_id: String,
    /// Task titles, in display order. Must not be empty.
    pub titles: Vec<String>,
    /// Directory holding tasks.json; defaults to the server's --dir or TASKS_DIR.
    pub dir: Option<String>,
}

#[mcp_tool(
    name = "update_task",
    description = "Update a task's status within a session."
)]
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateTaskTool {
    pub session_id: String,
    /// Task id within the session (>= 1).
    pub id: u64,
    /// One of: pending, in_progress, check, done, error.
    pub status: String,
    pub dir: Option<String>,
}

#[mcp_tool(
    name = "clear_tasks",
    description = "Clear tasks from a session. By default only done tasks are removed; clear_all removes everything."
)]
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ClearTasksTool {
    pub session_id: String,
    #[serde(default)]
    pub clear_all: bool,
    pub dir: Option<String>,
}

// Generates enum TaskdeckTools with variants for each tool
tool_box!(
    TaskdeckTools,
    [VersionTool, AddTasksTool, UpdateTaskTool, ClearTasksTool]
);

pub struct TaskdeckServerHandler {
    pub context: McpContext,
}

#[async_trait]
impl ServerHandler for TaskdeckServerHandler {
    async fn handle_list_tools_request(
        &self,
        _params: Option<PaginatedRequestParams>,
        _runtime: std::sync::Arc<dyn McpServer>,
    ) -> Result<ListToolsResult, RpcError> {
        Ok(ListToolsResult {
            meta: None,
            next_cursor: None,
            tools: TaskdeckTools::tools(),
        })
    }

    async fn handle_call_tool_request(
        &self,
        params: CallToolRequestParams,
        _runtime: std::sync::Arc<dyn McpServer>,
    ) -> Result<CallToolResult, CallToolError> {
        let tool = TaskdeckTools::try_from(params).map_err(CallToolError::new)?;
        match tool {
            TaskdeckTools::VersionTool(tool) => tool.call(&self.context),
            TaskdeckTools::AddTasksTool(tool) => tool.call(&self.context),
            TaskdeckTools::UpdateTaskTool(tool) => tool.call(&self.context),
            TaskdeckTools::ClearTasksTool(tool) => tool.call(&self.context),
        }
    }
}

impl VersionTool {
    fn call(&self, _context: &McpContext) -> Result<CallToolResult, CallToolError> {
        ok_json(serde_json::json!({
            "name": "taskdeck",
            "version": env!("CARGO_PKG_VERSION"),
            "full": version::FULL,
        }))
    }
}

impl AddTasksTool {
    fn call(&self, context: &McpContext) -> Result<CallToolResult, CallToolError> {
        if self.titles.is_empty() {
            return Err(CallToolError::from_message(
                "titles must contain at least one entry".to_string(),
            ));
        }
        if let Some(empty) = self.titles.iter().find(|title| title.trim().is_empty()) {
            return Err(CallToolError::from_message(format!(
                "title must not be blank: {empty:?}"
            )));
        }

        let store = resolve_store(context, self.dir.as_deref());
        let added = store
            .add_tasks(&self.session_id, &self.titles)
            .map_err(store_error)?;
        ok_json(serde_json::json!({ "added": added }))
    }
}

impl UpdateTaskTool {
    fn call(&self, context: &McpContext) -> Result<CallToolResult, CallToolError> {
        if self.id == 0 {
            return Err(CallToolError::from_message("id must be >= 1".to_string()));
        }
        let status: TaskStatus = self
            .status
            .parse()
            .map_err(|err| CallToolError::from_message(format!("{err}")))?;

        let store = resolve_store(context, self.dir.as_deref());
        match store
            .update_task(&self.session_id, self.id, status)
            .map_err(store_error)?
        {
            Some(updated) => ok_json(serde_json::json!({ "updated": updated })),
            None => ok_json(serde_json::json!({ "error": "Task not found" })),
        }
    }
}

impl ClearTasksTool {
    fn call(&self, context: &McpContext) -> Result<CallToolResult, CallToolError> {
        let store = resolve_store(context, self.dir.as_deref());
        let deleted = store
            .clear_tasks(&self.session_id, self.clear_all)
            .map_err(store_error)?;
        ok_json(serde_json::json!({ "deleted": deleted }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context(temp: &TempDir) -> McpContext {
        McpContext {
            default_dir: Some(temp.path().to_path_buf()),
        }
    }

    fn payload(result: CallToolResult) -> serde_json::Value {
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

    #[test]
    fn add_tasks_returns_created_entries() {
        let temp = TempDir::new().expect("tempdir");
        let tool = AddTasksTool {
            session_id: "s1".to_string(),
            titles: vec!["a".to_string(), "b".to_string()],
            dir: None,
        };
        let value = payload(tool.call(&context(&temp)).expect("call"));
        let added = value["added"].as_array().expect("added array");
        assert_eq!(added.len(), 2);
        assert_eq!(added[0]["id"], 1);
        assert_eq!(added[1]["id"], 2);
        assert_eq!(added[0]["status"], "pending");
    }

    #[test]
    fn add_tasks_rejects_empty_titles() {
        let temp = TempDir::new().expect("tempdir");
        let tool = AddTasksTool {
            session_id: "s1".to_string(),
            titles: Vec::new(),
            dir: None,
        };
        assert!(tool.call(&context(&temp)).is_err());
        assert!(!temp.path().join("tasks.json").exists());
    }

    #[test]
    fn update_task_reports_not_found_as_payload() {
        let temp = TempDir::new().expect("tempdir");
        let tool = UpdateTaskTool {
            session_id: "s1".to_string(),
            id: 7,
            status: "done".to_string(),
            dir: None,
        };
        let value = payload(tool.call(&context(&temp)).expect("call"));
        assert_eq!(value["error"], "Task not found");
    }

    #[test]
    fn update_task_rejects_unknown_status() {
        let temp = TempDir::new().expect("tempdir");
        let tool = UpdateTaskTool {
            session_id: "s1".to_string(),
            id: 1,
            status: "paused".to_string(),
            dir: None,
        };
        assert!(tool.call(&context(&temp)).is_err());
    }

    #[test]
    fn clear_tasks_counts_removed_done_tasks() {
        let temp = TempDir::new().expect("tempdir");
        let ctx = context(&temp);
        AddTasksTool {
            session_id: "s1".to_string(),
            titles: vec!["a".to_string(), "b".to_string()],
            dir: None,
        }
        .call(&ctx)
        .expect("add");
        UpdateTaskTool {
            session_id: "s1".to_string(),
            id: 1,
            status: "done".to_string(),
            dir: None,
        }
        .call(&ctx)
        .expect("update");

        let value = payload(
            ClearTasksTool {
                session_id: "s1".to_string(),
                clear_all: false,
                dir: None,
            }
            .call(&ctx)
            .expect("clear"),
        );
        assert_eq!(value["deleted"], 1);
    }
}
