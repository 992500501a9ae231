use super::core::{describe, InferenceClient};
use crate::types::{Task, TaskTree};
use crate::{Error, Result};
use serde_json::json;
use tracing::{debug, info};

impl InferenceClient {
    /// Nested listing of the tasks stored on the server.
    pub async fn load_tasks(&self) -> Result<TaskTree> {
        let reply = self.transport.get("/task/tree").await?;
        if !reply.is_success() {
            return Err(Error::remote(
                reply.status,
                describe("error loading tasks", &reply),
            ));
        }
        reply.json()
    }

    /// Read one task by path (e.g. `"code/json/fix"`).
    ///
    /// A 400 answer means the task does not exist ([`Error::TaskNotFound`]); any
    /// other failure is reported as [`Error::TaskLoad`].
    pub async fn load_task(&self, path: &str) -> Result<Task> {
        let reply = self
            .transport
            .post_json("/task/read", &json!({ "path": path }))
            .await?;
        match reply.status {
            400 => Err(Error::TaskNotFound(path.to_string())),
            _ if !reply.is_success() => Err(Error::TaskLoad {
                status: reply.status,
                message: reply.text_field("error"),
            }),
            _ => reply.json(),
        }
    }

    /// Execute a server-side task and return the server's output unchanged.
    pub async fn execute_task(&self, name: &str, prompt: &str) -> Result<serde_json::Value> {
        info!(task = name, "executing task");
        let reply = self
            .transport
            .post_json("/task/execute", &json!({ "task": name, "prompt": prompt }))
            .await?;
        if !reply.is_success() {
            return Err(Error::remote(
                reply.status,
                describe("error executing task", &reply),
            ));
        }
        if reply.body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        let output: serde_json::Value = reply.json()?;
        debug!(task = name, "task executed");
        Ok(output)
    }
}
