//! Server-stored tasks.

use super::inference::InferParams;
use super::model::ModelConfig;
use serde::{Deserialize, Serialize};

/// A named, reusable prompt/config bundle stored on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(default)]
    pub template: String,
    #[serde(rename = "modelConf")]
    pub model_conf: ModelConfig,
    #[serde(rename = "inferParams", default)]
    pub infer_params: InferParams,
}

/// Nested task listing from `GET /task/tree`. Node shape is server-defined.
pub type TaskTree = Vec<serde_json::Value>;
