//! Model configuration and server-side model state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Context size used by the "no model" sentinel.
pub const DEFAULT_CONTEXT_SIZE: u32 = 2048;

/// Identifies a loadable model and its context window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(rename = "ctx")]
    pub context_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rope_freq_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rope_freq_base: Option<f64>,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, context_size: u32) -> Self {
        Self {
            name: name.into(),
            context_size,
            rope_freq_scale: None,
            rope_freq_base: None,
        }
    }

    pub fn with_rope_freq_scale(mut self, scale: f64) -> Self {
        self.rope_freq_scale = Some(scale);
        self
    }

    pub fn with_rope_freq_base(mut self, base: f64) -> Self {
        self.rope_freq_base = Some(base);
        self
    }

    /// The `{name: "", ctx: 2048}` value reported when no model is loaded.
    pub fn empty() -> Self {
        Self::new("", DEFAULT_CONTEXT_SIZE)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::empty()
    }
}

/// Template information the server keeps for each model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTemplate {
    pub name: String,
    #[serde(rename = "ctx")]
    pub context_size: u32,
}

/// Snapshot returned by `GET /model/state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    #[serde(default)]
    pub models: HashMap<String, ModelTemplate>,
    #[serde(rename = "isModelLoaded")]
    pub is_model_loaded: bool,
    #[serde(rename = "loadedModel", default)]
    pub loaded_model: String,
    #[serde(rename = "ctx", default)]
    pub context_size: u32,
}

impl ModelState {
    /// The loaded model as a config, if the server reports one.
    pub fn loaded_config(&self) -> Option<ModelConfig> {
        if self.is_model_loaded {
            Some(ModelConfig::new(self.loaded_model.clone(), self.context_size))
        } else {
            None
        }
    }
}
