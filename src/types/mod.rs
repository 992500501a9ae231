//! 类型模块：Goinfer 服务端 API 的线上数据类型。
//!
//! # Types Module
//!
//! Wire types for the Goinfer HTTP/SSE API. Field names follow the server
//! exactly (a mix of snake_case and camelCase), so every type carries explicit
//! serde attributes rather than relying on Rust naming.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ModelConfig`] | Which model to load and its context window |
//! | [`ModelState`] | Server-reported snapshot of available/loaded models |
//! | [`InferParams`] | Per-call sampling and decoding parameters |
//! | [`InferResult`] | Terminal outcome of one inference |
//! | [`StreamedMessage`] | One decoded server-sent event |
//! | [`Task`] | Server-stored prompt/config bundle |
//!
//! ## Example
//!
//! ```rust
//! use goinfer_client::types::{InferParams, ModelConfig};
//!
//! let params = InferParams::new()
//!     .stream(true)
//!     .model(ModelConfig::new("mistral-7b-instruct-v0.1.Q4_K_M.gguf", 4096))
//!     .temperature(0.2)
//!     .stop(vec!["</s>".to_string()]);
//! assert_eq!(params.stream, Some(true));
//! ```

pub mod events;
pub mod inference;
pub mod model;
pub mod task;

pub use events::{MsgType, StreamedMessage, WireMessage};
pub use inference::{InferParams, InferResult, TempInferStats};
pub use model::{ModelConfig, ModelState, ModelTemplate};
pub use task::{Task, TaskTree};
