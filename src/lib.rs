//! # goinfer-client
//!
//! Goinfer 文本生成服务的类型化异步客户端。
//!
//! Typed async client for the Goinfer text-generation server's HTTP/SSE API.
//!
//! ## Overview
//!
//! [`InferenceClient`] wraps the server's endpoints and tracks one logical
//! session: whether an inference is running or streaming, and which model is
//! loaded. The server does all the real work; this crate owns the request
//! lifecycle, streaming decode, cancellation, and a uniform error type.
//!
//! - **Buffered or streamed inference**: [`InferenceClient::infer`] returns the
//!   final [`InferResult`]; in stream mode tokens go to the configured handlers.
//!   [`InferenceClient::infer_stream`] exposes the same lifecycle as a `Stream`.
//! - **Explicit session state**: [`SessionState`] is a pair of phases
//!   ([`RunPhase`], [`ModelPhase`]) instead of loose flags, observable via
//!   [`InferenceClient::subscribe`].
//! - **Per-call cancellation**: inferences are serialised per client and each one
//!   owns its [`CancelHandle`]; [`InferenceClient::abort`] targets the active call.
//! - **Tasks**: load, list and execute server-side tasks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use goinfer_client::{InferParams, InferenceClient, ModelConfig};
//!
//! #[tokio::main]
//! async fn main() -> goinfer_client::Result<()> {
//!     let client = InferenceClient::builder()
//!         .server_url("http://localhost:5143")
//!         .api_key("your-api-key")
//!         .on_token(|t| print!("{}", t))
//!         .build()?;
//!
//!     client
//!         .load_model(&ModelConfig::new("mistral-7b-instruct-v0.1.Q4_K_M.gguf", 2048))
//!         .await?;
//!
//!     let result = client
//!         .infer(
//!             "What is the capital of Italy?",
//!             Some("<s>[INST] {prompt} [/INST]"),
//!             Some(InferParams::new().stream(true)),
//!         )
//!         .await?;
//!     println!("\n{} tokens/s", result.tokens_per_second);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client, builder, session state and cancellation |
//! | [`pipeline`] | SSE decoding into typed messages |
//! | [`transport`] | Authenticated HTTP transport |
//! | [`types`] | Wire types (models, params, results, tasks, messages) |

pub mod client;
pub mod pipeline;
pub mod transport;
pub mod types;

pub use client::{
    CancelHandle, EventHandlers, InferenceClient, InferenceClientBuilder, ModelPhase, RunPhase,
    SessionState,
};
pub use types::{
    InferParams, InferResult, ModelConfig, ModelState, ModelTemplate, StreamedMessage, Task,
    TempInferStats,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A specialized Result for pipeline operations
pub type PipeResult<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `PipeResult<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = PipeResult<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
