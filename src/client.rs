//! Stateful client for the Goinfer server.
//!
//! Keep the public surface small and predictable. Implementation details are
//! split into submodules under `src/client/`.

pub mod builder;
mod cancel;
pub mod core;
pub mod handlers;
mod inference;
mod models;
pub mod session;
mod tasks;

pub use builder::InferenceClientBuilder;
pub use cancel::CancelHandle;
pub use core::InferenceClient;
pub use handlers::EventHandlers;
pub use session::{ModelPhase, RunPhase, SessionState};
