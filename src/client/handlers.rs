//! Callbacks invoked while [`InferenceClient::infer`](super::InferenceClient::infer)
//! drives a streamed inference.

use crate::types::TempInferStats;
use std::fmt;
use std::sync::Arc;

pub type TokenHandler = Arc<dyn Fn(&str) + Send + Sync>;
pub type StartEmitHandler = Arc<dyn Fn(&TempInferStats) + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Streaming callbacks.
///
/// Without an `on_error` handler a streamed error message fails the call with
/// [`Error::Inference`](crate::Error::Inference).
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub on_token: Option<TokenHandler>,
    pub on_start_emit: Option<StartEmitHandler>,
    pub on_error: Option<ErrorHandler>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_token(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_token = Some(Arc::new(f));
        self
    }

    pub fn on_start_emit(mut self, f: impl Fn(&TempInferStats) + Send + Sync + 'static) -> Self {
        self.on_start_emit = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_token", &self.on_token.is_some())
            .field("on_start_emit", &self.on_start_emit.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
