use super::cancel::{CallGuard, CancelHandle};
use super::handlers::{ErrorHandler, EventHandlers, StartEmitHandler, TokenHandler};
use super::session::{Session, SessionState};
use crate::pipeline::Pipeline;
use crate::transport::{HttpTransport, Reply};
use crate::types::ModelConfig;
use crate::{Error, ErrorContext, Result};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use uuid::Uuid;

/// Stateful client for one Goinfer server.
///
/// The client is `Send + Sync` and can be shared behind an `Arc`. Inferences are
/// serialised: a second `infer` waits until the first one has finished, so every
/// call keeps its own [`CancelHandle`]. Model and task requests are not serialised.
pub struct InferenceClient {
    pub(crate) transport: Arc<HttpTransport>,
    pub(crate) pipeline: Arc<Pipeline>,
    pub(crate) session: Arc<Session>,
    pub(crate) handlers: ArcSwap<EventHandlers>,
    pub(crate) inflight: Arc<Semaphore>,
}

impl InferenceClient {
    pub fn builder() -> super::builder::InferenceClientBuilder {
        super::builder::InferenceClientBuilder::new()
    }

    /// Create a client with default timeouts and no handlers.
    pub fn new(server_url: &str, api_key: &str) -> Result<Self> {
        Self::builder()
            .server_url(server_url)
            .api_key(api_key)
            .build()
    }

    pub(crate) fn from_parts(transport: HttpTransport, handlers: EventHandlers) -> Self {
        Self {
            transport: Arc::new(transport),
            pipeline: Arc::new(Pipeline::goinfer()),
            session: Arc::new(Session::new()),
            handlers: ArcSwap::from_pointee(handlers),
            inflight: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn server_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Snapshot of the session state.
    pub fn state(&self) -> SessionState {
        self.session.snapshot()
    }

    /// Watch session transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn is_streaming(&self) -> bool {
        self.state().is_streaming()
    }

    pub fn is_model_loaded(&self) -> bool {
        self.state().is_model_loaded()
    }

    pub fn is_loading_model(&self) -> bool {
        self.state().is_loading_model()
    }

    /// The loaded model, or the empty sentinel.
    pub fn current_model(&self) -> ModelConfig {
        self.state().current_model()
    }

    pub fn handlers(&self) -> EventHandlers {
        self.handlers.load().as_ref().clone()
    }

    /// Replace all handlers. A running streamed `infer` picks them up from its
    /// next message.
    pub fn set_handlers(&self, handlers: EventHandlers) {
        self.handlers.store(Arc::new(handlers));
    }

    pub fn set_on_token(&self, f: Option<TokenHandler>) {
        self.handlers.rcu(|h| EventHandlers {
            on_token: f.clone(),
            ..h.as_ref().clone()
        });
    }

    pub fn set_on_start_emit(&self, f: Option<StartEmitHandler>) {
        self.handlers.rcu(|h| EventHandlers {
            on_start_emit: f.clone(),
            ..h.as_ref().clone()
        });
    }

    pub fn set_on_error(&self, f: Option<ErrorHandler>) {
        self.handlers.rcu(|h| EventHandlers {
            on_error: f.clone(),
            ..h.as_ref().clone()
        });
    }

    /// Wait for the in-flight permit and move the session to `Running`.
    pub(crate) async fn begin_call(&self) -> Result<(CallGuard, CancelHandle)> {
        let permit = self.inflight.clone().acquire_owned().await.map_err(|_| {
            Error::runtime_with_context(
                "in-flight semaphore closed",
                ErrorContext::new().with_source("inference_client"),
            )
        })?;
        let call = Uuid::new_v4();
        let cancel = CancelHandle::new();
        self.session.begin_call(call, cancel.clone());
        Ok((CallGuard::new(self.session.clone(), call, permit), cancel))
    }
}

/// `"<generic>: <server detail>"`, or just the generic text when the body is empty.
pub(crate) fn describe(generic: &str, reply: &Reply) -> String {
    let detail = reply.text_field("error");
    if detail.is_empty() {
        generic.to_string()
    } else {
        format!("{}: {}", generic, detail)
    }
}
