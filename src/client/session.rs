//! Session state machine.
//!
//! ```text
//! RunPhase:   Idle ──begin──▶ Running ──start_emitting──▶ Streaming
//!               ▲                │                           │
//!               └────finish──────┴───────────finish──────────┘
//!
//! ModelPhase: Unloaded ──load──▶ Loading(conf) ──ok──▶ Loaded(conf)
//!                                      │
//!                                      └──failure──▶ (previous phase)
//! ```
//!
//! Every transition goes through [`Session`], which owns the `watch` sender.
//! Run transitions are keyed by call id, so a call that already finished can
//! never reset the phase of a newer call.

use super::cancel::CancelHandle;
use crate::types::{ModelConfig, ModelState};
use tokio::sync::watch;
use uuid::Uuid;

/// Lifecycle of the current inference call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Running { call: Uuid },
    Streaming { call: Uuid },
}

impl RunPhase {
    pub fn call(&self) -> Option<Uuid> {
        match self {
            RunPhase::Idle => None,
            RunPhase::Running { call } | RunPhase::Streaming { call } => Some(*call),
        }
    }
}

/// Client-side view of the server's model.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModelPhase {
    #[default]
    Unloaded,
    Loading(ModelConfig),
    Loaded(ModelConfig),
}

/// Snapshot of the client session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub run: RunPhase,
    pub model: ModelPhase,
    pub(crate) cancel: Option<CancelHandle>,
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        !matches!(self.run, RunPhase::Idle)
    }

    /// Implies [`is_running`](Self::is_running).
    pub fn is_streaming(&self) -> bool {
        matches!(self.run, RunPhase::Streaming { .. })
    }

    pub fn is_model_loaded(&self) -> bool {
        matches!(self.model, ModelPhase::Loaded(_))
    }

    pub fn is_loading_model(&self) -> bool {
        matches!(self.model, ModelPhase::Loading(_))
    }

    /// The loaded model, or the `{name: "", ctx: 2048}` sentinel.
    pub fn current_model(&self) -> ModelConfig {
        match &self.model {
            ModelPhase::Loaded(conf) => conf.clone(),
            _ => ModelConfig::empty(),
        }
    }
}

/// Single writer for [`SessionState`].
pub(crate) struct Session {
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self { state }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn begin_call(&self, call: Uuid, cancel: CancelHandle) {
        self.state.send_modify(|s| {
            s.run = RunPhase::Running { call };
            s.cancel = Some(cancel);
        });
    }

    pub fn mark_streaming(&self, call: Uuid) {
        self.state.send_if_modified(|s| match s.run {
            RunPhase::Running { call: active } if active == call => {
                s.run = RunPhase::Streaming { call };
                true
            }
            _ => false,
        });
    }

    pub fn finish_call(&self, call: Uuid) {
        self.state.send_if_modified(|s| {
            if s.run.call() == Some(call) {
                s.run = RunPhase::Idle;
                s.cancel = None;
                true
            } else {
                false
            }
        });
    }

    /// Enter `Loading(conf)` and return the phase it replaced.
    pub fn begin_load(&self, conf: ModelConfig) -> ModelPhase {
        let mut previous = ModelPhase::Unloaded;
        self.state.send_modify(|s| {
            previous = std::mem::replace(&mut s.model, ModelPhase::Loading(conf));
        });
        previous
    }

    /// Settle a load started with `begin_load(conf)`, unless another
    /// transition happened in between.
    pub fn settle_load(&self, conf: &ModelConfig, outcome: ModelPhase) {
        self.state.send_if_modified(|s| match &s.model {
            ModelPhase::Loading(pending) if pending == conf => {
                s.model = outcome;
                true
            }
            _ => false,
        });
    }

    pub fn set_model(&self, phase: ModelPhase) {
        self.state.send_modify(|s| s.model = phase);
    }

    /// Adopt the server's view of the model unless a load is in flight.
    pub fn sync_model(&self, server: &ModelState) {
        self.state.send_if_modified(|s| {
            if s.is_loading_model() {
                return false;
            }
            let next = match server.loaded_config() {
                Some(conf) => ModelPhase::Loaded(conf),
                None => ModelPhase::Unloaded,
            };
            if s.model == next {
                return false;
            }
            s.model = next;
            true
        });
    }
}
