//! Per-call cancellation and the guard that returns the session to idle.

use super::session::Session;
use crate::types::StreamedMessage;
use crate::{BoxStream, Error};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Cancels one inference call. Cloning shares the same signal.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Holds the in-flight permit for one call and resets the session when dropped.
pub(crate) struct CallGuard {
    session: Arc<Session>,
    call: Uuid,
    _permit: OwnedSemaphorePermit,
}

impl CallGuard {
    pub fn new(session: Arc<Session>, call: Uuid, permit: OwnedSemaphorePermit) -> Self {
        Self {
            session,
            call,
            _permit: permit,
        }
    }

    pub fn call(&self) -> Uuid {
        self.call
    }

    pub fn mark_streaming(&self) {
        self.session.mark_streaming(self.call);
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.session.finish_call(self.call);
    }
}

struct Controlled {
    inner: BoxStream<'static, StreamedMessage>,
    cancel: CancelHandle,
    guard: Option<CallGuard>,
}

/// Wrap a message stream so that it:
/// - moves the session to `Streaming` on `start_emitting`
/// - yields a single `Err(Error::Cancelled)` once the handle fires, then ends
/// - releases the call (permit + session reset) on end, cancel or drop
pub(crate) fn controlled_stream(
    inner: BoxStream<'static, StreamedMessage>,
    cancel: CancelHandle,
    guard: CallGuard,
) -> BoxStream<'static, StreamedMessage> {
    let state = Controlled {
        inner,
        cancel,
        guard: Some(guard),
    };

    let stream = futures::stream::unfold(state, |mut st| async move {
        let call = st.guard.as_ref()?.call();

        let next = tokio::select! {
            biased;
            _ = st.cancel.cancelled() => None,
            item = st.inner.next() => Some(item),
        };

        match next {
            None => {
                tracing::debug!(call_id = %call, "inference stream cancelled");
                st.guard = None;
                Some((Err(Error::Cancelled), st))
            }
            Some(None) => {
                st.guard = None;
                None
            }
            Some(Some(item)) => {
                if let (Ok(StreamedMessage::StartEmitting { .. }), Some(guard)) =
                    (&item, st.guard.as_ref())
                {
                    guard.mark_streaming();
                }
                Some((item, st))
            }
        }
    });

    Box::pin(stream)
}
