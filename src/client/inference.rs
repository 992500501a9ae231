use super::cancel::{controlled_stream, CancelHandle};
use super::core::InferenceClient;
use super::session::{ModelPhase, RunPhase};
use crate::transport::Reply;
use crate::types::inference::CompletionRequest;
use crate::types::{InferParams, InferResult, StreamedMessage, WireMessage};
use crate::{BoxStream, Error, Result};
use futures::StreamExt;
use std::time::Instant;
use tracing::{debug, info, warn};

impl InferenceClient {
    /// Run one inference.
    ///
    /// In buffered mode (default) the server's result is returned directly. With
    /// `params.stream == Some(true)` tokens are delivered to the `on_token` handler
    /// as they arrive and the final `result` message is returned.
    ///
    /// The session is back to `Idle` when this returns, whatever the outcome.
    pub async fn infer(
        &self,
        prompt: &str,
        template: Option<&str>,
        params: Option<InferParams>,
    ) -> Result<InferResult> {
        let params = params.unwrap_or_default();
        if params.is_stream() {
            self.infer_streamed(prompt, template, params).await
        } else {
            self.infer_buffered(prompt, template, params).await
        }
    }

    /// Start a streamed inference and hand the message stream to the caller.
    ///
    /// `params.stream` is forced on. The stream keeps the call active until it
    /// ends, is cancelled through the returned handle (or [`abort`](Self::abort)),
    /// or is dropped. Streamed `error` messages are yielded as items; handlers
    /// configured on the client are not invoked.
    pub async fn infer_stream(
        &self,
        prompt: &str,
        template: Option<&str>,
        params: Option<InferParams>,
    ) -> Result<(BoxStream<'static, StreamedMessage>, CancelHandle)> {
        let params = params.unwrap_or_default().stream(true);
        self.open_stream(prompt, template, &params).await
    }

    /// Abort the active inference.
    ///
    /// - streaming: the call's handle is cancelled and the SSE body is closed
    /// - running (not yet streaming): `GET /completion/abort` is sent; on success
    ///   the call is cancelled and the session reset
    /// - idle: nothing to do
    pub async fn abort(&self) -> Result<()> {
        let state = self.state();
        match state.run {
            RunPhase::Idle => Ok(()),
            RunPhase::Streaming { call } => {
                info!(call_id = %call, "aborting streamed inference");
                if let Some(cancel) = state.cancel {
                    cancel.cancel();
                }
                Ok(())
            }
            RunPhase::Running { call } => {
                info!(call_id = %call, "aborting inference on server");
                let reply = self.transport.get("/completion/abort").await?;
                if !reply.is_success() {
                    warn!(http_status = reply.status, call_id = %call, "abort request failed");
                    return Err(Error::remote(
                        reply.status,
                        super::core::describe("error aborting inference", &reply),
                    ));
                }
                if let Some(cancel) = state.cancel {
                    cancel.cancel();
                }
                self.session.finish_call(call);
                Ok(())
            }
        }
    }

    async fn infer_buffered(
        &self,
        prompt: &str,
        template: Option<&str>,
        params: InferParams,
    ) -> Result<InferResult> {
        let (guard, cancel) = self.begin_call().await?;
        let call = guard.call();
        let start = Instant::now();
        let body = CompletionRequest {
            prompt,
            template,
            params: &params,
        };

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(call_id = %call, "inference cancelled");
                return Err(Error::Cancelled);
            }
            reply = self.transport.post_json("/completion", &body) => reply?,
        };

        if !reply.is_success() {
            let err = completion_error(&reply);
            warn!(http_status = reply.status, call_id = %call, error = %err, "inference failed");
            return Err(err);
        }

        let result: InferResult = reply.json()?;
        info!(
            call_id = %call,
            tokens = result.total_tokens,
            duration_ms = start.elapsed().as_millis(),
            "inference completed"
        );
        drop(guard);
        self.adopt_model(&params);
        Ok(result)
    }

    async fn infer_streamed(
        &self,
        prompt: &str,
        template: Option<&str>,
        params: InferParams,
    ) -> Result<InferResult> {
        let (mut stream, _cancel) = self.open_stream(prompt, template, &params).await?;
        let start = Instant::now();
        let mut result: Option<InferResult> = None;

        while let Some(item) = stream.next().await {
            let message = item?;
            // Handlers may be swapped mid-stream.
            let handlers = self.handlers.load_full();
            match message {
                StreamedMessage::Token { text, .. } => {
                    if let Some(on_token) = &handlers.on_token {
                        on_token(&text);
                    }
                }
                StreamedMessage::StartEmitting { stats, .. } => {
                    if let Some(on_start_emit) = &handlers.on_start_emit {
                        on_start_emit(&stats);
                    }
                }
                StreamedMessage::Result { result: r, .. } => {
                    result = Some(r);
                }
                StreamedMessage::System { content, .. } => {
                    debug!(content = content.as_str(), "ignoring system message");
                }
                StreamedMessage::Unknown { num, .. } => {
                    debug!(num, "ignoring message with unknown type");
                }
                StreamedMessage::Error { message, .. } => match &handlers.on_error {
                    Some(on_error) => on_error(&message),
                    None => {
                        warn!(error = message.as_str(), "streamed inference error");
                        return Err(Error::Inference(message));
                    }
                },
            }
        }
        drop(stream);

        let result = result.ok_or_else(|| {
            warn!("inference stream closed without a result message");
            Error::IncompleteStream
        })?;
        info!(
            tokens = result.total_tokens,
            tokens_per_second = result.tokens_per_second,
            duration_ms = start.elapsed().as_millis(),
            "streamed inference completed"
        );
        self.adopt_model(&params);
        Ok(result)
    }

    async fn open_stream(
        &self,
        prompt: &str,
        template: Option<&str>,
        params: &InferParams,
    ) -> Result<(BoxStream<'static, StreamedMessage>, CancelHandle)> {
        let (guard, cancel) = self.begin_call().await?;
        let call = guard.call();
        let body = CompletionRequest {
            prompt,
            template,
            params,
        };

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(call_id = %call, "inference cancelled");
                return Err(Error::Cancelled);
            }
            opened = self.transport.post_stream("/completion", &body) => opened?,
        };

        let bytes = match opened {
            Ok(bytes) => bytes,
            Err(reply) => {
                let err = completion_error(&reply);
                warn!(http_status = reply.status, call_id = %call, error = %err, "inference failed");
                return Err(err);
            }
        };

        debug!(call_id = %call, "inference stream opened");
        let messages = self.pipeline.process_stream(bytes).await?;
        Ok((controlled_stream(messages, cancel.clone(), guard), cancel))
    }

    /// A model passed in the params is only adopted once the server has used it.
    fn adopt_model(&self, params: &InferParams) {
        if let Some(model) = &params.model {
            self.session.set_model(ModelPhase::Loaded(model.clone()));
        }
    }
}

/// Error bodies of `POST /completion` are StreamedMessage-shaped; the error
/// carries `"<status text> <content>"`.
fn completion_error(reply: &Reply) -> Error {
    let content = match serde_json::from_str::<WireMessage>(&reply.body) {
        Ok(msg) => msg.content,
        Err(_) => reply.text_field("error"),
    };
    Error::remote(
        reply.status,
        format!("{} {}", reply.status_text(), content).trim().to_string(),
    )
}
