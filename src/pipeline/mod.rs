//! 流水线模块：把 SSE 字节流解码为类型化的流式消息。
//!
//! # Streaming Pipeline
//!
//! Turns the raw body of a streamed `POST /completion` into typed
//! [`StreamedMessage`] values.
//!
//! ```text
//! Raw Bytes → Decoder → Mapper → StreamedMessage
//!     │           │         │
//!   HTTP      SSE framing  msg_type dispatch
//! ```
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Pipeline`] | Decoder + mapper pair |
//! | [`Decoder`] | Bytes → JSON frames ([`decode::SseDecoder`]) |
//! | [`Mapper`] | JSON frames → messages ([`event_map::MessageMapper`]) |

pub mod decode;
pub mod event_map;


use crate::types::StreamedMessage;
use crate::{BoxStream, PipeResult};

/// Decoder trait for stream decoding
#[async_trait::async_trait]
pub trait Decoder: Send + Sync {
    /// Decode a byte stream into JSON values
    async fn decode_stream(
        &self,
        input: BoxStream<'static, bytes::Bytes>,
    ) -> PipeResult<BoxStream<'static, serde_json::Value>>;
}

/// Final stage: JSON frames to typed messages
#[async_trait::async_trait]
pub trait Mapper: Send + Sync {
    async fn map(
        &self,
        input: BoxStream<'static, serde_json::Value>,
    ) -> PipeResult<BoxStream<'static, StreamedMessage>>;
}

/// Pipeline that processes streaming responses
pub struct Pipeline {
    decoder: Box<dyn Decoder>,
    mapper: Box<dyn Mapper>,
}

impl Pipeline {
    pub fn new(decoder: Box<dyn Decoder>, mapper: Box<dyn Mapper>) -> Self {
        Self { decoder, mapper }
    }

    /// The pipeline matching the Goinfer server: `data: {json}\n\n` frames
    /// carrying `{num, msg_type, content, data}` objects.
    pub fn goinfer() -> Self {
        Self::new(
            Box::new(decode::SseDecoder::default()),
            Box::new(event_map::MessageMapper),
        )
    }

    /// Process a byte stream through the pipeline
    pub async fn process_stream(
        &self,
        input: BoxStream<'static, bytes::Bytes>,
    ) -> PipeResult<BoxStream<'static, StreamedMessage>> {
        let frames = self.decoder.decode_stream(input).await?;
        self.mapper.map(frames).await
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::goinfer()
    }
}
