//! Maps decoded JSON frames to [`StreamedMessage`] values.

use crate::pipeline::Mapper;
use crate::types::StreamedMessage;
use crate::{BoxStream, PipeResult};
use futures::StreamExt;

/// Dispatches on the frame's `msg_type`. Unknown tags become
/// [`StreamedMessage::Unknown`]; frames that are not messages at all surface
/// as `Error::Decode` items.
pub struct MessageMapper;

#[async_trait::async_trait]
impl Mapper for MessageMapper {
    async fn map(
        &self,
        input: BoxStream<'static, serde_json::Value>,
    ) -> PipeResult<BoxStream<'static, StreamedMessage>> {
        let stream = input.map(|frame| frame.and_then(StreamedMessage::try_from));
        Ok(Box::pin(stream))
    }
}
