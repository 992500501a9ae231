//! Streamed messages sent by `POST /completion` in stream mode.

use super::inference::{InferResult, TempInferStats};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};

/// Message kind tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MsgType {
    Token,
    System,
    Error,
    /// Any tag this client does not know.
    #[serde(other)]
    Unknown,
}

/// Raw frame as sent by the server: `{num, msg_type, content, data}`.
///
/// The same shape is used for error bodies of buffered `POST /completion` calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub num: u64,
    pub msg_type: MsgType,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A decoded server-sent message.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamedMessage {
    /// A generated text fragment.
    Token { num: u64, text: String },
    /// The model finished thinking and starts emitting tokens.
    StartEmitting { num: u64, stats: TempInferStats },
    /// Final result of the inference. Does not by itself end the stream.
    Result { num: u64, result: InferResult },
    /// A system message with an unrecognised sub-kind.
    System {
        num: u64,
        content: String,
        data: Option<serde_json::Value>,
    },
    /// Server-side error during generation.
    Error { num: u64, message: String },
    /// A frame with an unrecognised `msg_type`. Safe to ignore.
    Unknown {
        num: u64,
        content: String,
        data: Option<serde_json::Value>,
    },
}

impl StreamedMessage {
    pub fn num(&self) -> u64 {
        match self {
            StreamedMessage::Token { num, .. }
            | StreamedMessage::StartEmitting { num, .. }
            | StreamedMessage::Result { num, .. }
            | StreamedMessage::System { num, .. }
            | StreamedMessage::Error { num, .. }
            | StreamedMessage::Unknown { num, .. } => *num,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            StreamedMessage::Token { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StreamedMessage::Error { .. })
    }
}

impl TryFrom<WireMessage> for StreamedMessage {
    type Error = Error;

    fn try_from(msg: WireMessage) -> Result<Self> {
        let num = msg.num;
        Ok(match msg.msg_type {
            MsgType::Token => StreamedMessage::Token {
                num,
                text: msg.content,
            },
            MsgType::Error => StreamedMessage::Error {
                num,
                message: msg.content,
            },
            MsgType::Unknown => StreamedMessage::Unknown {
                num,
                content: msg.content,
                data: msg.data,
            },
            MsgType::System => match msg.content.as_str() {
                "start_emitting" => StreamedMessage::StartEmitting {
                    num,
                    stats: decode_data(msg.data, "start_emitting")?,
                },
                "result" => StreamedMessage::Result {
                    num,
                    result: decode_data(msg.data, "result")?,
                },
                _ => StreamedMessage::System {
                    num,
                    content: msg.content,
                    data: msg.data,
                },
            },
        })
    }
}

fn decode_data<T>(data: Option<serde_json::Value>, kind: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    match data {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v).map_err(|e| {
            Error::decode_with_context(
                format!("invalid {} payload: {}", kind, e),
                ErrorContext::new()
                    .with_field_path("data")
                    .with_source("streamed_message"),
            )
        }),
    }
}

impl TryFrom<serde_json::Value> for StreamedMessage {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        let wire: WireMessage = serde_json::from_value(value).map_err(|e| {
            Error::decode_with_context(
                format!("invalid streamed message: {}", e),
                ErrorContext::new()
                    .with_field_path("msg_type")
                    .with_source("streamed_message"),
            )
        })?;
        StreamedMessage::try_from(wire)
    }
}
