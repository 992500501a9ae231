//! Completion calls against a mock server

use super::mock_server::{error_frame, result, start_emitting, token, MockServerFixture, Recorder};
use futures::StreamExt;
use goinfer_client::{Error, EventHandlers, InferParams, ModelConfig, StreamedMessage};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_buffered_inference_returns_result() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_json(
            "POST",
            "/completion",
            200,
            r#"{"text":"Rome","thinkingTime":0.1,"thinkingTimeFormat":"100ms","inferenceTime":0.3,
                "emitTime":0.2,"emitTimeFormat":"200ms","totalTime":0.3,"totalTimeFormat":"300ms",
                "tokensPerSecond":10.0,"totalTokens":2}"#,
        )
        .await;

    let client = fixture.client();
    let result = client
        .infer("capital of Italy?", Some("{prompt}"), None)
        .await
        .unwrap();

    assert_eq!(result.text, "Rome");
    assert_eq!(result.total_tokens, 2);
    assert!(!client.is_running());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_buffered_error_carries_status_text_and_content() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json(
            "POST",
            "/completion",
            500,
            r#"{"num":0,"msg_type":"error","content":"no model loaded"}"#,
        )
        .await;

    let client = fixture.client();
    let err = client.infer("hi", None, None).await.unwrap_err();

    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal Server Error no model loaded");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!client.is_running());
}

#[tokio::test]
async fn test_model_override_adopted_after_success() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json("POST", "/completion", 200, r#"{"text":"ok","totalTokens":1}"#)
        .await;

    let client = fixture.client();
    let params = InferParams::new().model(ModelConfig::new("mistral-7b", 4096));
    client.infer("hi", None, Some(params)).await.unwrap();

    assert!(client.is_model_loaded());
    assert_eq!(client.current_model().name, "mistral-7b");
}

#[tokio::test]
async fn test_failed_inference_keeps_model_untouched() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json("POST", "/completion", 500, "model file missing")
        .await;

    let client = fixture.client();
    let params = InferParams::new().model(ModelConfig::new("mistral-7b", 4096));
    assert!(client.infer("hi", None, Some(params)).await.is_err());

    assert!(!client.is_model_loaded());
    assert!(client.current_model().is_empty());
}

#[tokio::test]
async fn test_streamed_inference_dispatches_handlers() {
    let mut fixture = MockServerFixture::new().await;
    let frames = [
        start_emitting(0),
        token(1, "Ro"),
        token(2, "me"),
        result(3, "Rome"),
    ];
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    let mock = fixture.mock_completion_stream(&frames).await;

    let seen = Recorder::default();
    let (on_token, on_start) = (seen.clone(), seen.clone());
    let client = fixture.client_with(
        EventHandlers::new()
            .on_token(move |t| on_token.push(format!("token:{t}")))
            .on_start_emit(move |s| on_start.push(format!("start:{}", s.thinking_time_format))),
    );

    let result = client
        .infer("capital of Italy?", None, Some(InferParams::new().stream(true)))
        .await
        .unwrap();

    assert_eq!(result.text, "Rome");
    assert_eq!(result.total_tokens, 3);
    assert_eq!(
        seen.entries(),
        vec!["start:420ms", "token:Ro", "token:me"]
    );
    assert!(!client.is_running());
    assert!(!client.is_streaming());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_streamed_error_without_handler_fails() {
    let mut fixture = MockServerFixture::new().await;
    let frames = [token(0, "partial"), error_frame(1, "out of memory")];
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    fixture.mock_completion_stream(&frames).await;

    let client = fixture.client();
    let err = client
        .infer("hi", None, Some(InferParams::new().stream(true)))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Inference(ref m) if m == "out of memory"));
    assert!(!client.is_running());
}

#[tokio::test]
async fn test_streamed_error_with_handler_continues() {
    let mut fixture = MockServerFixture::new().await;
    let frames = [error_frame(0, "slow down"), token(1, "ok"), result(2, "ok")];
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    fixture.mock_completion_stream(&frames).await;

    let errors = Recorder::default();
    let sink = errors.clone();
    let client = fixture.client();
    client.set_on_error(Some(std::sync::Arc::new(move |m: &str| sink.push(m))));

    let result = client
        .infer("hi", None, Some(InferParams::new().stream(true)))
        .await
        .unwrap();

    assert_eq!(result.text, "ok");
    assert_eq!(errors.entries(), vec!["slow down"]);
}

#[tokio::test]
async fn test_stream_without_result_is_incomplete() {
    let mut fixture = MockServerFixture::new().await;
    let frames = [token(0, "a"), token(1, "b")];
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    fixture.mock_completion_stream(&frames).await;

    let client = fixture.client();
    let err = client
        .infer("hi", None, Some(InferParams::new().stream(true)))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::IncompleteStream));
    assert!(!client.is_running());
}

#[tokio::test]
async fn test_infer_stream_yields_typed_messages() {
    let mut fixture = MockServerFixture::new().await;
    let frames = [start_emitting(0), token(1, "hi"), result(2, "hi")];
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    fixture.mock_completion_stream(&frames).await;

    let client = fixture.client();
    let (stream, _cancel) = client.infer_stream("hi", None, None).await.unwrap();
    assert!(client.is_running());

    let items: Vec<_> = stream.collect().await;
    assert_eq!(items.len(), 3);
    assert!(matches!(items[0], Ok(StreamedMessage::StartEmitting { .. })));
    assert_eq!(items[1].as_ref().unwrap().as_token(), Some("hi"));
    assert!(matches!(items[2], Ok(StreamedMessage::Result { .. })));
    assert!(!client.is_running());
}

#[tokio::test]
async fn test_abort_while_streaming_cancels_stream() {
    let mut fixture = MockServerFixture::new().await;
    let frames = [start_emitting(0), token(1, "a"), token(2, "b"), result(3, "ab")];
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    fixture.mock_completion_stream(&frames).await;
    let abort = fixture
        .server
        .mock("GET", "/completion/abort")
        .expect(0)
        .create_async()
        .await;

    let client = fixture.client();
    let (mut stream, cancel) = client.infer_stream("hi", None, None).await.unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert!(matches!(first, StreamedMessage::StartEmitting { .. }));
    assert!(client.is_streaming());

    client.abort().await.unwrap();
    assert!(cancel.is_cancelled());

    assert!(matches!(stream.next().await, Some(Err(Error::Cancelled))));
    assert!(stream.next().await.is_none());
    assert!(!client.is_running());
    abort.assert_async().await;
}

#[tokio::test]
async fn test_dropping_stream_releases_session() {
    let mut fixture = MockServerFixture::new().await;
    let frames = [token(0, "a"), result(1, "a")];
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    fixture.mock_completion_stream(&frames).await;
    fixture
        .mock_json("POST", "/completion", 200, r#"{"text":"again"}"#)
        .await;

    let client = fixture.client();
    let (stream, _cancel) = client.infer_stream("hi", None, None).await.unwrap();
    drop(stream);
    assert!(!client.is_running());

    // The in-flight slot is free again.
    let result = client.infer("hi", None, None).await.unwrap();
    assert_eq!(result.text, "again");
}

#[tokio::test]
async fn test_abort_when_idle_sends_nothing() {
    let mut fixture = MockServerFixture::new().await;
    let abort = fixture
        .server
        .mock("GET", "/completion/abort")
        .expect(0)
        .create_async()
        .await;

    let client = fixture.client();
    client.abort().await.unwrap();
    abort.assert_async().await;
}

#[tokio::test]
async fn test_requests_without_valid_key_are_rejected() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .server
        .mock("POST", "/completion")
        .match_header("authorization", "Bearer wrong")
        .with_status(401)
        .with_body("unauthorized")
        .create_async()
        .await;

    let client = goinfer_client::InferenceClient::new(&fixture.base_url, "wrong").unwrap();
    let err = client.infer("hi", None, None).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Unauthorized unauthorized"));
}

#[tokio::test]
async fn test_streamed_request_rejected_before_streaming() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json(
            "POST",
            "/completion",
            500,
            r#"{"num":0,"msg_type":"error","content":"no model loaded"}"#,
        )
        .await;

    let client = fixture.client();
    let err = client
        .infer("hi", None, Some(InferParams::new().stream(true)))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("no model loaded"));
    assert!(!client.is_running());
    assert!(!client.is_streaming());
}

#[tokio::test]
async fn test_unknown_message_type_is_skipped() {
    let mut fixture = MockServerFixture::new().await;
    let heartbeat = r#"{"num":1,"msg_type":"heartbeat","content":""}"#.to_string();
    let frames = [token(0, "Ro"), heartbeat, token(2, "me"), result(3, "Rome")];
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    fixture.mock_completion_stream(&frames).await;

    let seen = Recorder::default();
    let sink = seen.clone();
    let client = fixture.client_with(EventHandlers::new().on_token(move |t| sink.push(t)));

    let result = client
        .infer("hi", None, Some(InferParams::new().stream(true)))
        .await
        .unwrap();

    assert_eq!(result.text, "Rome");
    assert_eq!(seen.entries(), vec!["Ro", "me"]);
}

#[tokio::test]
async fn test_handlers_swapped_mid_stream_take_effect() {
    let mut fixture = MockServerFixture::new().await;
    let frames = [token(0, "a"), token(1, "b"), token(2, "c"), result(3, "abc")];
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    fixture.mock_completion_stream(&frames).await;

    let client = Arc::new(fixture.client());
    let seen = Recorder::default();
    let (first, second) = (seen.clone(), seen.clone());
    let weak = Arc::downgrade(&client);
    client.set_on_token(Some(Arc::new(move |t: &str| {
        first.push(format!("first:{t}"));
        if let Some(client) = weak.upgrade() {
            let second = second.clone();
            client.set_on_token(Some(Arc::new(move |t: &str| {
                second.push(format!("second:{t}"))
            })));
        }
    })));

    client
        .infer("hi", None, Some(InferParams::new().stream(true)))
        .await
        .unwrap();

    assert_eq!(seen.entries(), vec!["first:a", "second:b", "second:c"]);
}

#[tokio::test]
async fn test_concurrent_inferences_run_one_after_another() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_slow_completion(Duration::from_millis(200), r#"{"text":"done"}"#)
        .await;

    let client = fixture.client();
    let started = Instant::now();
    let (a, b) = tokio::join!(
        client.infer("first", None, None),
        client.infer("second", None, None)
    );

    assert_eq!(a.unwrap().text, "done");
    assert_eq!(b.unwrap().text, "done");
    assert!(started.elapsed() >= Duration::from_millis(400));
    assert!(!client.is_running());
}

#[tokio::test]
async fn test_waiting_call_keeps_its_own_cancel_handle() {
    let mut fixture = MockServerFixture::new().await;
    let frames = [start_emitting(0), token(1, "a"), result(2, "a")];
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    fixture.mock_completion_stream(&frames).await;
    fixture
        .mock_json("POST", "/completion", 200, r#"{"text":"second"}"#)
        .await;

    let client = Arc::new(fixture.client());
    let (first, first_cancel) = client.infer_stream("first", None, None).await.unwrap();

    let waiting = client.clone();
    let second = tokio::spawn(async move { waiting.infer("second", None, None).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!second.is_finished());

    // Cancelling the first call ends it and only it.
    first_cancel.cancel();
    let items: Vec<_> = first.collect().await;
    assert!(matches!(items.last(), Some(Err(Error::Cancelled))));

    let result = second.await.unwrap().unwrap();
    assert_eq!(result.text, "second");
    assert!(!client.is_running());
}

#[tokio::test]
async fn test_abort_buffered_inference_in_flight() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_slow_completion(Duration::from_secs(1), r#"{"text":"too late"}"#)
        .await;
    let abort = fixture
        .server
        .mock("GET", "/completion/abort")
        .with_status(200)
        .create_async()
        .await;

    let client = Arc::new(fixture.client());
    let mut updates = client.subscribe();
    let running = client.clone();
    let call = tokio::spawn(async move { running.infer("hi", None, None).await });

    updates.wait_for(|s| s.is_running()).await.unwrap();
    client.abort().await.unwrap();

    let err = call.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert!(!client.is_running());
    abort.assert_async().await;
}
