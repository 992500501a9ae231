//! Model management against a mock server

use super::mock_server::MockServerFixture;
use goinfer_client::{Error, ModelConfig, ModelPhase};
use mockito::Matcher;
use serde_json::json;

#[tokio::test]
async fn test_load_model_sets_loaded_phase() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/model/load")
        .match_body(Matcher::Json(json!({"name": "llama-7b", "ctx": 4096})))
        .with_status(200)
        .create_async()
        .await;

    let client = fixture.client();
    let conf = ModelConfig::new("llama-7b", 4096);
    client.load_model(&conf).await.unwrap();

    assert!(client.is_model_loaded());
    assert!(!client.is_loading_model());
    assert_eq!(client.current_model(), conf);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_load_when_already_loaded() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json("POST", "/model/load", 202, r#"{"error":"a model is already loaded"}"#)
        .await;

    let client = fixture.client();
    let err = client
        .load_model(&ModelConfig::new("llama-7b", 2048))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AlreadyLoaded(ref m) if m == "a model is already loaded"));
    assert!(!client.is_loading_model());
    assert!(matches!(client.state().model, ModelPhase::Unloaded));
}

#[tokio::test]
async fn test_unknown_model_error_names_model() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json(
            "POST",
            "/model/load",
            500,
            r#"{"error":"error loading model: can not find model wrong-model"}"#,
        )
        .await;

    let client = fixture.client();
    let err = client
        .load_model(&ModelConfig::new("wrong-model", 2048))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("wrong-model"));
    assert!(!client.is_model_loaded());
    assert!(!client.is_loading_model());
}

#[tokio::test]
async fn test_failed_load_restores_previous_model() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .server
        .mock("POST", "/model/load")
        .match_body(Matcher::PartialJson(json!({"name": "first"})))
        .with_status(200)
        .create_async()
        .await;
    fixture
        .server
        .mock("POST", "/model/load")
        .match_body(Matcher::PartialJson(json!({"name": "second"})))
        .with_status(500)
        .with_body("out of memory")
        .create_async()
        .await;

    let client = fixture.client();
    let first = ModelConfig::new("first", 2048);
    client.load_model(&first).await.unwrap();
    assert!(client
        .load_model(&ModelConfig::new("second", 2048))
        .await
        .is_err());

    assert!(matches!(client.state().model, ModelPhase::Loaded(ref c) if *c == first));
}

#[tokio::test]
async fn test_unload_is_idempotent() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/model/unload")
        .with_status(200)
        .expect(2)
        .create_async()
        .await;

    let client = fixture.client();
    client.unload_model().await.unwrap();
    client.unload_model().await.unwrap();

    assert!(!client.is_model_loaded());
    assert!(client.current_model().is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unload_failure_is_reported() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json("GET", "/model/unload", 500, r#"{"error":"busy"}"#)
        .await;

    let client = fixture.client();
    let err = client.unload_model().await.unwrap_err();
    assert_eq!(err.to_string(), "Remote error: HTTP 500: error unloading model: busy");
}

#[tokio::test]
async fn test_models_state_syncs_session() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json(
            "GET",
            "/model/state",
            200,
            r#"{"models":{"llama-7b":{"name":"llama-7b","ctx":4096},"mistral":{"name":"mistral","ctx":8192}},
                "isModelLoaded":true,"loadedModel":"llama-7b","ctx":4096}"#,
        )
        .await;

    let client = fixture.client();
    let mut updates = client.subscribe();
    let state = client.models_state().await.unwrap();

    assert_eq!(state.models.len(), 2);
    assert_eq!(state.models["mistral"].context_size, 8192);
    assert!(client.is_model_loaded());
    assert_eq!(client.current_model(), ModelConfig::new("llama-7b", 4096));
    assert!(updates.has_changed().unwrap());
}

#[tokio::test]
async fn test_models_state_reports_nothing_loaded() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json(
            "GET",
            "/model/state",
            200,
            r#"{"models":{},"isModelLoaded":false,"loadedModel":"","ctx":0}"#,
        )
        .await;

    let client = fixture.client();
    let state = client.models_state().await.unwrap();

    assert!(!state.is_model_loaded);
    assert!(state.loaded_config().is_none());
    assert!(!client.is_model_loaded());
}
