use gemini_chat::config::{ApiKey, Config};
use gemini_chat::transcript::{Message, Role};
use gemini_chat::{ChatSession, GeminiClient, ModelBackend, SessionError};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/v1beta/models/gemini-1.0-pro-001";
const GENERATE_PATH: &str = "/v1beta/models/gemini-1.0-pro-001:generateContent";

fn config_for(server: &MockServer) -> Config {
    Config {
        base_url: format!("{}/v1beta", server.uri()),
        ..Config::default()
    }
}

fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::new(&config_for(server), Some(ApiKey::new("test-key"))).unwrap()
}

fn session_for(server: &MockServer, history: &[Message]) -> ChatSession {
    let config = config_for(server);
    ChatSession::new(&config.model, history, config.session_params())
}

fn model_resource() -> Value {
    json!({
        "name": "models/gemini-1.0-pro-001",
        "displayName": "Gemini 1.0 Pro 001",
        "inputTokenLimit": 30720,
        "outputTokenLimit": 2048
    })
}

fn reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn create_session_checks_the_model_with_the_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MODEL_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_resource()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let history = vec![Message::user("Hello"), Message::bot("Hi there!")];
    let session = client
        .create_session(&history, &config_for(&server).session_params())
        .await
        .unwrap();

    assert_eq!(session.model(), "gemini-1.0-pro-001");
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[1].role, Role::Bot);
}

#[tokio::test]
async fn rejected_credentials_fail_initialization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .create_session(&[], &config_for(&server).session_params())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SessionError::initialization("HTTP 400 Bad Request: API key not valid.")
    );
}

#[tokio::test]
async fn missing_api_key_fails_without_a_request() {
    let server = MockServer::start().await;
    let client = GeminiClient::new(&config_for(&server), None).unwrap();

    let err = client
        .create_session(&[], &config_for(&server).session_params())
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Initialization(_)));
    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn send_replays_history_with_generation_and_safety_settings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("I'm doing well.")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut session = session_for(&server, &[Message::user("Hello"), Message::bot("Hi there!")]);
    let text = client.send(&mut session, "How are you?").await.unwrap();
    assert_eq!(text, "I'm doing well.");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();

    let roles: Vec<&str> = body["contents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|content| content["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, ["user", "model", "user"]);
    assert_eq!(body["contents"][2]["parts"][0]["text"], "How are you?");

    let generation = &body["generationConfig"];
    assert_eq!(generation["temperature"], 0.9);
    assert_eq!(generation["topK"], 1);
    assert_eq!(generation["topP"], 1.0);
    assert_eq!(generation["maxOutputTokens"], 2048);

    let safety = body["safetySettings"].as_array().unwrap();
    assert_eq!(safety.len(), 4);
    for setting in safety {
        assert_eq!(setting["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }
}

#[tokio::test]
async fn successful_send_extends_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("Hi there!")))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut session = session_for(&server, &[]);
    client.send(&mut session, "Hello").await.unwrap();

    let turns: Vec<(Role, &str)> = session
        .history()
        .iter()
        .map(|turn| (turn.role, turn.text.as_str()))
        .collect();
    assert_eq!(turns, [(Role::User, "Hello"), (Role::Bot, "Hi there!")]);
}

#[tokio::test]
async fn blocked_prompt_fails_the_send() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut session = session_for(&server, &[]);
    let err = client.send(&mut session, "something rude").await.unwrap_err();

    assert!(matches!(err, SessionError::Send(_)));
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn server_error_fails_the_send() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut session = session_for(&server, &[]);
    let err = client.send(&mut session, "Hello").await.unwrap_err();

    assert_eq!(
        err,
        SessionError::send("HTTP 500 Internal Server Error: backend exploded")
    );
}
