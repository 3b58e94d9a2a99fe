//! Draft generation behavior against stubbed transports.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use draftmail::config::AppConfig;
use draftmail::draft::{DraftGenerator, EmailRequest, Length, Tone};
use draftmail::error::GenerationError;
use draftmail::gemini::GeminiClient;
use draftmail::mocks::{FixedGenerator, MockHttpTransport};
use draftmail::transport::TransportError;

fn request() -> EmailRequest {
    EmailRequest {
        sender_name: "Alice".into(),
        sender_email: "alice@x.com".into(),
        recipient_name: "Bob".into(),
        recipient_email: "bob@x.com".into(),
        topic: "project update".into(),
        tone: Tone::Professional,
        length: Length::Short,
    }
}

fn gemini_json(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
    format!(
        r#"{{"candidates":[{{"content":{{"parts":[{{"text":"{escaped}"}}],"role":"model"}},"finishReason":"STOP"}}]}}"#
    )
}

fn client_over(transport: Arc<MockHttpTransport>) -> GeminiClient {
    let config = Arc::new(AppConfig::builder().build().unwrap());
    GeminiClient::new(config, transport)
}

#[tokio::test]
async fn draft_equals_stubbed_output_exactly() {
    let generator = Arc::new(FixedGenerator::with_outputs([
        "Project Update",
        "Hi Bob,\n\nHere's the update.\n\nAlice",
    ]));
    let drafter = DraftGenerator::new(generator.clone());

    let draft = drafter.generate(&request()).await.unwrap();

    assert_eq!(draft.subject, "Project Update");
    assert_eq!(draft.body, "Hi Bob,\n\nHere's the update.\n\nAlice");

    // Subject prompt goes out first, body prompt second.
    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("email subject"));
    assert!(prompts[0].contains("project update"));
    assert!(prompts[1].contains("email body"));
    assert!(prompts[1].contains("Alice"));
    assert!(prompts[1].contains("Bob"));
}

#[tokio::test]
async fn generated_text_is_trimmed() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.enqueue_json(200, &gemini_json("  Project Update \n"));
    transport.enqueue_json(200, &gemini_json("\n Hi Bob! \n\n"));

    let drafter = DraftGenerator::new(Arc::new(client_over(transport)));
    let draft = drafter.generate(&request()).await.unwrap();

    assert_eq!(draft.subject, "Project Update");
    assert_eq!(draft.body, "Hi Bob!");
}

#[tokio::test]
async fn requests_carry_api_key_and_model_endpoint() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.enqueue_json(200, &gemini_json("subject"));
    transport.enqueue_json(200, &gemini_json("body"));

    let config = Arc::new(
        AppConfig::builder()
            .api_key(secrecy::SecretString::new("test-key".into()))
            .build()
            .unwrap(),
    );
    let drafter = DraftGenerator::new(Arc::new(GeminiClient::new(config, transport.clone())));
    drafter.generate(&request()).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    for req in &requests {
        assert!(req.url.contains("/v1beta/models/gemini-2.5-flash:generateContent"));
        assert_eq!(req.headers.get("x-goog-api-key").map(String::as_str), Some("test-key"));
    }
}

#[tokio::test]
async fn body_failure_discards_the_whole_draft() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.enqueue_json(200, &gemini_json("a fine subject"));
    transport.enqueue_error(TransportError::Timeout);

    let drafter = DraftGenerator::new(Arc::new(client_over(transport.clone())));
    let result = drafter.generate(&request()).await;

    assert!(matches!(result, Err(GenerationError::Transport(_))));
    // Both calls were attempted; nothing partial escapes.
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn subject_failure_stops_before_the_body_call() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.enqueue_json(403, r#"{"error":{"message":"API key not valid"}}"#);

    let drafter = DraftGenerator::new(Arc::new(client_over(transport.clone())));
    let result = drafter.generate(&request()).await;

    match result {
        Err(GenerationError::Api { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn blocked_response_surfaces_as_generation_error() {
    let transport = Arc::new(MockHttpTransport::new());
    transport.enqueue_json(200, r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);

    let drafter = DraftGenerator::new(Arc::new(client_over(transport)));
    let result = drafter.generate(&request()).await;

    assert!(matches!(result, Err(GenerationError::Blocked { .. })));
}

#[tokio::test]
async fn generation_works_over_real_http() {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(gemini_json("Hello from the wire"), "application/json"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = Arc::new(
        AppConfig::builder()
            .api_key(secrecy::SecretString::new("test-key".into()))
            .base_url(&server.uri())
            .unwrap()
            .build()
            .unwrap(),
    );
    let transport = Arc::new(
        draftmail::transport::ReqwestTransport::new(
            std::time::Duration::from_secs(5),
            std::time::Duration::from_secs(5),
        )
        .unwrap(),
    );

    let drafter = DraftGenerator::new(Arc::new(GeminiClient::new(config, transport)));
    let draft = drafter.generate(&request()).await.unwrap();

    assert_eq!(draft.subject, "Hello from the wire");
    assert_eq!(draft.body, "Hello from the wire");
}
