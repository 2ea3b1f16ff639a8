//! Provider dispatch tests
//!
//! Adapters built by `create_provider` and driven through `Box<dyn Provider>`
//! against a mock vendor endpoint.

use agentdesk_provider::{
    create_provider, ChatRequest, Completion, Message, Provider, ProviderError, ProviderKind,
};
use mockito::{Matcher, Server};

/// Vendor path and a canned final answer for each kind
fn vendor_reply(kind: ProviderKind) -> (&'static str, &'static str) {
    match kind {
        ProviderKind::OpenAi => (
            "/chat/completions",
            r#"{"choices":[{"message":{"role":"assistant","content":"from openai"}}]}"#,
        ),
        ProviderKind::Anthropic => (
            "/v1/messages",
            r#"{"content":[{"type":"text","text":"from anthropic"}],"stop_reason":"end_turn"}"#,
        ),
        ProviderKind::Google => (
            "/v1beta/models/gemini-2.5-flash:generateContent",
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"from google"}]}}]}"#,
        ),
    }
}

fn request_for(provider: &dyn Provider) -> ChatRequest {
    ChatRequest {
        model: provider.default_model(),
        system: "Current date and time: now".to_string(),
        messages: vec![Message::user("hello")],
        tools: Vec::new(),
        max_tokens: 256,
    }
}

// ===== Dispatch Tests =====

/// Each kind builds the adapter that speaks that vendor's API
#[tokio::test]
async fn test_create_provider_dispatches_by_kind() {
    for kind in ProviderKind::ALL {
        let mut server = Server::new_async().await;
        let (path, body) = vendor_reply(kind);
        let mock = server
            .mock("POST", path)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let provider = create_provider(kind, "test-key", Some(server.url()));
        assert_eq!(provider.kind(), kind);

        let completion = provider.complete(&request_for(provider.as_ref())).await.unwrap();
        assert_eq!(completion, Completion::text(format!("from {}", kind.id())));
        mock.assert_async().await;
    }
}

/// The configured key reaches the vendor in its own auth scheme
#[tokio::test]
async fn test_create_provider_passes_key() {
    let mut server = Server::new_async().await;

    let openai = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-openai")
        .with_body(vendor_reply(ProviderKind::OpenAi).1)
        .create_async()
        .await;
    let anthropic = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "sk-ant")
        .match_header("anthropic-version", "2023-06-01")
        .with_body(vendor_reply(ProviderKind::Anthropic).1)
        .create_async()
        .await;
    let google = server
        .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::UrlEncoded("key".into(), "g-key".into()))
        .with_body(vendor_reply(ProviderKind::Google).1)
        .create_async()
        .await;

    for (kind, key) in [
        (ProviderKind::OpenAi, "sk-openai"),
        (ProviderKind::Anthropic, "sk-ant"),
        (ProviderKind::Google, "g-key"),
    ] {
        let provider = create_provider(kind, key, Some(server.url()));
        provider.complete(&request_for(provider.as_ref())).await.unwrap();
    }

    openai.assert_async().await;
    anthropic.assert_async().await;
    google.assert_async().await;
}

/// Vendor errors surface through the trait object unchanged
#[tokio::test]
async fn test_trait_object_surfaces_vendor_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/messages")
        .with_status(401)
        .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
        .create_async()
        .await;

    let provider: Box<dyn Provider> =
        create_provider("anthropic".parse().unwrap(), "bad", Some(server.url()));

    match provider.complete(&request_for(provider.as_ref())).await {
        Err(ProviderError::Api(message)) => assert_eq!(message, "invalid x-api-key"),
        other => panic!("expected api error, got {:?}", other),
    }
}

/// Unknown vendor ids never reach the factory
#[test]
fn test_unknown_kind_rejected() {
    match "mistral".parse::<ProviderKind>() {
        Err(ProviderError::UnsupportedProvider(id)) => assert_eq!(id, "mistral"),
        other => panic!("expected unsupported provider, got {:?}", other),
    }
}
