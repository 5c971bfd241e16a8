use super::*;
use crate::config::ProviderKind;

fn test_config() -> EmbeddingConfig {
    EmbeddingConfig {
        provider: ProviderKind::Gemini,
        model: "text-embedding-004".to_string(),
        dimension: 768,
        batch_size: 32,
        endpoint: None,
        api_key: Some("test-key".to_string()),
    }
}

#[test]
fn endpoint_targets_batch_embed() {
    let client = GeminiClient::new(&test_config()).expect("Failed to create client");

    assert!(
        client
            .endpoint
            .as_str()
            .starts_with("https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:batchEmbedContents")
    );
    assert_eq!(client.model, "text-embedding-004");
    assert_eq!(client.dimension, 768);
}

#[test]
fn request_body_shape() {
    let request = BatchEmbedRequest {
        requests: vec![EmbedContentRequest {
            model: "models/text-embedding-004".to_string(),
            content: Content {
                parts: vec![Part {
                    text: "hello".to_string(),
                }],
            },
        }],
    };

    let json = serde_json::to_value(&request).expect("should serialize");
    assert_eq!(
        json["requests"][0]["content"]["parts"][0]["text"],
        serde_json::json!("hello")
    );
    assert_eq!(
        json["requests"][0]["model"],
        serde_json::json!("models/text-embedding-004")
    );
}
