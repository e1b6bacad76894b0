//! HTTP gateway speaking a Converse-style JSON protocol.
//!
//! Requests carry user/system content blocks plus an inference config;
//! responses come back as a list of content blocks where text and
//! reasoning are separate block types. A `thinking` block is attached
//! only for model variants that support an explicit reasoning phase.

use super::{GatewayError, InferenceGateway, InferenceRequest, InferenceResponse, TokenUsage};
use async_trait::async_trait;
use serde_json::json;

pub const DEFAULT_ENDPOINT: &str = "https://bedrock-runtime.us-east-1.amazonaws.com";

pub struct ConverseGateway {
    client: reqwest::Client,
    base_url: String,
    model_id: String,
    api_key: String,
}

impl ConverseGateway {
    /// Build a gateway taking the API key from the environment.
    pub fn from_env(model_id: &str, endpoint: Option<&str>) -> Result<Self, GatewayError> {
        let api_key = std::env::var("PROMPT_REFINE_API_KEY")
            .or_else(|_| std::env::var("AWS_BEARER_TOKEN_BEDROCK"))
            .map_err(|_| {
                GatewayError::Auth(
                    "PROMPT_REFINE_API_KEY or AWS_BEARER_TOKEN_BEDROCK environment variable must be set"
                        .to_string(),
                )
            })?;

        Ok(Self::new(
            model_id,
            endpoint.unwrap_or(DEFAULT_ENDPOINT),
            api_key,
        ))
    }

    pub fn new(model_id: &str, base_url: &str, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model_id: model_id.to_string(),
            api_key,
        }
    }

    /// Whether the declared model identity supports an explicit
    /// reasoning phase. Routing is a variant dispatch on the model id,
    /// not a universal request parameter.
    fn supports_reasoning(&self) -> bool {
        self.model_id.contains("sonnet")
    }

    fn build_body(&self, request: &InferenceRequest) -> serde_json::Value {
        let mut inference_config = json!({
            "temperature": request.temperature,
            "maxTokens": request.max_tokens,
        });
        if let Some(top_p) = request.top_p {
            inference_config["topP"] = json!(top_p);
        }

        let mut body = json!({
            "messages": [
                {
                    "role": "user",
                    "content": [{ "text": request.prompt }]
                }
            ],
            "inferenceConfig": inference_config,
        });

        if let Some(system) = &request.system {
            body["system"] = json!([{ "text": system }]);
        }

        if let Some(budget) = request.reasoning_budget {
            if self.supports_reasoning() {
                body["additionalModelRequestFields"] = json!({
                    "thinking": {
                        "type": "enabled",
                        "budget_tokens": budget,
                    }
                });
            }
        }

        body
    }
}

#[async_trait]
impl InferenceGateway for ConverseGateway {
    async fn invoke(&self, request: InferenceRequest) -> Result<InferenceResponse, GatewayError> {
        let url = format!("{}/model/{}/converse", self.base_url, self.model_id);
        let body = self.build_body(&request);

        tracing::debug!(model = %self.model_id, prompt_chars = request.prompt.len(), "inference call");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api { status, body });
        }

        let payload: serde_json::Value = response.json().await?;
        parse_converse_response(&payload)
    }
}

fn parse_converse_response(payload: &serde_json::Value) -> Result<InferenceResponse, GatewayError> {
    let blocks = payload
        .pointer("/output/message/content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| {
            GatewayError::InvalidResponse("missing output.message.content".to_string())
        })?;

    let mut texts = Vec::new();
    let mut reasoning = None;
    for block in blocks {
        if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
            texts.push(text.to_string());
        }
        if let Some(trace) = block
            .pointer("/reasoningContent/reasoningText/text")
            .and_then(|t| t.as_str())
        {
            reasoning = Some(trace.to_string());
        }
    }

    if texts.is_empty() && reasoning.is_none() {
        return Err(GatewayError::InvalidResponse(
            "no content blocks in response".to_string(),
        ));
    }

    let token_usage = payload.get("usage").and_then(|usage| {
        Some(TokenUsage {
            input_tokens: usage.get("inputTokens")?.as_u64()?,
            output_tokens: usage.get("outputTokens")?.as_u64()?,
        })
    });

    Ok(InferenceResponse {
        text: texts.join("\n"),
        reasoning,
        token_usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    fn request() -> InferenceRequest {
        InferenceRequest::new("Classify this question")
    }

    #[test]
    fn test_thinking_block_attached_for_reasoning_model() {
        let gateway = ConverseGateway::new(
            "us.anthropic.claude-3-7-sonnet-20250219-v1:0",
            DEFAULT_ENDPOINT,
            "key".to_string(),
        );

        let mut req = request();
        req.reasoning_budget = Some(2048);
        let body = gateway.build_body(&req);

        assert_eq!(
            body.pointer("/additionalModelRequestFields/thinking/budget_tokens"),
            Some(&json!(2048))
        );
        assert_eq!(
            body.pointer("/additionalModelRequestFields/thinking/type"),
            Some(&json!("enabled"))
        );
    }

    #[test]
    fn test_thinking_block_omitted_for_plain_model() {
        let gateway =
            ConverseGateway::new("us.amazon.nova-pro-v1:0", DEFAULT_ENDPOINT, "key".to_string());

        let mut req = request();
        req.reasoning_budget = Some(2048);
        let body = gateway.build_body(&req);

        assert!(body.get("additionalModelRequestFields").is_none());
    }

    #[test]
    fn test_build_body_system_and_top_p() {
        let gateway =
            ConverseGateway::new("us.amazon.nova-pro-v1:0", DEFAULT_ENDPOINT, "key".to_string());

        let mut req = request().with_system("Be terse");
        req.top_p = Some(0.9);
        let body = gateway.build_body(&req);

        assert_eq!(body.pointer("/system/0/text"), Some(&json!("Be terse")));
        assert_eq!(body.pointer("/inferenceConfig/topP"), Some(&json!(0.9)));
        assert_eq!(
            body.pointer("/messages/0/content/0/text"),
            Some(&json!("Classify this question"))
        );
    }

    #[tokio::test]
    async fn test_invoke_success_with_reasoning() {
        let mock_server = MockServer::start().await;

        let mock_response = serde_json::json!({
            "output": {
                "message": {
                    "content": [
                        { "reasoningContent": { "reasoningText": { "text": "thinking it through" } } },
                        { "text": "first segment" },
                        { "text": "second segment" }
                    ]
                }
            },
            "usage": { "inputTokens": 120, "outputTokens": 48 }
        });

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/model/test-model/converse"))
            .and(matchers::header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
            .mount(&mock_server)
            .await;

        let gateway =
            ConverseGateway::new("test-model", &mock_server.uri(), "test-key".to_string());
        let response = gateway.invoke(request()).await.unwrap();

        assert_eq!(response.text, "first segment\nsecond segment");
        assert_eq!(response.reasoning.as_deref(), Some("thinking it through"));
        assert_eq!(
            response.token_usage,
            Some(TokenUsage {
                input_tokens: 120,
                output_tokens: 48
            })
        );
    }

    #[tokio::test]
    async fn test_invoke_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/model/test-model/converse"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "message": "Too many requests"
            })))
            .mount(&mock_server)
            .await;

        let gateway =
            ConverseGateway::new("test-model", &mock_server.uri(), "test-key".to_string());
        let err = gateway.invoke(request()).await.unwrap_err();

        match err {
            GatewayError::Api { status, body } => {
                assert_eq!(status, 429);
                assert!(body.contains("Too many requests"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_invalid_response_shape() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/model/test-model/converse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "output": {}
            })))
            .mount(&mock_server)
            .await;

        let gateway =
            ConverseGateway::new("test-model", &mock_server.uri(), "test-key".to_string());
        let err = gateway.invoke(request()).await.unwrap_err();

        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_invoke_empty_content() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/model/test-model/converse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "output": { "message": { "content": [] } }
            })))
            .mount(&mock_server)
            .await;

        let gateway =
            ConverseGateway::new("test-model", &mock_server.uri(), "test-key".to_string());
        let err = gateway.invoke(request()).await.unwrap_err();

        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }
}
