//! HTTP oracle client
//!
//! Direct HTTP client for an OpenAI-compatible chat-completions API,
//! including function calling for structured results.

use crate::oracle::{FunctionCall, FunctionDecl, Oracle, OracleError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions request payload
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<Vec<FunctionDecl>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<String>,
}

/// A single chat message
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
}

/// Function call as it appears on the wire: arguments are a JSON
/// string, not a JSON object
#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

/// Chat-completions response payload
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// HTTP-backed oracle speaking the chat-completions protocol
///
/// Uses a shared `reqwest::Client` for connection pooling. Failures
/// propagate unchanged; no internal retry is performed.
pub struct HttpOracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl HttpOracle {
    /// Create a client against the default API base URL
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self::with_base_url(client, api_key, model, OPENAI_API_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL (used in tests)
    pub fn with_base_url(
        client: reqwest::Client,
        api_key: String,
        model: String,
        base_url: String,
    ) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url,
        }
    }

    /// Send one chat-completions request and return the response
    /// message from the first choice
    async fn chat(
        &self,
        prompt: &str,
        functions: Option<&[FunctionDecl]>,
    ) -> Result<ChatMessage, OracleError> {
        if self.api_key.is_empty() {
            return Err(OracleError::Transport("API key is empty".to_string()));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let request_body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
                function_call: None,
            }],
            functions: functions.map(|f| f.to_vec()),
            function_call: functions.map(|_| "auto".to_string()),
        };

        tracing::debug!(
            url = %url,
            model = %self.model,
            with_functions = functions.is_some(),
            prompt_len = prompt.len(),
            "Calling chat-completions API"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| OracleError::Transport(format!("Failed to send HTTP request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                status_code = status_code,
                error_body = %error_body,
                "Chat-completions API returned error status"
            );

            return Err(OracleError::Api {
                status: status_code,
                body: error_body,
            });
        }

        let response_body = response.text().await.map_err(|e| {
            OracleError::Transport(format!("Failed to read response body: {}", e))
        })?;

        let parsed: ChatResponse = serde_json::from_str(&response_body).map_err(|e| {
            OracleError::MalformedResponse(format!(
                "Failed to parse JSON response: {} - Response body: {}",
                e, response_body
            ))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::MalformedResponse("Response contains no choices".to_string()))?;

        Ok(choice.message)
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn ask(&self, prompt: &str) -> Result<String, OracleError> {
        let message = self.chat(prompt, None).await?;
        let text = message.content.unwrap_or_default();
        if text.is_empty() {
            return Err(OracleError::MalformedResponse(
                "Response message has no text content".to_string(),
            ));
        }

        tracing::debug!(response_len = text.len(), "Received text completion");
        Ok(text)
    }

    async fn ask_function(
        &self,
        prompt: &str,
        functions: &[FunctionDecl],
    ) -> Result<FunctionCall, OracleError> {
        let message = self.chat(prompt, Some(functions)).await?;
        let wire_call = message.function_call.ok_or_else(|| {
            OracleError::MalformedResponse(
                "Response message contains no function call".to_string(),
            )
        })?;

        // Arguments arrive as a JSON-encoded string
        let arguments: serde_json::Value = serde_json::from_str(&wire_call.arguments)
            .map_err(|e| OracleError::Decode(format!("Invalid function arguments: {}", e)))?;

        Ok(FunctionCall {
            name: wire_call.name,
            arguments,
        })
    }
}
