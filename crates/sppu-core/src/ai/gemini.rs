use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use super::prompt::{response_schema, SYSTEM_INSTRUCTION};
use crate::config::{Config, DEFAULT_API_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::error::AnswerError;
use crate::provider::AnswerService;
use crate::state::{ImageAttachment, SingleQnA};

pub const MISSING_API_KEY_MESSAGE: &str = "API key not set. Export GEMINI_API_KEY (or API_KEY) or add gemini_api_key to the config file.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiSystemInstruction,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Other(Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

/// The structured answer shape the model is asked for.
#[derive(Debug, Deserialize)]
struct AnswerPayload {
    #[serde(rename = "questionsAndAnswers", default)]
    questions_and_answers: Option<Vec<SingleQnA>>,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: f32,
}

impl GeminiClient {
    /// A missing key is reported when a request is made, not here.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_key())
            .with_model(&config.model)
            .with_base_url(&config.api_base_url)
            .with_temperature(config.temperature)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn query(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<Vec<SingleQnA>, AnswerError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AnswerError::Configuration(MISSING_API_KEY_MESSAGE.to_string()))?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = build_request(prompt, image, self.temperature);

        debug!(
            target: "gemini::query",
            "POST {} (prompt {} chars, image: {})",
            url,
            prompt.chars().count(),
            image.map(|i| i.mime_type.as_str()).unwrap_or("none")
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!(target: "gemini::query", "Gemini API error {}: {}", status, text);
            return Err(AnswerError::Transport(format!(
                "Gemini API error {}: {}",
                status, text
            )));
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}

impl AnswerService for GeminiClient {
    async fn answer(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<Vec<SingleQnA>, AnswerError> {
        self.query(prompt, image).await
    }
}

fn build_request(prompt: &str, image: Option<&ImageAttachment>, temperature: f32) -> GeminiRequest {
    let mut parts = Vec::with_capacity(2);
    if let Some(image) = image {
        parts.push(GeminiPart::InlineData {
            inline_data: GeminiInlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        });
    }
    parts.push(GeminiPart::Text {
        text: prompt.to_string(),
    });

    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts,
        }],
        system_instruction: GeminiSystemInstruction {
            parts: vec![GeminiPart::Text {
                text: SYSTEM_INSTRUCTION.to_string(),
            }],
        },
        generation_config: GeminiGenerationConfig {
            response_mime_type: "application/json",
            response_schema: response_schema(),
            temperature,
        },
    }
}

/// Pull the model's JSON text out of the envelope and decode the QnA list.
fn parse_response(body: &str) -> Result<Vec<SingleQnA>, AnswerError> {
    let envelope: GeminiResponse = serde_json::from_str(body).map_err(|e| {
        error!(target: "gemini::parse", "Unexpected response envelope: {}. Body: {}", e, body);
        AnswerError::Transport(format!("unexpected response envelope: {}", e))
    })?;

    let text: String = envelope
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| match part {
                    GeminiPart::Text { text } => Some(text),
                    _ => None,
                })
                .collect()
        })
        .ok_or_else(|| AnswerError::Transport("response contained no candidates".to_string()))?;

    let payload: AnswerPayload = serde_json::from_str(text.trim()).map_err(|e| {
        error!(target: "gemini::parse", "Model returned malformed JSON: {}. Text: {}", e, text);
        AnswerError::Format(e.to_string())
    })?;

    Ok(payload.questions_and_answers.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(text: &str) -> String {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        })
        .to_string()
    }

    #[test]
    fn test_request_text_only() {
        let request = serde_json::to_value(build_request("Explain OSI layers", None, 0.5)).unwrap();

        let parts = &request["contents"][0]["parts"];
        assert_eq!(request["contents"][0]["role"], "user");
        assert_eq!(parts.as_array().unwrap().len(), 1);
        assert_eq!(parts[0]["text"], "Explain OSI layers");
        assert_eq!(
            request["systemInstruction"]["parts"][0]["text"],
            SYSTEM_INSTRUCTION
        );
        assert_eq!(
            request["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(request["generationConfig"]["temperature"], 0.5);
        assert_eq!(
            request["generationConfig"]["responseSchema"],
            response_schema()
        );
    }

    #[test]
    fn test_request_puts_image_before_text() {
        let image = ImageAttachment::new("aGVsbG8=", "image/png");
        let request = serde_json::to_value(build_request("Q.1", Some(&image), 0.5)).unwrap();

        let parts = request["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(parts[1]["text"], "Q.1");
    }

    #[test]
    fn test_parse_answers_in_order() {
        let text = r#"{"questionsAndAnswers": [
            {"question": "Q1", "answer": "A1"},
            {"question": "Q2", "answer": "**A2** ✅"}
        ]}"#;

        let qnas = parse_response(&envelope(text)).unwrap();
        assert_eq!(
            qnas,
            vec![SingleQnA::new("Q1", "A1"), SingleQnA::new("Q2", "**A2** ✅")]
        );
    }

    #[test]
    fn test_parse_trims_and_joins_text_parts() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "  {\"questionsAndAnswers\": "},
                    {"text": "[{\"question\": \"Q\", \"answer\": \"A\"}]}\n"}
                ]}
            }]
        })
        .to_string();

        assert_eq!(parse_response(&body).unwrap(), vec![SingleQnA::new("Q", "A")]);
    }

    #[test]
    fn test_parse_missing_list_is_empty() {
        assert!(parse_response(&envelope("{}")).unwrap().is_empty());
        assert!(parse_response(&envelope(r#"{"questionsAndAnswers": []}"#))
            .unwrap()
            .is_empty());
        assert!(parse_response(&envelope(r#"{"questionsAndAnswers": null}"#))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_malformed_model_json_is_format_error() {
        let err = parse_response(&envelope("Sure! Here are your answers")).unwrap_err();
        assert!(matches!(err, AnswerError::Format(_)));

        let err = parse_response(&envelope(r#"{"questionsAndAnswers": [{"question": "Q"}]}"#))
            .unwrap_err();
        assert!(matches!(err, AnswerError::Format(_)));
    }

    #[test]
    fn test_parse_no_candidates_is_transport_error() {
        let err = parse_response(r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, AnswerError::Transport(_)));

        let err = parse_response(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap_err();
        assert!(matches!(err, AnswerError::Transport(_)));
    }

    #[test]
    fn test_parse_bad_envelope_is_transport_error() {
        let err = parse_response("<html>502</html>").unwrap_err();
        assert!(matches!(err, AnswerError::Transport(_)));
    }

    #[tokio::test]
    async fn test_missing_key_fails_at_call_time() {
        let client = GeminiClient::new(None);
        assert!(!client.has_api_key());

        let err = client.answer("Q", None).await.unwrap_err();
        assert_eq!(
            err,
            AnswerError::Configuration(MISSING_API_KEY_MESSAGE.to_string())
        );
        assert_eq!(err.user_message(), MISSING_API_KEY_MESSAGE);
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::new();
        config.model = "gemini-2.5-flash".to_string();
        config.api_base_url = "http://localhost:8080/v1beta/".to_string();

        let client = GeminiClient::from_config(&config);
        assert_eq!(client.model(), "gemini-2.5-flash");
        assert_eq!(client.base_url, "http://localhost:8080/v1beta");
    }
}
