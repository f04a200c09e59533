//! OpenAI Chat Completions provider.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    check_error_response, connect, format_error, log_response_success, network_error,
    ProviderKind, SolutionProvider, SolveFuture, TransportSlot,
};
use crate::ai::catalog::get_catalog;
use crate::ai::credentials::ApiKey;
use crate::ai::error::{InitError, SolveError};
use crate::ai::image::{EncodedImage, ImagePayload};
use crate::ai::prompts::{SYSTEM_PROMPT, USER_PROMPT};
use crate::ai::response::MessageContent;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";
const TEMPERATURE: f32 = 0.1;
const REASONING_FAMILIES: [&str; 3] = ["o1", "o3", "gpt-5"];

/// OpenAI request message
#[derive(Serialize, Debug)]
struct Message {
    role: &'static str,
    content: MessageBody,
}

/// Message content: system turns take a string, user turns a list of parts
#[derive(Serialize, Debug)]
#[serde(untagged)]
enum MessageBody {
    Text(&'static str),
    Parts(Vec<ContentPart>),
}

/// OpenAI user content part
#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: &'static str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Debug)]
struct ImageUrl {
    url: String,
}

/// OpenAI request body
#[derive(Serialize, Debug)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// OpenAI API response choice
#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// OpenAI API response message
#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: MessageContent,
    #[serde(default)]
    refusal: Option<String>,
}

/// OpenAI API response
#[derive(Deserialize, Debug)]
struct OpenAiResponse {
    choices: Vec<Choice>,
    model: Option<String>,
}

/// Provider backed by the OpenAI Chat Completions API.
pub struct OpenAiProvider {
    api_key: ApiKey,
    model: String,
    base_url: String,
    transport: TransportSlot,
}

impl OpenAiProvider {
    /// Creates an uninitialized provider.
    pub fn new(api_key: ApiKey, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url,
            transport: TransportSlot::default(),
        }
    }

    /// Reasoning models take `max_completion_tokens` and only the default
    /// temperature.
    ///
    /// Catalog models use their `reasoning` flag. The family prefixes only
    /// apply to models built directly with [`OpenAiProvider::new`], which
    /// skips the factory's catalog check.
    fn is_reasoning_model(&self) -> bool {
        match get_catalog().model_spec(ProviderKind::OpenAi.id(), &self.model) {
            Some(spec) => spec.reasoning,
            None => REASONING_FAMILIES
                .iter()
                .any(|family| self.model.starts_with(family)),
        }
    }

    fn build_request(&self, image: &EncodedImage) -> OpenAiRequest<'_> {
        let messages = vec![
            Message {
                role: "system",
                content: MessageBody::Text(SYSTEM_PROMPT),
            },
            Message {
                role: "user",
                content: MessageBody::Parts(vec![
                    ContentPart::Text { text: USER_PROMPT },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_url(),
                        },
                    },
                ]),
            },
        ];

        let max_tokens = get_catalog().max_output_tokens(ProviderKind::OpenAi.id(), &self.model);
        if self.is_reasoning_model() {
            OpenAiRequest {
                model: &self.model,
                messages,
                max_tokens: None,
                max_completion_tokens: Some(max_tokens),
                temperature: None,
            }
        } else {
            OpenAiRequest {
                model: &self.model,
                messages,
                max_tokens: Some(max_tokens),
                max_completion_tokens: None,
                temperature: Some(TEMPERATURE),
            }
        }
    }
}

impl SolutionProvider for OpenAiProvider {
    fn initialize(&self) -> Result<(), InitError> {
        let transport = connect(
            ProviderKind::OpenAi,
            &self.api_key,
            &self.model,
            &self.base_url,
        )?;
        self.transport.install(transport);
        debug!(model = %self.model, "OpenAI transport ready");
        Ok(())
    }

    fn generate_solution<'a>(&'a self, image: &'a ImagePayload) -> SolveFuture<'a> {
        Box::pin(async move {
            let transport = self.transport.get_or_init(|| self.initialize())?;
            let encoded = image.encode().await?;
            let request = self.build_request(&encoded);

            debug!(
                message_count = request.messages.len(),
                max_tokens = ?request.max_tokens,
                max_completion_tokens = ?request.max_completion_tokens,
                temperature = ?request.temperature,
                "Built OpenAI request payload"
            );

            let url = transport.endpoint(COMPLETIONS_PATH);
            info!(url = %url, model = %self.model, "Sending request to OpenAI API");

            let response = transport
                .client
                .post(&url)
                .bearer_auth(transport.api_key.expose())
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
                .map_err(network_error)?;

            let response = check_error_response(response).await?;
            let status = response.status().as_u16();
            let openai_response: OpenAiResponse = response
                .json()
                .await
                .map_err(|e| format_error(status, e))?;

            debug!(
                choice_count = openai_response.choices.len(),
                model = ?openai_response.model,
                "Received OpenAI API response"
            );

            let choice = openai_response
                .choices
                .into_iter()
                .next()
                .ok_or(SolveError::EmptyResponse)?;
            debug!(finish_reason = ?choice.finish_reason, "OpenAI completion finished");

            let result = match choice.message.refusal {
                Some(refusal) if !refusal.trim().is_empty() => Err(SolveError::Backend {
                    status: Some(status),
                    message: format!("Model refused the request: {refusal}"),
                }),
                _ => choice.message.content.into_solution(),
            };
            log_response_success(ProviderKind::OpenAi, &result);
            result
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn provider(model: &str) -> OpenAiProvider {
        OpenAiProvider::new(
            ApiKey::new("sk-test123"),
            model.to_string(),
            "https://api.openai.com".to_string(),
        )
    }

    fn image() -> EncodedImage {
        EncodedImage {
            media_type: "image/png",
            data: "aGVsbG8=".to_string(),
        }
    }

    #[test]
    fn initialize_twice_succeeds() {
        let provider = provider("gpt-4o");
        provider.initialize().unwrap();
        provider.initialize().unwrap();
        assert!(provider.transport.get().is_some());
    }

    #[test]
    fn system_prompt_is_a_separate_message() {
        let provider = provider("gpt-4o");
        let image = image();
        let body = serde_json::to_value(provider.build_request(&image)).unwrap();

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["role"], "user");
        let parts = &body["messages"][1]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[0]["text"], USER_PROMPT);
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(
            parts[1]["image_url"]["url"],
            "data:image/png;base64,aGVsbG8="
        );
        assert!(body.get("system").is_none());
    }

    #[test]
    fn chat_model_uses_max_tokens_and_temperature() {
        let provider = provider("gpt-4o");
        let image = image();
        let request = provider.build_request(&image);
        assert_eq!(request.max_tokens, Some(16384));
        assert_eq!(request.max_completion_tokens, None);
        assert_eq!(request.temperature, Some(TEMPERATURE));
    }

    #[test]
    fn reasoning_model_uses_max_completion_tokens() {
        let provider = provider("o3-mini");
        let image = image();
        let request = provider.build_request(&image);
        assert_eq!(request.max_tokens, None);
        assert_eq!(request.max_completion_tokens, Some(100000));
        assert_eq!(request.temperature, None);

        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn response_requires_choices_field() {
        assert!(serde_json::from_str::<OpenAiResponse>(r#"{"unexpected": true}"#).is_err());
        let empty = serde_json::from_str::<OpenAiResponse>(r#"{"choices": []}"#).unwrap();
        assert!(empty.choices.is_empty());
    }

    #[test]
    fn catalog_flag_decides_for_listed_models() {
        assert!(provider("o3-mini").is_reasoning_model());
        assert!(!provider("gpt-4o").is_reasoning_model());
        assert!(!provider("gpt-4o-mini").is_reasoning_model());
    }

    #[test]
    fn unlisted_models_fall_back_to_family_prefix() {
        assert!(provider("o1-preview").is_reasoning_model());
        assert!(provider("gpt-5").is_reasoning_model());
        assert!(!provider("gpt-4-turbo").is_reasoning_model());
    }
}
