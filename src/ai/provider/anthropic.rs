//! Anthropic Messages API provider.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    check_error_response, connect, format_error, log_response_success, network_error,
    ProviderKind, SolutionProvider, SolveFuture, TransportSlot,
};
use crate::ai::catalog::get_catalog;
use crate::ai::credentials::ApiKey;
use crate::ai::error::InitError;
use crate::ai::image::{EncodedImage, ImagePayload};
use crate::ai::prompts::{SYSTEM_PROMPT, USER_PROMPT};
use crate::ai::response::MessageContent;

const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic request message.
#[derive(Serialize, Debug)]
struct Message<'a> {
    role: &'static str,
    content: Vec<RequestBlock<'a>>,
}

/// Anthropic request content block.
#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

/// Inline base64 image source.
#[derive(Serialize, Debug)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'a str,
    data: &'a str,
}

/// Anthropic request body.
#[derive(Serialize, Debug)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

/// Anthropic response.
#[derive(Deserialize, Debug)]
struct AnthropicResponse {
    content: MessageContent,
    #[serde(default)]
    stop_reason: Option<String>,
}

/// Provider backed by the Anthropic Messages API.
pub struct AnthropicProvider {
    api_key: ApiKey,
    model: String,
    base_url: String,
    transport: TransportSlot,
}

impl AnthropicProvider {
    /// Creates an uninitialized provider.
    pub fn new(api_key: ApiKey, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url,
            transport: TransportSlot::default(),
        }
    }

    fn build_request<'a>(&'a self, image: &'a EncodedImage) -> AnthropicRequest<'a> {
        AnthropicRequest {
            model: &self.model,
            max_tokens: get_catalog().max_output_tokens(ProviderKind::Anthropic.id(), &self.model),
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: vec![
                    RequestBlock::Text { text: USER_PROMPT },
                    RequestBlock::Image {
                        source: ImageSource {
                            source_type: "base64",
                            media_type: image.media_type,
                            data: &image.data,
                        },
                    },
                ],
            }],
        }
    }
}

impl SolutionProvider for AnthropicProvider {
    fn initialize(&self) -> Result<(), InitError> {
        let transport = connect(
            ProviderKind::Anthropic,
            &self.api_key,
            &self.model,
            &self.base_url,
        )?;
        self.transport.install(transport);
        debug!(model = %self.model, "Anthropic transport ready");
        Ok(())
    }

    fn generate_solution<'a>(&'a self, image: &'a ImagePayload) -> SolveFuture<'a> {
        Box::pin(async move {
            let transport = self.transport.get_or_init(|| self.initialize())?;
            let encoded = image.encode().await?;
            let request = self.build_request(&encoded);
            let url = transport.endpoint(MESSAGES_PATH);

            info!(
                url = %url,
                model = %self.model,
                max_tokens = request.max_tokens,
                "Sending request to Anthropic API"
            );

            let response = transport
                .client
                .post(&url)
                .header("x-api-key", transport.api_key.expose())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await
                .map_err(network_error)?;

            let response = check_error_response(response).await?;
            let status = response.status().as_u16();
            let anthropic_response: AnthropicResponse = response
                .json()
                .await
                .map_err(|e| format_error(status, e))?;

            debug!(
                stop_reason = ?anthropic_response.stop_reason,
                "Received Anthropic API response"
            );

            let result = anthropic_response.content.into_solution();
            log_response_success(ProviderKind::Anthropic, &result);
            result
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }
}
