//! Provider contract and the closed set of concrete providers.

pub mod anthropic;
pub mod openai;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::ai::credentials::ApiKey;
use crate::ai::error::{InitError, SolveError};
use crate::ai::image::ImagePayload;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// HTTP request timeout for provider calls.
///
/// Vision requests with long markdown answers routinely take over a minute.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Boxed future returned by [`SolutionProvider::generate_solution`].
pub type SolveFuture<'a> = Pin<Box<dyn Future<Output = Result<String, SolveError>> + Send + 'a>>;

/// Capability every provider implements.
pub trait SolutionProvider: Send + Sync {
    /// Establishes the authenticated transport.
    ///
    /// Calling it again rebuilds the transport.
    fn initialize(&self) -> Result<(), InitError>;

    /// Produces a markdown explanation for one screenshot.
    ///
    /// Initializes the provider first if that has not happened yet.
    fn generate_solution<'a>(&'a self, image: &'a ImagePayload) -> SolveFuture<'a>;

    /// Returns which backend this provider talks to.
    fn kind(&self) -> ProviderKind;

    /// Returns the bound model identifier.
    fn model(&self) -> &str;
}

/// The supported backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Anthropic Messages API.
    Anthropic,
    /// OpenAI Chat Completions API.
    OpenAi,
}

impl ProviderKind {
    /// Every backend, in catalog order.
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Anthropic, ProviderKind::OpenAi];

    /// Catalog identifier.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Resolves a catalog identifier, ignoring ASCII case and surrounding
    /// whitespace.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(id))
    }

    /// Environment variables that may hold the API key, in priority order.
    #[must_use]
    pub fn api_key_env_vars(self) -> &'static [&'static str] {
        match self {
            ProviderKind::Anthropic => &["ANTHROPIC_API_KEY", "CLAUDE_API_KEY"],
            ProviderKind::OpenAi => &["OPENAI_API_KEY", "OPENAI_AUTH_TOKEN"],
        }
    }

    /// Environment variable that overrides the model.
    #[must_use]
    pub fn model_env_var(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_MODEL",
            ProviderKind::OpenAi => "OPENAI_MODEL",
        }
    }

    /// Environment variable that overrides the endpoint root.
    #[must_use]
    pub fn base_url_env_var(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_BASE_URL",
            ProviderKind::OpenAi => "OPENAI_BASE_URL",
        }
    }

    pub(crate) fn build(self, api_key: ApiKey, model: String, base_url: String) -> ProviderInstance {
        match self {
            ProviderKind::Anthropic => {
                ProviderInstance::Anthropic(AnthropicProvider::new(api_key, model, base_url))
            }
            ProviderKind::OpenAi => {
                ProviderInstance::OpenAi(OpenAiProvider::new(api_key, model, base_url))
            }
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A constructed provider of one of the supported kinds.
pub enum ProviderInstance {
    /// Anthropic backend.
    Anthropic(AnthropicProvider),
    /// OpenAI backend.
    OpenAi(OpenAiProvider),
}

impl SolutionProvider for ProviderInstance {
    fn initialize(&self) -> Result<(), InitError> {
        match self {
            ProviderInstance::Anthropic(p) => p.initialize(),
            ProviderInstance::OpenAi(p) => p.initialize(),
        }
    }

    fn generate_solution<'a>(&'a self, image: &'a ImagePayload) -> SolveFuture<'a> {
        match self {
            ProviderInstance::Anthropic(p) => p.generate_solution(image),
            ProviderInstance::OpenAi(p) => p.generate_solution(image),
        }
    }

    fn kind(&self) -> ProviderKind {
        match self {
            ProviderInstance::Anthropic(p) => p.kind(),
            ProviderInstance::OpenAi(p) => p.kind(),
        }
    }

    fn model(&self) -> &str {
        match self {
            ProviderInstance::Anthropic(p) => p.model(),
            ProviderInstance::OpenAi(p) => p.model(),
        }
    }
}

impl fmt::Debug for ProviderInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderInstance")
            .field("kind", &self.kind())
            .field("model", &self.model())
            .finish()
    }
}

// ── Shared helpers for provider implementations ────────────────────

/// Ready-to-use HTTP transport for one provider.
#[derive(Clone)]
pub(crate) struct Transport {
    pub(crate) client: Client,
    pub(crate) api_key: ApiKey,
    pub(crate) base_url: String,
}

impl Transport {
    /// Joins the endpoint root and an API path.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Lazily installed transport, shared by concurrent requests.
///
/// The lock is only held long enough to clone the transport out.
#[derive(Default)]
pub(crate) struct TransportSlot(RwLock<Option<Transport>>);

impl TransportSlot {
    pub(crate) fn install(&self, transport: Transport) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(transport);
    }

    pub(crate) fn get(&self) -> Option<Transport> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn get_or_init(
        &self,
        init: impl FnOnce() -> Result<(), InitError>,
    ) -> Result<Transport, InitError> {
        if let Some(transport) = self.get() {
            return Ok(transport);
        }
        init()?;
        self.get()
            .ok_or_else(|| InitError::Transport("transport was not installed".to_string()))
    }
}

/// Checks key, model and endpoint, then builds the transport.
pub(crate) fn connect(
    kind: ProviderKind,
    api_key: &ApiKey,
    model: &str,
    base_url: &str,
) -> Result<Transport, InitError> {
    validate_api_key(kind, api_key)?;
    validate_model(model)?;
    let url = Url::parse(base_url)
        .map_err(|e| InitError::Transport(format!("invalid base URL '{base_url}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InitError::Transport(format!(
            "unsupported URL scheme '{}' in {base_url}",
            url.scheme()
        )));
    }

    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| InitError::Transport(e.to_string()))?;

    Ok(Transport {
        client,
        api_key: api_key.clone(),
        base_url: base_url.to_string(),
    })
}

fn validate_api_key(kind: ProviderKind, api_key: &ApiKey) -> Result<(), InitError> {
    if api_key.is_blank() {
        return Err(InitError::MissingApiKey {
            provider: kind.id().to_string(),
            env_hint: kind.api_key_env_vars().join(" or "),
        });
    }
    let key = api_key.expose();
    if key.chars().any(|c| c.is_whitespace() || !c.is_ascii_graphic()) {
        return Err(InitError::MalformedApiKey {
            provider: kind.id().to_string(),
            reason: "key contains whitespace or non-printable characters".to_string(),
        });
    }
    Ok(())
}

fn validate_model(model: &str) -> Result<(), InitError> {
    if model.is_empty() || model.chars().any(char::is_whitespace) {
        return Err(InitError::MalformedModel(model.to_string()));
    }
    Ok(())
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Converts a non-success HTTP response into [`SolveError::Backend`].
pub(crate) async fn check_error_response(
    response: reqwest::Response,
) -> Result<reqwest::Response, SolveError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await.unwrap_or_else(|e| {
        debug!("Failed to read error response body: {e}");
        String::new()
    });
    let message = match serde_json::from_str::<ErrorEnvelope>(&error_text) {
        Ok(envelope) => envelope.error.message,
        Err(_) if error_text.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string(),
        Err(_) => error_text,
    };
    Err(SolveError::Backend {
        status: Some(status.as_u16()),
        message,
    })
}

/// Maps a transport failure into [`SolveError::Backend`].
pub(crate) fn network_error(err: reqwest::Error) -> SolveError {
    SolveError::Backend {
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}

/// Maps an undecodable success body into [`SolveError::Backend`].
pub(crate) fn format_error(status: u16, err: reqwest::Error) -> SolveError {
    SolveError::Backend {
        status: Some(status),
        message: format!("Invalid response format: {err}"),
    }
}

/// Logs successful text extraction from a provider response.
pub(crate) fn log_response_success(provider: ProviderKind, result: &Result<String, SolveError>) {
    if let Ok(text) = result {
        debug!(
            response_len = text.len(),
            "Successfully extracted text content from {} API response", provider
        );
    }
}
