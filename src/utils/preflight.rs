//! Startup credential resolution
//!
//! Reads provider selection, API key, model and endpoint overrides from the
//! environment (with settings-file fallback) so the host can bind a session
//! before the first solve.

use crate::ai::{InitError, ProviderCredentials, ProviderError, ProviderKind};
use crate::utils::settings::Settings;

/// Variable that selects the provider at startup.
pub const PROVIDER_ENV_VAR: &str = "SNAPSOLVE_PROVIDER";

/// Provider used when nothing is configured.
pub const DEFAULT_PROVIDER: &str = "anthropic";

/// Resolves startup credentials from the environment and settings.
///
/// `provider_override` and `model_override` take precedence over the
/// configured values.
pub fn resolve_credentials(
    settings: &Settings,
    provider_override: Option<&str>,
    model_override: Option<&str>,
) -> Result<ProviderCredentials, ProviderError> {
    resolve_with(|key| settings.get_env_var(key), provider_override, model_override)
}

/// Resolves credentials using an arbitrary variable lookup.
pub fn resolve_with(
    lookup: impl Fn(&str) -> Option<String>,
    provider_override: Option<&str>,
    model_override: Option<&str>,
) -> Result<ProviderCredentials, ProviderError> {
    let provider_id = provider_override
        .map(String::from)
        .or_else(|| lookup(PROVIDER_ENV_VAR))
        .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());

    let kind = ProviderKind::from_id(&provider_id)
        .ok_or_else(|| ProviderError::UnsupportedProvider(provider_id.clone()))?;

    let api_key = kind
        .api_key_env_vars()
        .iter()
        .find_map(|key| lookup(key))
        .ok_or_else(|| InitError::MissingApiKey {
            provider: kind.id().to_string(),
            env_hint: kind.api_key_env_vars().join(" or "),
        })?;

    let model = model_override
        .map(String::from)
        .or_else(|| lookup(kind.model_env_var()));

    let mut credentials = ProviderCredentials::new(kind.id(), api_key, model);
    credentials.base_url = lookup(kind.base_url_env_var());
    Ok(credentials)
}
