//! Provider factory and catalog access.

use tracing::{debug, info};

use crate::ai::catalog::{get_catalog, ProviderDescriptor};
use crate::ai::credentials::{ApiKey, ProviderCredentials};
use crate::ai::error::{InitError, ProviderError};
use crate::ai::provider::{ProviderInstance, ProviderKind, SolutionProvider};

/// Builds initialized providers from identifiers and credentials.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Creates and initializes a provider.
    ///
    /// `id` is matched case-insensitively. When `model` is `None` or empty
    /// the provider's default model is used.
    pub fn create_provider(
        id: &str,
        api_key: impl Into<ApiKey>,
        model: Option<&str>,
    ) -> Result<ProviderInstance, ProviderError> {
        let credentials = ProviderCredentials::new(id, api_key, model.map(str::to_string));
        Self::create_from_credentials(&credentials)
    }

    /// Creates and initializes a provider from a full credential set.
    pub fn create_from_credentials(
        credentials: &ProviderCredentials,
    ) -> Result<ProviderInstance, ProviderError> {
        let kind = ProviderKind::from_id(&credentials.provider_id)
            .ok_or_else(|| ProviderError::UnsupportedProvider(credentials.provider_id.clone()))?;
        let descriptor = Self::descriptor(kind)?;

        let model = resolve_model(descriptor, credentials.model_id.as_deref())?;
        let base_url = credentials
            .base_url
            .clone()
            .unwrap_or_else(|| descriptor.api_base.clone());

        debug!(provider = %kind, model = %model, base_url = %base_url, "Creating provider");

        let instance = kind.build(credentials.api_key.clone(), model, base_url);
        instance.initialize()?;

        info!(provider = %kind, model = %instance.model(), "Provider initialized");
        Ok(instance)
    }

    /// Lists the supported providers in catalog order.
    pub fn list_supported_providers() -> Vec<ProviderDescriptor> {
        get_catalog().descriptors().to_vec()
    }

    /// Returns the catalog entry for a provider kind.
    pub fn descriptor(kind: ProviderKind) -> Result<&'static ProviderDescriptor, ProviderError> {
        get_catalog()
            .descriptor(kind.id())
            .ok_or_else(|| ProviderError::UnsupportedProvider(kind.id().to_string()))
    }
}

fn resolve_model(
    descriptor: &ProviderDescriptor,
    requested: Option<&str>,
) -> Result<String, InitError> {
    let model = match requested.map(str::trim) {
        None | Some("") => return Ok(descriptor.default_model.clone()),
        Some(model) => model,
    };
    if model.chars().any(char::is_whitespace) {
        return Err(InitError::MalformedModel(model.to_string()));
    }
    if !descriptor.supports_model(model) {
        return Err(InitError::UnsupportedModel {
            provider: descriptor.id.clone(),
            model: model.to_string(),
            supported: descriptor.supported_models.join(", "),
        });
    }
    Ok(model.to_string())
}
