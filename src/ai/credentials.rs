//! Credentials supplied when constructing a provider.

use std::fmt;

/// A provider API key.
///
/// The key is never rendered by `Debug` or `Display`; use
/// [`ApiKey::expose`] at the point where it is placed into a request header.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the raw key.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if the key is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_blank() {
            f.write_str("<unset>")
        } else {
            f.write_str("***")
        }
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Input to provider construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    /// Provider identifier, matched case-insensitively.
    pub provider_id: String,
    /// Secret API key.
    pub api_key: ApiKey,
    /// Model identifier; the provider default is used when unset.
    pub model_id: Option<String>,
    /// Endpoint root override; the catalog's `api_base` is used when unset.
    pub base_url: Option<String>,
}

impl ProviderCredentials {
    /// Creates credentials for the provider's default endpoint.
    pub fn new(
        provider_id: impl Into<String>,
        api_key: impl Into<ApiKey>,
        model_id: Option<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            api_key: api_key.into(),
            model_id,
            base_url: None,
        }
    }

    /// Returns these credentials pointed at a different endpoint root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}
