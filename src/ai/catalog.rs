//! Provider catalog
//!
//! Provider descriptors and per-model limits are loaded from an embedded
//! YAML template so that the set of supported backends and models is fixed
//! at build time.

use std::sync::OnceLock;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Raw YAML for the embedded provider catalog.
pub const CATALOG_YAML: &str = include_str!("../templates/providers.yaml");

/// Model specification from the catalog
#[derive(Debug, Deserialize, Clone)]
pub struct ModelSpec {
    /// API identifier used for requests (e.g., "gpt-4o")
    pub api_identifier: String,
    /// Maximum number of tokens that can be generated in a single response
    pub max_output_tokens: usize,
    /// Reasoning models take `max_completion_tokens` and reject `temperature`
    #[serde(default)]
    pub reasoning: bool,
}

/// Fallback limits for a provider
#[derive(Debug, Deserialize, Clone)]
pub struct DefaultConfig {
    /// Default maximum output tokens
    pub max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ProviderEntry {
    id: String,
    name: String,
    api_base: String,
    default_model: String,
    defaults: DefaultConfig,
    models: Vec<ModelSpec>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    providers: Vec<ProviderEntry>,
}

/// Static description of one provider, as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    /// Short unique identifier (e.g., "openai").
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Model used when the caller does not pick one.
    pub default_model: String,
    /// Valid model identifiers, in catalog order.
    pub supported_models: Vec<String>,
    /// Default endpoint root for the backend.
    #[serde(skip)]
    pub api_base: String,
}

impl ProviderDescriptor {
    /// Returns true if `model` is one of the provider's supported models.
    #[must_use]
    pub fn supports_model(&self, model: &str) -> bool {
        self.supported_models.iter().any(|m| m == model)
    }
}

/// Catalog of providers and their models.
pub struct ProviderCatalog {
    descriptors: Vec<ProviderDescriptor>,
    entries: Vec<ProviderEntry>,
}

impl ProviderCatalog {
    /// Loads the catalog from the embedded YAML.
    pub fn load() -> Result<Self> {
        Self::from_yaml(CATALOG_YAML)
    }

    /// Parses a catalog and checks that every default model is listed.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;

        let mut descriptors = Vec::with_capacity(file.providers.len());
        for entry in &file.providers {
            if descriptors
                .iter()
                .any(|d: &ProviderDescriptor| d.id.eq_ignore_ascii_case(&entry.id))
            {
                bail!("Duplicate provider id in catalog: {}", entry.id);
            }
            if !entry
                .models
                .iter()
                .any(|m| m.api_identifier == entry.default_model)
            {
                bail!(
                    "Default model {} is not listed for provider {}",
                    entry.default_model,
                    entry.id
                );
            }
            descriptors.push(ProviderDescriptor {
                id: entry.id.clone(),
                display_name: entry.name.clone(),
                default_model: entry.default_model.clone(),
                supported_models: entry
                    .models
                    .iter()
                    .map(|m| m.api_identifier.clone())
                    .collect(),
                api_base: entry.api_base.clone(),
            });
        }

        Ok(Self {
            descriptors,
            entries: file.providers,
        })
    }

    /// All provider descriptors in declaration order.
    pub fn descriptors(&self) -> &[ProviderDescriptor] {
        &self.descriptors
    }

    /// Looks up a descriptor by identifier, ignoring ASCII case.
    pub fn descriptor(&self, id: &str) -> Option<&ProviderDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.id.eq_ignore_ascii_case(id))
    }

    fn entry(&self, provider: &str) -> Option<&ProviderEntry> {
        self.entries
            .iter()
            .find(|e| e.id.eq_ignore_ascii_case(provider))
    }

    /// Get the specification for a provider's model
    pub fn model_spec(&self, provider: &str, model: &str) -> Option<&ModelSpec> {
        self.entry(provider)?
            .models
            .iter()
            .find(|m| m.api_identifier == model)
    }

    /// Get max output tokens for a model, with fallback to provider defaults
    pub fn max_output_tokens(&self, provider: &str, model: &str) -> usize {
        if let Some(spec) = self.model_spec(provider, model) {
            return spec.max_output_tokens;
        }
        self.entry(provider)
            .map_or(4096, |e| e.defaults.max_output_tokens)
    }
}

/// Global catalog instance
static CATALOG: OnceLock<ProviderCatalog> = OnceLock::new();

/// Get the global provider catalog
pub fn get_catalog() -> &'static ProviderCatalog {
    CATALOG.get_or_init(|| ProviderCatalog::load().expect("Failed to load provider catalog"))
}
