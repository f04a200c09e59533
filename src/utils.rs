//! Utility functions and helpers.

pub mod preflight;
pub mod settings;

pub use preflight::{resolve_credentials, DEFAULT_PROVIDER, PROVIDER_ENV_VAR};
pub use settings::Settings;
