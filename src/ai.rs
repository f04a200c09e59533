//! Screenshot-to-solution AI provider layer.

pub mod catalog;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod image;
pub mod prompts;
pub mod provider;
pub(crate) mod response;
pub mod session;

pub use catalog::{get_catalog, ProviderDescriptor};
pub use credentials::{ApiKey, ProviderCredentials};
pub use error::{InitError, ProviderError, SolveError};
pub use factory::ProviderFactory;
pub use image::ImagePayload;
pub use provider::{ProviderInstance, ProviderKind, SolutionProvider};
pub use session::{ActiveBinding, ProviderSession, SessionEvent};
