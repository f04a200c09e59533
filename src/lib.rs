//! # snapsolve
//!
//! Sends a screenshot of a coding problem to an LLM provider and returns a
//! markdown explanation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use snapsolve::ai::{ImagePayload, ProviderCredentials, ProviderSession};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let session = ProviderSession::new();
//! session.switch_provider(ProviderCredentials::new("anthropic", "sk-ant-...", None))?;
//! let answer = session.solve(&ImagePayload::Path("shot.png".into())).await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod ai;
pub mod cli;
pub mod utils;

pub use crate::cli::Cli;

/// The current version of snapsolve.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
