//! One-shot solve command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::ai::{ImagePayload, ProviderSession};
use crate::utils::{resolve_credentials, Settings};

/// Solves the problem shown in a screenshot.
#[derive(Parser)]
pub struct SolveCommand {
    /// Path to the screenshot.
    pub image: PathBuf,

    /// Provider to use (overrides SNAPSOLVE_PROVIDER).
    #[arg(long)]
    pub provider: Option<String>,

    /// Model to use (overrides the provider's model variable).
    #[arg(long)]
    pub model: Option<String>,

    /// Writes the markdown answer to a file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl SolveCommand {
    /// Executes the solve command.
    pub async fn execute(self) -> Result<()> {
        let settings = Settings::load()?;
        let credentials =
            resolve_credentials(&settings, self.provider.as_deref(), self.model.as_deref())?;

        let session = ProviderSession::new();
        let descriptor = session
            .switch_provider(credentials)
            .context("Failed to initialize AI provider")?;
        if let Some(binding) = session.current() {
            eprintln!(
                "Using {} (model: {})",
                descriptor.display_name,
                binding.model()
            );
        }

        let image = ImagePayload::Path(self.image);
        let answer = session.solve_with_cancel(&image, interrupted()).await?;

        match self.output {
            Some(path) => std::fs::write(&path, &answer)
                .with_context(|| format!("Failed to write answer to {}", path.display()))?,
            None => println!("{answer}"),
        }
        Ok(())
    }
}

/// Resolves when the user presses Ctrl+C.
pub(crate) async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
