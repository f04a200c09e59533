//! Configuration-related CLI commands.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::ai::{ProviderError, ProviderFactory, ProviderKind};
use crate::utils::{resolve_credentials, Settings};

/// Configuration operations.
#[derive(Parser)]
pub struct ConfigCommand {
    /// Configuration subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

/// Configuration subcommands.
#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Shows the settings file location and the resolved provider.
    Show(ShowCommand),
}

/// Show command options.
#[derive(Parser)]
pub struct ShowCommand {}

impl ConfigCommand {
    /// Executes the config command.
    pub fn execute(self) -> Result<()> {
        match self.command {
            ConfigSubcommands::Show(show_cmd) => show_cmd.execute(),
        }
    }
}

impl ShowCommand {
    /// Executes the show command.
    pub fn execute(self) -> Result<()> {
        let path = Settings::get_settings_path()?;
        let settings = Settings::load_from_path(&path)?;
        let exists = if path.exists() { "" } else { " (not found)" };
        println!("settings: {}{exists}", path.display());

        match resolve_credentials(&settings, None, None) {
            Ok(credentials) => {
                let kind = ProviderKind::from_id(&credentials.provider_id);
                let model = match (&credentials.model_id, kind) {
                    (Some(model), _) => model.clone(),
                    (None, Some(kind)) => ProviderFactory::descriptor(kind)?.default_model.clone(),
                    (None, None) => String::from("<unknown>"),
                };
                println!("provider: {}", credentials.provider_id);
                println!("model:    {model}");
                println!("api key:  {}", credentials.api_key);
                if let Some(base_url) = &credentials.base_url {
                    println!("base url: {base_url}");
                }
            }
            Err(ProviderError::Init(e)) => println!("provider: not ready ({e})"),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
