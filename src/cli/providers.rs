//! Provider catalog listing.

use anyhow::Result;
use clap::Parser;

use crate::ai::catalog::CATALOG_YAML;
use crate::ai::ProviderFactory;

/// Lists the supported providers and models.
#[derive(Parser)]
pub struct ProvidersCommand {
    /// Prints the catalog as JSON.
    #[arg(long, conflicts_with = "yaml")]
    pub json: bool,

    /// Prints the embedded catalog YAML.
    #[arg(long)]
    pub yaml: bool,
}

impl ProvidersCommand {
    /// Executes the providers command.
    pub fn execute(self) -> Result<()> {
        if self.yaml {
            println!("{CATALOG_YAML}");
            return Ok(());
        }

        let providers = ProviderFactory::list_supported_providers();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&providers)?);
            return Ok(());
        }

        for provider in providers {
            println!("{} ({})", provider.id, provider.display_name);
            for model in &provider.supported_models {
                let marker = if *model == provider.default_model {
                    " (default)"
                } else {
                    ""
                };
                println!("  {model}{marker}");
            }
        }
        Ok(())
    }
}
