//! Interactive session with runtime provider switching.

use std::future::Future;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::warn;

use crate::ai::{ImagePayload, ProviderFactory, ProviderSession, SessionEvent};
use crate::utils::{resolve_credentials, Settings};

const HELP: &str = "Commands:
  solve <path>                     explain the screenshot at <path>
  use <provider> [model] [api-key] switch provider (key defaults to the environment)
  status                           show the active provider
  providers                        list supported providers
  help                             show this help
  quit                             exit";

/// Interactive session with runtime provider switching.
#[derive(Parser)]
pub struct ReplCommand {
    /// Provider to bind at startup (overrides SNAPSOLVE_PROVIDER).
    #[arg(long)]
    pub provider: Option<String>,

    /// Model to bind at startup.
    #[arg(long)]
    pub model: Option<String>,
}

/// A parsed REPL line.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplLine {
    /// Solve a screenshot.
    Solve(PathBuf),
    /// Switch provider.
    Use {
        /// Provider identifier.
        provider: String,
        /// Optional model.
        model: Option<String>,
        /// Optional API key typed by the user.
        api_key: Option<String>,
    },
    /// Show the active provider.
    Status,
    /// List providers.
    Providers,
    /// Show help.
    Help,
    /// Exit.
    Quit,
    /// Blank line.
    Empty,
}

/// Parses one line of REPL input.
pub fn parse_line(line: &str) -> Result<ReplLine, String> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "" => Ok(ReplLine::Empty),
        "solve" if rest.is_empty() => Err("usage: solve <path>".to_string()),
        "solve" => Ok(ReplLine::Solve(PathBuf::from(rest))),
        "use" => {
            let mut args = rest.split_whitespace();
            let provider = args
                .next()
                .ok_or_else(|| "usage: use <provider> [model] [api-key]".to_string())?;
            let model = args.next().map(String::from);
            let api_key = args.next().map(String::from);
            if args.next().is_some() {
                return Err("usage: use <provider> [model] [api-key]".to_string());
            }
            Ok(ReplLine::Use {
                provider: provider.to_string(),
                model,
                api_key,
            })
        }
        "status" => Ok(ReplLine::Status),
        "providers" => Ok(ReplLine::Providers),
        "help" | "?" => Ok(ReplLine::Help),
        "quit" | "exit" => Ok(ReplLine::Quit),
        other => Err(format!("unknown command '{other}', type 'help'")),
    }
}

impl ReplCommand {
    /// Executes the REPL.
    pub async fn execute(self) -> Result<()> {
        let settings = Settings::load()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ProviderSession::with_events(tx);
        let printer = tokio::spawn(print_events(rx));

        match resolve_credentials(&settings, self.provider.as_deref(), self.model.as_deref()) {
            Ok(credentials) => {
                // Failure is reported through the event channel; the session
                // stays unbound until the user picks a working provider.
                let _ = session.switch_provider(credentials);
            }
            Err(e) => {
                warn!("No provider configured at startup: {e}");
                eprintln!("No provider configured: {e}");
            }
        }
        eprintln!("{HELP}");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = next_line(&mut lines, super::solve::interrupted()).await? {
            match parse_line(&line) {
                Ok(ReplLine::Quit) => break,
                Ok(command) => run_line(&session, &settings, command).await,
                Err(message) => eprintln!("{message}"),
            }
        }

        drop(session);
        let _ = printer.await;
        Ok(())
    }
}

/// Reads the next line, or `None` at end of input or when `interrupt`
/// resolves first.
///
/// Solving installs a Ctrl+C handler for the rest of the process, so the
/// prompt has to listen for it too.
async fn next_line<R, C>(lines: &mut Lines<R>, interrupt: C) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    C: Future<Output = ()>,
{
    tokio::select! {
        biased;
        () = interrupt => {
            eprintln!();
            Ok(None)
        }
        line = lines.next_line() => Ok(line?),
    }
}

async fn run_line(session: &ProviderSession, settings: &Settings, command: ReplLine) {
    match command {
        ReplLine::Solve(path) => {
            // Outcome is printed by the event printer.
            let _ = session
                .solve_with_cancel(&ImagePayload::Path(path), super::solve::interrupted())
                .await;
        }
        ReplLine::Use {
            provider,
            model,
            api_key,
        } => {
            let credentials = match api_key {
                Some(key) => Ok(crate::ai::ProviderCredentials::new(provider, key, model)),
                None => resolve_credentials(settings, Some(&provider), model.as_deref()),
            };
            match credentials {
                Ok(credentials) => {
                    let _ = session.switch_provider(credentials);
                }
                Err(e) => eprintln!("Error: {e}"),
            }
        }
        ReplLine::Status => match session.current() {
            Some(binding) => eprintln!(
                "Active provider: {} (model: {})",
                binding.provider_id(),
                binding.model()
            ),
            None => eprintln!("No active provider"),
        },
        ReplLine::Providers => {
            for provider in ProviderFactory::list_supported_providers() {
                eprintln!(
                    "{} ({}): {}",
                    provider.id,
                    provider.display_name,
                    provider.supported_models.join(", ")
                );
            }
        }
        ReplLine::Help => eprintln!("{HELP}"),
        ReplLine::Quit | ReplLine::Empty => {}
    }
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::Processing(true) => eprintln!("Processing..."),
            SessionEvent::Processing(false) => {}
            SessionEvent::Solution(text) => println!("{text}\n"),
            SessionEvent::Error(message) => eprintln!("Error: {message}"),
            SessionEvent::ProviderChanged { provider, model } => {
                eprintln!("Active provider: {provider} (model: {model})")
            }
        }
    }
}
