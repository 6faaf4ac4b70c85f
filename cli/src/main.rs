//! `modelcall`: parse, complete and run `Provider.Model.Method("query")`
//! commands from the shell.
//!
//! ## Commands
//!
//! - `modelcall check "<command>"`
//! - `modelcall complete "<text>" [--cursor N] [--catalog FILE] [--json]`
//! - `modelcall models`
//! - `modelcall run "<command>"`
//!
//! ## Exit Codes
//! - 0: Success
//! - 1: Execution or backend failure
//! - 2: Invalid command text

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use modelcall_core::Completer;
use modelcall_core::HandlerRegistry;
use modelcall_core::config_loader::ConfigLoader;
use modelcall_core::config_loader::ModelcallConfig;
use modelcall_gemini::GeminiClient;
use modelcall_gemini::GeminiConfig;
use owo_colors::OwoColorize;

mod check_cmd;
mod complete_cmd;
mod models_cmd;
mod run_cmd;

/// Exit code for text that is not a valid command.
pub(crate) const EXIT_INVALID: i32 = 2;
/// Exit code for a valid command the backend could not serve.
pub(crate) const EXIT_FAILED: i32 = 1;

#[derive(Debug, Parser)]
#[command(
    name = "modelcall",
    version,
    about = "Call provider models with Provider.Model.Method(\"query\")"
)]
struct Cli {
    /// Config file to use instead of `$MODELCALL_HOME/config.toml`.
    #[arg(long = "config", global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a command and print it as JSON without running it.
    Check(check_cmd::CheckArgs),
    /// Show completions for partially typed text.
    Complete(complete_cmd::CompleteArgs),
    /// List the provider's models and their methods.
    Models(models_cmd::ModelsArgs),
    /// Parse and execute a command.
    Run(run_cmd::RunArgs),
}

/// Backend wiring shared by the subcommands.
pub(crate) struct Backend {
    pub config: ModelcallConfig,
    pub client: Arc<GeminiClient>,
    pub registry: HandlerRegistry,
}

impl Backend {
    fn connect(config: ModelcallConfig) -> anyhow::Result<Self> {
        if config.provider != modelcall_gemini::PROVIDER {
            anyhow::bail!("no backend available for provider '{}'", config.provider);
        }
        let client = Arc::new(
            GeminiClient::new(GeminiConfig::from(&config)).context("Failed to build HTTP client")?,
        );
        let mut registry = HandlerRegistry::new();
        modelcall_gemini::register(&mut registry, Arc::clone(&client));
        tracing::debug!(methods = ?registry.methods(&config.provider), "registered handlers");
        Ok(Self {
            config,
            client,
            registry,
        })
    }

    pub fn completer(&self) -> Completer {
        Completer::new(self.registry.providers())
    }

    pub fn has_api_key(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
    }
}

/// Print an error line to stderr, highlighted when stderr is a terminal.
pub(crate) fn report_error(message: &str) {
    if std::io::stderr().is_terminal() {
        eprintln!("{}", message.red().bold());
    } else {
        eprintln!("{message}");
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<ModelcallConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = path {
        loader = loader.with_config_file(path);
    }
    loader.load().context("Failed to load configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    // `check` is parse only and never needs config or a backend.
    let code = match cli.command {
        Command::Check(args) => check_cmd::run(args)?,
        Command::Complete(args) => {
            let backend = Backend::connect(load_config(cli.config)?)?;
            complete_cmd::run(&backend, args).await?
        }
        Command::Models(args) => {
            let backend = Backend::connect(load_config(cli.config)?)?;
            models_cmd::run(&backend, args).await?
        }
        Command::Run(args) => {
            let backend = Backend::connect(load_config(cli.config)?)?;
            run_cmd::run(&backend, args).await?
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
