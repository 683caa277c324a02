//! EFRIS command-line client
//!
//! Sends envelopes to the fiscal receipting service from a shell.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use efris_client::config::{default_config_path, Config};
use efris_client::efris_protocol::{Expected, InterfaceCode, Payload};
use efris_client::{EfrisClient, Reply};
use tracing_subscriber::EnvFilter;

/// EFRIS client - signed, encrypted calls to the invoicing service.
#[derive(Parser, Debug)]
#[command(name = "efris")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a key exchange and report the session key size
    KeyExchange,

    /// Send a JSON payload to any interface
    Send {
        /// Interface code, e.g. T130
        interface: String,

        /// JSON file holding the payload (empty content when omitted)
        #[arg(long, short, value_name = "FILE")]
        payload: Option<PathBuf>,

        /// Send base64 plaintext instead of encrypting
        #[arg(long)]
        plain: bool,

        /// Expected response shape: array, record or text
        #[arg(long, short, default_value = "record")]
        expect: Expected,
    },

    /// Fetch an invoice by number (T108)
    Invoice {
        /// Invoice number
        invoice_no: String,
    },

    /// Look up a taxpayer (T119)
    Tin {
        /// Taxpayer identification number
        tin: String,
    },

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides();

    // Initialize tracing
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Using config file: {:?}", config_path);

    match cli.command {
        Commands::Config(ConfigCommands::Show) => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Config(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::default().save(&config_path)?;
            println!("Wrote default configuration to {}", config_path.display());
            Ok(())
        }
        command => {
            config.validate()?;
            let client = EfrisClient::from_config(&config)?;
            run(&client, command).await
        }
    }
}

async fn run(client: &EfrisClient, command: Commands) -> anyhow::Result<()> {
    let reply = match command {
        Commands::KeyExchange => {
            let key = client.obtain_key().await?;
            println!("Session key: {} bits ({})", key.bits(), key.fingerprint());
            return Ok(());
        }
        Commands::Send {
            interface,
            payload,
            plain,
            expect,
        } => {
            let body = match payload {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read payload: {}", path.display()))?;
                    serde_json::from_str::<serde_json::Value>(&text)
                        .with_context(|| format!("Payload is not JSON: {}", path.display()))?
                }
                None => serde_json::Value::Null,
            };
            let interface = InterfaceCode::from(interface.as_str());
            client.send(&body, interface, expect, !plain).await?
        }
        Commands::Invoice { invoice_no } => client.retrieve_invoice(&invoice_no).await?,
        Commands::Tin { tin } => client.tin_info(&tin).await?,
        Commands::Config(_) => anyhow::bail!("config commands do not contact the service"),
    };

    print_reply(&reply)
}

fn print_reply(reply: &Reply) -> anyhow::Result<()> {
    let state = reply.return_state();
    eprintln!("[{}] {}", state.return_code, state.return_message);

    match reply.payload() {
        Payload::Empty => {}
        Payload::Text(text) => println!("{}", text),
        Payload::SessionKey(key) => println!("Session key: {} bits", key.bits()),
        payload => {
            if let Some(value) = payload.to_json() {
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
        }
    }

    if !reply.is_success() {
        std::process::exit(2);
    }
    Ok(())
}
