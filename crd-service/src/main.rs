mod auth;
mod cache;
mod config;
mod error;
mod export;
mod registry;
mod routes;
mod server;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::{AppConfig, LogFormat};
use registry::HostedRegistry;

#[derive(Parser)]
#[command(name = "crd-service", about = "Client Reports Dashboard service", version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash an admin password for `auth.admin_password_hash`
    HashPassword {
        /// The password to hash
        password: String,
    },
    /// Generate a fresh JWT signing key for `auth.jwt_signing_key`
    GenerateJwtKey,
    /// Load the configuration and report whether it is usable
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::HashPassword { password }) => {
            println!("{}", auth::password::hash_password(&password));
        }
        Some(Commands::GenerateJwtKey) => {
            let mut key = [0u8; 32];
            rand::fill(&mut key);
            println!("{}", BASE64.encode(key));
        }
        Some(Commands::CheckConfig) => {
            let result = AppConfig::load(cli.config).and_then(|c| c.validate());
            match result {
                Ok(()) => println!("configuration ok"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            print_banner();

            let config = match AppConfig::load(cli.config).and_then(|c| {
                c.validate()?;
                Ok(c)
            }) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: {e}");
                    eprintln!();
                    eprintln!("The dashboard cannot start without backend and admin credentials.");
                    eprintln!("See `crd-service hash-password` and `crd-service generate-jwt-key`");
                    eprintln!("for producing the auth settings, or specify a config file:");
                    eprintln!("  crd-service --config <path>");
                    std::process::exit(1);
                }
            };

            init_tracing(&config);

            let store = match store::Store::open(&config.store) {
                Ok(store) => store,
                Err(e) => {
                    eprintln!("Error: failed to open store: {e}");
                    std::process::exit(1);
                }
            };
            let registry = match HostedRegistry::new(&config.registry) {
                Ok(registry) => Arc::new(registry),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            };

            if let Err(e) = server::run(config, store, registry).await {
                tracing::error!("server error: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn print_banner() {
    let teal = "\x1b[36m";
    let yellow = "\x1b[33m";
    let dim = "\x1b[2m";
    let reset = "\x1b[0m";

    eprintln!(
        r#"
{teal}  ██████╗{yellow}██████╗ {teal}██████╗ {reset}
{teal} ██╔════╝{yellow}██╔══██╗{teal}██╔══██╗{reset}
{teal} ██║     {yellow}██████╔╝{teal}██║  ██║{reset}
{teal} ██║     {yellow}██╔══██╗{teal}██║  ██║{reset}
{teal} ╚██████╗{yellow}██║  ██║{teal}██████╔╝{reset}
{teal}  ╚═════╝{yellow}╚═╝  ╚═╝{teal}╚═════╝ {reset}
{dim}  Client Reports Dashboard v{version}{reset}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn init_tracing(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match config.log.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}
