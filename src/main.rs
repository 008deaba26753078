use anyhow::Result;
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use gwexport::directory::AdminDirectory;
use gwexport::policy::CloudIdentityPolicies;
use gwexport::sheets::GoogleSheets;
use gwexport::vault::{GcsClient, VaultClient};
use gwexport::{Config, oauth_token, policy, vault};

#[derive(Parser)]
#[command(name = "gwexport", version, about = "Workspace AI policy and Gemini conversation exporter")]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export Cloud Identity AI policy settings to the configured spreadsheet
    #[command(name = "policies")]
    Policies {
        /// Target spreadsheet (default from ~/.gwexport/config.toml)
        #[arg(long)]
        spreadsheet_id: Option<String>,
        /// Policy filter expression
        #[arg(long)]
        filter: Option<String>,
    },

    /// Export one user's Gemini conversations via a Vault export
    #[command(name = "conversations")]
    Conversations {
        /// Vault matter id (default from ~/.gwexport/config.toml)
        #[arg(long)]
        matter_id: Option<String>,
        /// Account whose conversations are exported
        #[arg(long)]
        target_user: Option<String>,
    },

    /// View or modify config (~/.gwexport/config.toml)
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current config
    Show,
    /// Set a config value
    Set {
        /// Key to set (spreadsheet_id, policy_filter, matter_id, target_user,
        /// xml_folder_id, sheets_folder_id, poll_interval_secs, poll_max_checks)
        key: String,
        /// Value to set
        value: String,
    },
    /// Reset config to defaults
    Reset,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Policies {
            spreadsheet_id,
            filter,
        } => {
            let mut config = Config::load()?;
            if let Some(id) = spreadsheet_id {
                config.spreadsheet_id = id;
            }
            if let Some(filter) = filter {
                config.policy_filter = filter;
            }
            let token = oauth_token()?;
            let directory = AdminDirectory::new(token.clone());
            let pages = CloudIdentityPolicies::new(token.clone());
            let sink = GoogleSheets::new(token);
            let summary = policy::run(&config, &directory, &pages, &sink)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Conversations {
            matter_id,
            target_user,
        } => {
            let mut config = Config::load()?;
            if let Some(id) = matter_id {
                config.matter_id = id;
            }
            if let Some(user) = target_user {
                config.target_user = user;
            }
            let token = oauth_token()?;
            let exports = VaultClient::new(token.clone());
            let blobs = GcsClient::new(token.clone());
            let sink = GoogleSheets::new(token);
            let summary = vault::run(&config, &exports, &blobs, &sink, |interval: Duration| {
                std::thread::sleep(interval)
            })?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Config { action } => {
            handle_config(action)?;
        }
    }
    Ok(())
}

fn handle_config(action: Option<ConfigAction>) -> Result<()> {
    match action {
        None | Some(ConfigAction::Show) => {
            let config = Config::load().unwrap_or_default();
            println!("spreadsheet_id = \"{}\"", config.spreadsheet_id);
            println!("policy_filter = \"{}\"", config.policy_filter);
            println!("matter_id = \"{}\"", config.matter_id);
            println!("target_user = \"{}\"", config.target_user);
            println!("xml_folder_id = \"{}\"", config.xml_folder_id);
            println!("sheets_folder_id = \"{}\"", config.sheets_folder_id);
            println!("poll_interval_secs = {}", config.poll_interval_secs);
            println!("poll_max_checks = {}", config.poll_max_checks);
        }
        Some(ConfigAction::Set { key, value }) => {
            let mut config = Config::load().unwrap_or_default();
            match key.as_str() {
                "spreadsheet_id" => config.spreadsheet_id = value,
                "policy_filter" | "filter" => config.policy_filter = value,
                "matter_id" => config.matter_id = value,
                "target_user" | "user" => config.target_user = value,
                "xml_folder_id" => config.xml_folder_id = value,
                "sheets_folder_id" => config.sheets_folder_id = value,
                "poll_interval_secs" => {
                    config.poll_interval_secs = value
                        .parse()
                        .map_err(|_| anyhow::anyhow!("invalid poll_interval_secs: {value}"))?;
                }
                "poll_max_checks" => {
                    config.poll_max_checks = value
                        .parse()
                        .map_err(|_| anyhow::anyhow!("invalid poll_max_checks: {value}"))?;
                }
                _ => {
                    anyhow::bail!("unknown config key: {key}");
                }
            }
            let path = config.save()?;
            println!("saved to {}", path.display());
        }
        Some(ConfigAction::Reset) => {
            let config = Config::default();
            let path = config.save()?;
            println!("reset to defaults at {}", path.display());
        }
    }
    Ok(())
}
