use clap::{Parser, Subcommand};
use colored::*;
use std::time::Duration;

mod api;
mod config;
mod convert;
mod errors;
mod models;
mod preferences;
mod surface;
mod template;

use crate::api::sentry::{IssuePage, SentryClient};
use crate::api::versionone::VersionOneClient;
use crate::config::fields::{parse_max_name_length, Field};
use crate::config::settings::{mask_secret, Settings};
use crate::convert::{Converter, Settled};
use crate::errors::BridgeError;
use crate::models::asset::AssetOption;
use crate::surface::{SystemBrowser, TerminalNotifier};

#[derive(Parser)]
#[command(name = "sentry2v1")]
#[command(version = "0.1.0")]
#[command(about = "Create a VersionOne defect from a Sentry issue", long_about = None)]
struct Cli {
    /// for debugging purposes
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick the VersionOne instance, assets and templates
    Preferences,

    /// Convert a Sentry issue into a VersionOne defect
    Convert {
        /// Issue details page (e.g., https://sentry.example.com/organizations/acme/issues/482/)
        issue_url: String,

        /// Print the defect and issue links instead of opening them
        #[arg(long)]
        no_open: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Display current configuration (with masked secrets)
    Show,

    /// Set a specific configuration value
    Set {
        /// Configuration key (e.g., preferences.max_name_length, sentry.session_cookie)
        key: String,
        /// New value
        value: String,
    },

    /// Get the path to the config file
    Path,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    println!("{}", "sentry2v1 v0.1.0".bright_cyan().bold());
    println!();

    let result = match cli.command {
        Commands::Preferences => handle_preferences().await,

        Commands::Convert { issue_url, no_open } => handle_convert(&issue_url, no_open).await,

        Commands::Config { action } => handle_config(action),
    };

    if let Err(e) = result {
        eprintln!("\n{}", e);
        std::process::exit(1);
    }

    println!();
}

async fn handle_preferences() -> errors::Result<()> {
    let mut settings = Settings::load()?;
    preferences::run(&mut settings, &TerminalNotifier).await
}

async fn handle_convert(issue_url: &str, no_open: bool) -> errors::Result<()> {
    println!("{}", "Converting issue to a defect...".cyan().bold());
    println!();

    let settings = Settings::load()?;
    let page = IssuePage::parse(issue_url);
    let origin = page
        .as_ref()
        .map(|page| page.origin.clone())
        .unwrap_or_default();
    let timeout = Duration::from_millis(settings.http.timeout_ms);

    let sentry = SentryClient::new(
        &origin,
        settings.sentry.session_cookie.clone(),
        settings.sentry.auth_token.clone(),
    )
    .with_timeout(timeout);
    let versionone = VersionOneClient::new(
        settings.preferences.v1_base_url().unwrap_or_default().to_string(),
        settings.versionone.access_token.clone(),
    )
    .with_timeout(timeout);

    let converter = Converter {
        prefs: &settings.preferences,
        issues: &sentry,
        defects: &versionone,
        notifier: &TerminalNotifier,
        browser: &SystemBrowser {
            open_pages: !no_open,
        },
    };
    let conversion = converter.convert(page).await?;

    let linked = match &conversion.comment {
        Settled::Fulfilled(()) => "comment added".green(),
        Settled::Rejected(_) => "comment failed".yellow(),
    };
    let owner = match &conversion.owner {
        Settled::Fulfilled(user_id) => format!("assigned to user {}", user_id).green(),
        Settled::Rejected(_) => "assignment failed".yellow(),
    };

    println!();
    println!("{}", "Defect created!".green().bold());
    println!("  {} {}", "Issue:".bold(), conversion.issue_id.bright_white());
    println!("  {} {}", "Defect:".bold(), conversion.defect_oid.bright_white());
    println!("  {} {}", "URL:".bold(), conversion.defect_url.bright_cyan());
    println!("  {} {}, {}", "Sentry:".bold(), linked, owner);

    if !conversion.comment.is_fulfilled() || !conversion.owner.is_fulfilled() {
        println!();
        println!("{}", "  Link the issue by hand; see the warnings above".dimmed());
    }

    Ok(())
}

fn handle_config(action: ConfigAction) -> errors::Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = Settings::load()?;

            println!("{}", "Current Configuration".cyan().bold());
            println!();

            println!("{}", "[preferences]".bold());
            for field in Field::ALL {
                let value = match settings.preferences.get_raw_value(field) {
                    Some(raw) if field.is_asset() => match AssetOption::parse(raw) {
                        Some(option) => format!("{} ({})", option.name, option.oid).bright_white(),
                        None => raw.yellow(),
                    },
                    Some(raw) => first_line(raw).bright_white(),
                    None => "(not set)".red(),
                };
                println!("  {} {}", format!("{}:", field.key()).dimmed(), value);
            }

            println!();
            println!("{}", "[sentry]".bold());
            print_secret("session_cookie", settings.sentry.session_cookie.as_deref());
            print_secret("auth_token", settings.sentry.auth_token.as_deref());

            println!();
            println!("{}", "[versionone]".bold());
            print_secret("access_token", settings.versionone.access_token.as_deref());

            println!();
            println!("{}", "[http]".bold());
            println!(
                "  {} {}",
                "timeout_ms:".dimmed(),
                settings.http.timeout_ms.to_string().bright_white()
            );

            Ok(())
        }

        ConfigAction::Set { key, value } => {
            let mut settings = Settings::load()?;

            let Some((section, name)) = key.split_once('.') else {
                return Err(BridgeError::ConfigInvalid(
                    "Invalid key format. Use format: section.field (e.g., preferences.team)".to_string(),
                ));
            };

            match (section, name) {
                ("preferences", name) => {
                    let field = Field::from_key(name).ok_or_else(|| {
                        BridgeError::ConfigInvalid(format!("Unknown preference: {}", name))
                    })?;
                    if field == Field::MaxNameLength {
                        parse_max_name_length(&value)
                            .map_err(|e| BridgeError::ConfigInvalid(e.to_string()))?;
                    }
                    settings.preferences.set_value(field, value.clone());
                }
                ("sentry", "session_cookie") => settings.sentry.session_cookie = Some(value.clone()),
                ("sentry", "auth_token") => settings.sentry.auth_token = Some(value.clone()),
                ("versionone", "access_token") => {
                    settings.versionone.access_token = Some(value.clone())
                }
                ("http", "timeout_ms") => {
                    settings.http.timeout_ms = value.parse().map_err(|_| {
                        BridgeError::ConfigInvalid(format!("'{}' is not a number of milliseconds", value))
                    })?;
                }
                _ => {
                    return Err(BridgeError::ConfigInvalid(format!(
                        "Unknown configuration key: {}",
                        key
                    )))
                }
            }

            settings.save()?;

            println!("{}", format!("✓ Updated {}", key).green().bold());
            println!();
            println!("{}", "Configuration saved successfully!".green());

            Ok(())
        }

        ConfigAction::Path => {
            let config_path = Settings::config_path()?;
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

fn print_secret(name: &str, secret: Option<&str>) {
    let value = match secret {
        Some(secret) => mask_secret(secret).yellow(),
        None => "(not set)".dimmed(),
    };
    println!("  {} {}", format!("{}:", name).dimmed(), value);
}

fn first_line(value: &str) -> String {
    let mut lines = value.lines();
    let first = lines.next().unwrap_or_default();
    if lines.next().is_some() {
        format!("{} …", first)
    } else {
        first.to_string()
    }
}
