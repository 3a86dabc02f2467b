//! Asset Catalog CLI
//!
//! Command-line interface for browsing and searching an asset catalog.

use ac_client::CatalogClient;
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::query::SearchArgs;
use commands::{cmd_config, cmd_get, cmd_identity, cmd_search, cmd_types, OutputFormat};
use config::AppConfig;

#[derive(Parser)]
#[command(name = "asset-catalog")]
#[command(author = "Asset Catalog Client Team")]
#[command(version)]
#[command(about = "Browse and search an asset catalog over its REST API", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Catalog base URL, overriding the config file
    #[arg(long, env = "ASSET_CATALOG_URL")]
    base_url: Option<String>,

    /// Catalog user, overriding the config file
    #[arg(long, env = "ASSET_CATALOG_USER")]
    username: Option<String>,

    /// Catalog password, overriding the config file
    #[arg(long, env = "ASSET_CATALOG_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the asset types known to the catalog
    Types,

    /// Show an asset by id
    Get {
        /// Asset id
        id: String,

        /// Fetch every page of every relationship
        #[arg(long)]
        expand: bool,
    },

    /// Search for assets
    Search {
        /// Asset types to search (repeatable)
        #[arg(short = 't', long = "type", required = true)]
        types: Vec<String>,

        /// Criterion: prop=value, prop!=value, prop~value, prop? or prop!?
        #[arg(short = 'w', long = "where")]
        criteria: Vec<String>,

        /// Match any criterion instead of all of them
        #[arg(long)]
        any: bool,

        /// Properties to include in results (repeatable)
        #[arg(short, long = "property")]
        properties: Vec<String>,

        /// Property to sort by
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,

        /// Results per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Offset of the first result
        #[arg(long)]
        begin: Option<u32>,

        /// Include unpublished draft assets
        #[arg(long)]
        drafts: bool,

        /// Fetch every page
        #[arg(long)]
        all: bool,
    },

    /// Print the identity path of an asset
    Identity {
        /// Asset id
        id: String,
    },

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.catalog.base_url = base_url;
    }
    if let Some(username) = cli.username {
        config.catalog.username = username;
    }
    if let Some(password) = cli.password {
        config.catalog.password = password;
    }

    if let Err(e) = ac_observability::init_logging_with_config(
        config.logging.to_observability(cli.verbose),
    ) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match cli.command {
        Commands::Config { show_secrets } => cmd_config(&config, show_secrets, cli.format),
        command => {
            let client = CatalogClient::connect(config.catalog.to_client_config()?)
                .await
                .context("Failed to connect to the catalog")?;
            run(&client, command, cli.format).await
        }
    }
}

async fn run(client: &CatalogClient, command: Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Types => cmd_types(client, format).await,
        Commands::Get { id, expand } => cmd_get(client, &id, expand, format).await,
        Commands::Search {
            types,
            criteria,
            any,
            properties,
            sort,
            desc,
            page_size,
            begin,
            drafts,
            all,
        } => {
            let args = SearchArgs {
                types,
                criteria,
                match_any: any,
                properties,
                sort,
                descending: desc,
                page_size,
                begin,
                drafts,
            };
            cmd_search(client, &args, all, format).await
        }
        Commands::Identity { id } => cmd_identity(client, &id, format).await,
        Commands::Config { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from([
            "asset-catalog",
            "-vv",
            "--format",
            "json",
            "search",
            "-t",
            "term",
            "-t",
            "category",
            "-w",
            "name~Customer",
            "--all",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Search {
                types,
                criteria,
                all,
                ..
            } => {
                assert_eq!(types, vec!["term", "category"]);
                assert_eq!(criteria, vec!["name~Customer"]);
                assert!(all);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_search_requires_type() {
        assert!(Cli::try_parse_from(["asset-catalog", "search", "-w", "name=x"]).is_err());
    }
}
