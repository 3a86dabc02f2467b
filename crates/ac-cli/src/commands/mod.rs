//! CLI command implementations.

pub mod query;

use crate::config::AppConfig;
use ac_client::{CatalogClient, CatalogObject, ReferenceList};
use ac_observability::{asset_span, command_span};
use anyhow::{Context, Result};
use colored::Colorize;
use query::{build_query, SearchArgs};
use serde_json::json;
use tracing::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_object(object: &CatalogObject) {
    let reference = object.reference();
    println!("{}", reference.name.bold());
    println!("  Type: {}", reference.asset_type.cyan());
    println!("  Id:   {}", reference.id);

    let Some(asset) = object.as_asset() else {
        println!("  {}", "(unregistered type, reference only)".dimmed());
        return;
    };
    if let Some(chain) = asset.context() {
        let path: Vec<&str> = chain.iter().map(|r| r.name.as_str()).collect();
        if !path.is_empty() {
            println!("  Context: {}", path.join(" >> "));
        }
    }
    if let Some(description) = asset.short_description() {
        println!("  Description: {}", description);
    }
    if let Some(modified_by) = asset.modified_by() {
        match asset.modified_on() {
            Some(on) => println!("  Modified: {} by {}", on.to_rfc3339(), modified_by),
            None => println!("  Modified by: {}", modified_by),
        }
    }
    for name in asset.relationship_names() {
        if let Some(list) = asset.relationship(&name) {
            print_relationship(&name, list);
        }
    }
}

fn print_relationship(name: &str, list: &ReferenceList) {
    let more = if list.has_more_pages() {
        format!(" (of {})", list.paging.num_total).yellow().to_string()
    } else {
        String::new()
    };
    println!("  {}: {}{}", name.bold(), list.len(), more);
    for reference in list.references() {
        println!("    - {} [{}]", reference.name, reference.asset_type);
    }
}

fn print_results(results: &ReferenceList) {
    println!(
        "{} {}",
        results.len().to_string().green().bold(),
        format!("of {} results", results.paging.num_total).bold()
    );
    println!("─────────────────────");
    for reference in results.references() {
        println!(
            "{:<30} {:<24} {}",
            reference.name,
            reference.asset_type.cyan(),
            reference.id
        );
    }
    if results.has_more_pages() {
        println!();
        println!("{}", "More pages available (use --all to fetch them)".yellow());
    }
}

/// Lists the asset types the catalog knows.
pub async fn cmd_types(client: &CatalogClient, format: OutputFormat) -> Result<()> {
    let types = client
        .list_types()
        .instrument(command_span!("types"))
        .await
        .context("Failed to list types")?;

    if format == OutputFormat::Json {
        return print_json(&types);
    }

    println!("{}", "Asset Types".bold());
    println!("─────────────────────");
    for summary in &types {
        let marker = if client.registry().is_registered(&summary.id) {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        println!("{} {:<40} {}", marker, summary.id, summary.name);
    }
    println!();
    println!("{} types ({} marked as decoded)", types.len(), "*".green());
    Ok(())
}

/// Shows one asset, optionally with every relationship page drained.
pub async fn cmd_get(
    client: &CatalogClient,
    id: &str,
    expand: bool,
    format: OutputFormat,
) -> Result<()> {
    let object = async {
        if expand {
            client.get_full_asset_details(id).await
        } else {
            client.get_asset_by_id(id).await
        }
    }
    .instrument(asset_span!(id))
    .instrument(command_span!("get", expand))
    .await
    .with_context(|| format!("Failed to fetch asset {}", id))?;

    if format == OutputFormat::Json {
        return print_json(&object);
    }
    print_object(&object);
    Ok(())
}

/// Runs a search, one page or all of them.
pub async fn cmd_search(
    client: &CatalogClient,
    args: &SearchArgs,
    all: bool,
    format: OutputFormat,
) -> Result<()> {
    let query = build_query(args)?;
    let span = command_span!("search", query = %query.describe(), all);
    let results = async {
        if all {
            client.search_all(&query).await
        } else {
            client.search(&query).await
        }
    }
    .instrument(span)
    .await
    .context("Search failed")?;

    if format == OutputFormat::Json {
        return print_json(&results);
    }
    print_results(&results);
    Ok(())
}

/// Prints the identity path of an asset.
pub async fn cmd_identity(client: &CatalogClient, id: &str, format: OutputFormat) -> Result<()> {
    let identity = async {
        let mut asset = client.get_asset_by_id(id).await?.into_asset();
        client.identity_of(&mut asset).await
    }
    .instrument(asset_span!(id))
    .instrument(command_span!("identity"))
    .await
    .with_context(|| format!("Failed to resolve identity of {}", id))?;

    if format == OutputFormat::Json {
        let segments: Vec<_> = identity
            .segments()
            .iter()
            .map(|(asset_type, name)| json!({"type": asset_type, "name": name}))
            .collect();
        return print_json(&json!({
            "identity": identity.as_str(),
            "segments": segments,
        }));
    }
    println!("{}", identity.as_str());
    Ok(())
}

/// Shows the effective configuration.
pub fn cmd_config(config: &AppConfig, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let display = if show_secrets {
        config.clone()
    } else {
        config.redact_secrets()
    };

    if format == OutputFormat::Json {
        return print_json(&display);
    }

    let catalog = &display.catalog;
    println!("{}", "Current Configuration".bold());
    println!("─────────────────────────");
    let base_url = if catalog.base_url.is_empty() {
        "(not set)".red().to_string()
    } else {
        catalog.base_url.clone()
    };
    println!("Base URL: {}", base_url);
    println!("Username: {}", catalog.username);
    println!("Password: {}", catalog.password);
    if !catalog.encoded_auth.is_empty() {
        println!("Encoded auth: {}", catalog.encoded_auth);
    }
    println!("Timeout: {}s", catalog.timeout_secs);
    println!("Verify TLS: {}", catalog.verify_tls);
    if let Some(rate_limit) = &catalog.rate_limit {
        println!(
            "Rate limit: {} requests / {}s (burst {})",
            rate_limit.max_requests, rate_limit.period_secs, rate_limit.burst_size
        );
    }
    println!("Log level: {}", display.logging.level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
