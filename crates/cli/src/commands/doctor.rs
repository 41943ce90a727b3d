//! `dvagent doctor` - Diagnose configuration and connectivity.

use dvagent_config::{AppConfig, TOKEN_ENV};
use dvagent_core::DataBackend;
use dvagent_dataverse::DataverseClient;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("dvagent doctor");
    println!("==============\n");

    let mut issues = 0;

    let path = super::config_path(config_path);
    if path.exists() {
        println!("  ok   Config file: {}", path.display());
    } else {
        println!("  warn No config file at {} (run `dvagent init`)", path.display());
        issues += 1;
    }

    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("  ok   Config valid");
            config
        }
        Err(e) => {
            println!("  FAIL {e}");
            return Err(e);
        }
    };

    issues += check_model(&config);
    issues += check_dataverse(&config).await;

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

fn check_model(config: &AppConfig) -> usize {
    let mut issues = 0;
    match &config.model.host {
        Some(host) => println!("  ok   Model gateway: {host} ({})", config.model.default_model),
        None => {
            println!("  FAIL model.host not set (config or DATABRICKS_HOST)");
            issues += 1;
        }
    }

    let env_token = std::env::var(TOKEN_ENV).is_ok_and(|t| !t.trim().is_empty());
    if env_token || config.model.service_token.is_some() {
        println!("  ok   Model credential available");
    } else {
        println!("  warn No {TOKEN_ENV} or service_token; requests need X-Forwarded-Access-Token");
        issues += 1;
    }
    issues
}

async fn check_dataverse(config: &AppConfig) -> usize {
    let client = match DataverseClient::from_config(&config.dataverse) {
        Ok(client) => client,
        Err(e) => {
            println!("  FAIL {e}");
            return 1;
        }
    };

    println!("  ok   Dataverse API: {}", client.api_base());
    match client.list_tables(None, 1).await {
        Ok(tables) => {
            let first = tables.first().map(|t| t.logical_name.as_str()).unwrap_or("(none)");
            println!("  ok   Dataverse connectivity (first table: {first})");
            0
        }
        Err(e) => {
            println!("  FAIL Dataverse connectivity: {e}");
            1
        }
    }
}
