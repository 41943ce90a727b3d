//! `dvagent init` - Write a starter config file.

use dvagent_config::AppConfig;
use std::path::Path;

pub fn run(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = super::config_path(config_path);

    if path.exists() && !force {
        println!("Config already exists at: {}", path.display());
        println!("   Edit it manually or re-run with --force to overwrite.");
        return Ok(());
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;

    println!("Created config at: {}", path.display());
    println!("\nNext steps:");
    println!("   1. Set model.host (or DATABRICKS_HOST) and DATABRICKS_TOKEN");
    println!("   2. Fill in the [dataverse] section (or DATAVERSE_* variables)");
    println!("   3. Run: dvagent doctor");

    Ok(())
}
