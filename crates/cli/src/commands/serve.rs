//! `dvagent serve` - Start the HTTP API server.

use std::path::Path;

pub async fn run(config_path: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("dvagent gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.model.default_model);
    if !config.dataverse.is_complete() {
        println!("   Dataverse: not configured ({})", config.dataverse.missing_fields().join(", "));
    }

    dvagent_gateway::start(config).await?;

    Ok(())
}
