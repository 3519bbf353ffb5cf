/*
[INPUT]:  Output path for a new configuration file
[OUTPUT]: Generated YAML configuration file with defaults
[POS]:    CLI initialization layer
[UPDATE]: When ServerConfig schema changes
*/

use anyhow::{Context, Result, bail};
use std::path::Path;

use littlefish_server::config::{PROJECT_ID_ENV, ServerConfig};

const HEADER: &str = "\
# Littlefish server configuration
#
# The indexer key may be set as indexer.project_id; the environment
# variable overrides it, and this generated file never contains it:
#   export BLOCKFROST_PROJECT_ID=mainnet...
# With no key, mode `demo` serves labelled demo balances and
# mode `production` answers indexer requests with 503.
";

/// Render the default configuration as commented YAML
pub fn default_config_yaml() -> Result<String> {
    let body = serde_yaml::to_string(&ServerConfig::default()).context("serialize config")?;
    Ok(format!("{HEADER}\n{body}"))
}

pub fn run_init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            output.display()
        );
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }

    std::fs::write(output, default_config_yaml()?)
        .with_context(|| format!("write {}", output.display()))?;

    println!("Configuration written to {}", output.display());
    println!("Set {PROJECT_ID_ENV} before switching indexer.mode to production.");
    println!(
        "Start the server with: littlefish-server --config {}",
        output.display()
    );
    Ok(())
}
