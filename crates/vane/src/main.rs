use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use vane_core::Registry;
use vane_runtime::VaneRuntime;

/// A plugin-driven telemetry agent.
#[derive(Debug, Parser)]
#[command(name = "vane", version, about)]
struct Cli {
    /// Configuration file. Searched as vane.toml when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Configuration profile (development, production or a custom name).
    #[arg(short, long, env = "VANE_PROFILE")]
    profile: Option<String>,

    /// Listen address for the control API, overriding the configuration.
    #[arg(long, value_name = "HOST:PORT")]
    api_listen: Option<String>,

    /// Print the plugin catalog as JSON and exit.
    #[arg(long)]
    list_plugins: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vane_plugins::link();
    let cli = Cli::parse();

    if cli.list_plugins {
        let registry = Registry::collect_all();
        let catalog = serde_json::to_string_pretty(registry.catalog())
            .context("failed to encode plugin catalog")?;
        println!("{catalog}");
        return Ok(());
    }

    let mut builder = VaneRuntime::builder();
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }
    if let Some(listen) = cli.api_listen {
        builder = builder.api_listen(listen);
    }

    let runtime = builder.build().context("failed to load configuration")?;
    runtime.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from(["vane", "-c", "agent.toml", "--api-listen", "0.0.0.0:9000"]);
        assert_eq!(cli.config, Some(PathBuf::from("agent.toml")));
        assert_eq!(cli.api_listen.as_deref(), Some("0.0.0.0:9000"));
        assert!(!cli.list_plugins);
    }
}
