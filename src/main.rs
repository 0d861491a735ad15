use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pasty_core::NetworkField;
use pasty_server::ServerConfig;
use pasty_store::{Database, PasteRepo};
use pasty_telemetry::{LogFormat, TelemetryConfig};
use tracing::Level;

/// Shared clipboard server: every device on the same network sees the same pastes.
#[derive(Debug, Parser)]
#[command(name = "pasty", version)]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to bind (0 picks a free port).
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// SQLite database file.
    #[arg(long, env = "DB_FILE", default_value = "pastytext.db")]
    db_file: PathBuf,

    /// Directory holding the web client.
    #[arg(long, default_value = "web")]
    web_dir: PathBuf,

    /// Do not serve the web client.
    #[arg(long)]
    no_web: bool,

    /// Leave the `network` field out of snapshots.
    #[arg(long)]
    hide_network: bool,

    /// Default log level; RUST_LOG overrides it.
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Log output: json or pretty.
    #[arg(long, default_value = "json")]
    log_format: LogFormat,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            web_dir: (!self.no_web).then(|| self.web_dir.clone()),
            network_field: if self.hide_network {
                NetworkField::Omit
            } else {
                NetworkField::Include
            },
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    pasty_telemetry::init_telemetry(&TelemetryConfig {
        log_level: cli.log_level,
        format: cli.log_format,
        ..TelemetryConfig::default()
    })
    .context("failed to initialize logging")?;

    let db = Database::open(&cli.db_file)
        .with_context(|| format!("failed to open database {}", cli.db_file.display()))?;
    let store = Arc::new(PasteRepo::new(db));

    let handle = pasty_server::start(cli.server_config(), store)
        .await
        .context("failed to start server")?;
    tracing::info!(addr = %handle.local_addr(), "pasty ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_server_defaults() {
        let cli = Cli::try_parse_from(["pasty"]).unwrap();
        let config = cli.server_config();
        let defaults = ServerConfig::default();
        assert_eq!(config.host, defaults.host);
        assert_eq!(config.port, defaults.port);
        assert_eq!(config.web_dir, defaults.web_dir);
        assert_eq!(config.network_field, NetworkField::Include);
        assert_eq!(cli.log_level, Level::INFO);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "pasty",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--db-file",
            "/tmp/clip.db",
            "--no-web",
            "--hide-network",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
        ])
        .unwrap();
        let config = cli.server_config();
        assert_eq!(config.host.to_string(), "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.web_dir, None);
        assert_eq!(config.network_field, NetworkField::Omit);
        assert_eq!(cli.db_file, PathBuf::from("/tmp/clip.db"));
        assert_eq!(cli.log_level, Level::DEBUG);
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
