//! # swaphook
//!
//! Server binary: loads the environment, settings, and credentials, then
//! serves the webhook and WebSocket endpoints until ctrl-c.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use swaphook_core::logging::init_subscriber;
use swaphook_crypto::DecryptionKeyMaterial;
use swaphook_server::{ServerConfig, SwaphookServer};
use swaphook_settings::{Credentials, SwaphookSettings};

/// Face-swap webhook relay server.
#[derive(Parser, Debug)]
#[command(name = "swaphook", about = "Face-swap webhook relay server")]
struct Cli {
    /// Settings file (defaults to `~/.swaphook/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Dotenv file to load instead of `./.env`.
    #[arg(long)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print an encrypted webhook body sealed with the configured credentials.
    Seal {
        /// Upstream status code to embed.
        #[arg(long)]
        status: i64,

        /// JSON object merged into the payload.
        #[arg(long)]
        extra: Option<String>,
    },
}

/// Load a dotenv file into the process environment.
///
/// An explicit `--env-file` must exist. The default `./.env` is optional.
fn load_env(env_file: Option<&Path>) -> Result<Option<PathBuf>> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file: {}", path.display()))?;
            Ok(Some(path.to_path_buf()))
        }
        None => Ok(dotenvy::dotenv().ok()),
    }
}

/// Settings file and `SWAPHOOK_*` overrides, then CLI flags on top.
fn resolve_settings(cli: &Cli) -> Result<SwaphookSettings> {
    let path = cli
        .settings
        .clone()
        .unwrap_or_else(swaphook_settings::settings_path);
    let mut settings = swaphook_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings: {}", path.display()))?;
    apply_cli_overrides(&mut settings, cli);
    Ok(settings)
}

fn apply_cli_overrides(settings: &mut SwaphookSettings, cli: &Cli) {
    if let Some(ref host) = cli.host {
        settings.server.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
}

/// Build `{"dataEncrypt": ...}` for a payload carrying `status`.
fn seal_body(status: i64, extra: Option<&str>, keys: &DecryptionKeyMaterial) -> Result<Value> {
    let mut payload = match extra {
        Some(raw) => serde_json::from_str(raw).context("--extra is not valid JSON")?,
        None => json!({}),
    };
    let Value::Object(fields) = &mut payload else {
        bail!("--extra must be a JSON object");
    };
    let _ = fields.insert("status".to_string(), json!(status));

    Ok(json!({ "dataEncrypt": swaphook_crypto::encrypt(&payload.to_string(), keys) }))
}

async fn serve(settings: &SwaphookSettings, keys: DecryptionKeyMaterial) -> Result<()> {
    let metrics = swaphook_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let config = ServerConfig::from(&settings.server);
    let shutdown_timeout = config.shutdown_timeout();
    let key_bits = keys.key_bits();
    let server = SwaphookServer::new(config, keys, metrics);

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(key_bits, "swaphook listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let _ = server.shutdown().graceful_shutdown(shutdown_timeout).await;
    let _ = handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Environment first: settings overrides and credentials both read it.
    let env_file = load_env(cli.env_file.as_deref())?;
    let settings = resolve_settings(&cli)?;
    init_subscriber(&settings.logging.level, settings.logging.format);
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }

    let credentials = Credentials::from_env().context("Failed to read credentials")?;
    let keys = credentials
        .key_material()
        .context("Failed to build decryption key")?;

    match cli.command {
        Some(Command::Seal { status, extra }) => {
            let body = seal_body(status, extra.as_deref(), &keys)?;
            println!("{body}");
            Ok(())
        }
        None => serve(&settings, keys).await,
    }
}
