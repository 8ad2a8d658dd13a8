//! SmartBin live panel
//!
//! Connects to the event bus, mirrors the SmartBin entities and prints the
//! panel to the terminal whenever they change.
//!
//! Usage:
//!   SMARTBIN_TOKEN=... smartbin-panel --url http://homeassistant.local:8123

use std::sync::Arc;
use std::time::Duration;
use anyhow::{bail, Context, Result};
use clap::Parser;
use smartbin_panel::{BinPanelRenderer, TerminalPanel};
use smartbin_sync::{
    CredentialSource, EnvToken, LogSink, RenderScheduler, StaticToken, SyncConfig, SyncError,
    SyncSession, DEFAULT_URL,
};
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "smartbin-panel")]
#[command(about = "Live terminal panel for SmartBin inventories")]
struct Args {
    /// Event bus endpoint (ws://, wss://, or an http(s):// base URL)
    #[arg(short, long, env = "SMARTBIN_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Long-lived access token (falls back to SUPERVISOR_TOKEN)
    #[arg(long, env = "SMARTBIN_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Seconds to wait before reconnecting
    #[arg(long, default_value = "5")]
    reconnect_delay: u64,

    /// Seconds allowed for authentication, 0 to wait forever
    #[arg(long, default_value = "30")]
    handshake_timeout: u64,

    /// Render frame length in milliseconds
    #[arg(long, default_value = "16")]
    frame_ms: u64,

    /// History entries shown per bin
    #[arg(long, default_value = "3")]
    history: usize,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn sync_config(&self) -> Result<SyncConfig> {
        let url = if self.url.starts_with("http://") || self.url.starts_with("https://") {
            SyncConfig::endpoint_from_base(&self.url)
                .with_context(|| format!("Invalid base URL {}", self.url))?
        } else {
            self.url.clone()
        };

        let config = SyncConfig {
            url,
            reconnect_delay: Duration::from_secs(self.reconnect_delay),
            handshake_timeout: (self.handshake_timeout > 0)
                .then(|| Duration::from_secs(self.handshake_timeout)),
            frame_interval: Duration::from_millis(self.frame_ms),
            ..SyncConfig::default()
        };
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn credentials(&self) -> Arc<dyn CredentialSource> {
        match &self.token {
            Some(token) => Arc::new(StaticToken::new(token.clone())),
            None => Arc::new(EnvToken::standard()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    info!("SmartBin panel starting...");
    let config = args.sync_config()?;
    let scheduler = RenderScheduler::new(config.frame_interval);
    let mut session = SyncSession::websocket(
        config,
        args.credentials(),
        Arc::new(LogSink),
        scheduler.handle(),
    );

    match session.start() {
        Ok(()) => {}
        Err(SyncError::MissingCredential) => {
            bail!("No access token: pass --token or set SMARTBIN_TOKEN");
        }
        Err(e) => return Err(e).context("Failed to start sync session"),
    }

    let panel = TerminalPanel::new(
        BinPanelRenderer {
            history_limit: args.history,
        },
        std::io::stdout(),
    );
    let (stop_tx, stop_rx) = watch::channel(false);
    let render = tokio::spawn(scheduler.run(session.cache(), panel, stop_rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    info!("Shutting down...");

    session.stop().await;
    let _ = stop_tx.send(true);
    let (_, passes) = render.await.context("Render loop failed")?;
    info!("Rendered {} frame(s)", passes);
    Ok(())
}
