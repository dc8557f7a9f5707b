//! Tether Signal Server
//!
//! # Usage
//!
//! ```bash
//! ADMIN_SECRET=changeme HOST=https://call.example.com tether-signal --port 3000
//!
//! # With a config file and static call page
//! tether-signal --config /etc/tether/tether.toml --public-dir ./public
//!
//! # Write out the effective settings as a starting config file
//! tether-signal --port 8080 --print-config > tether.toml
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tether_core::Config;
use tether_signal::{serve, AppState};

#[derive(Parser, Debug)]
#[command(name = "tether-signal")]
#[command(about = "Time-limited call invites and WebRTC signaling relay")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "TETHER_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Bind address
    #[arg(short, long, env = "BIND")]
    bind: Option<IpAddr>,

    /// Base URL used to build invite links
    #[arg(long = "host", env = "HOST")]
    public_url: Option<String>,

    /// Participant capacity of new meetings
    #[arg(long, env = "MAX_PARTICIPANTS")]
    max_participants: Option<u32>,

    /// Bearer secret for the admin API (admin API is disabled without it)
    #[arg(long, env = "ADMIN_SECRET", hide_env_values = true)]
    admin_secret: Option<String>,

    /// Directory of static files (call page, scripts)
    #[arg(long, env = "PUBLIC_DIR")]
    public_dir: Option<PathBuf>,

    /// Purge expired meetings and tokens every N seconds
    #[arg(long, env = "SWEEP_INTERVAL_SECS")]
    sweep_interval: Option<u64>,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Print the effective configuration as TOML and exit (admin secret omitted)
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::default(),
        };

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(url) = self.public_url {
            config.server.public_url = url;
        }
        if let Some(dir) = self.public_dir {
            config.server.public_dir = Some(dir);
        }
        if let Some(max) = self.max_participants {
            config.access.max_participants = max;
        }
        if let Some(secret) = self.admin_secret {
            config.access.admin_secret = Some(secret);
        }
        if let Some(secs) = self.sweep_interval {
            config.access.sweep_interval_secs = Some(secs);
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_config {
        let mut config = args.into_config()?;
        config.access.admin_secret = None;
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    if args.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    let config = args.into_config()?;

    info!("Starting Tether Signal Server");
    info!(
        "Meetings: max {} participants, base URL {:?}",
        config.access.max_participants, config.server.public_url
    );

    let state = AppState::with_system_clock(config);
    serve(state).await?;

    Ok(())
}
