use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use cinder_core::Instance;
use cinder_server::{server, CinderConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "cinder-server", about = "in-memory redis test double")]
struct Args {
    /// path to TOML configuration file
    #[arg(short = 'c', long, env = "CINDER_CONFIG")]
    config: Option<PathBuf>,

    /// print default configuration as TOML and exit
    #[arg(long)]
    config_template: bool,

    /// address to bind to
    #[arg(long, env = "CINDER_HOST")]
    host: Option<String>,

    /// port to listen on
    #[arg(short, long, env = "CINDER_PORT")]
    port: Option<u16>,

    /// require clients to AUTH with this password
    #[arg(long, env = "CINDER_REQUIREPASS")]
    requirepass: Option<String>,

    /// maximum number of concurrent client connections
    #[arg(long, env = "CINDER_MAXCLIENTS")]
    maxclients: Option<usize>,
}

/// Applies CLI overrides on top of whatever the TOML file resolved.
fn apply_args(cfg: &mut CinderConfig, args: &Args) {
    if let Some(ref host) = args.host {
        cfg.bind = host.clone();
    }
    if let Some(port) = args.port {
        cfg.port = port;
    }
    if let Some(ref pass) = args.requirepass {
        cfg.requirepass = pass.clone();
    }
    if let Some(n) = args.maxclients {
        cfg.maxclients = n;
    }
}

/// Prints `msg` to stderr and exits with code 1.
fn exit_err(msg: impl std::fmt::Display) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinder=info".into()),
        )
        .init();

    let args = Args::parse();

    if args.config_template {
        match CinderConfig::default().to_toml() {
            Ok(toml) => {
                println!("{toml}");
                return;
            }
            Err(e) => exit_err(format!("failed to render config template: {e}")),
        }
    }

    let mut cfg = match &args.config {
        Some(path) => CinderConfig::from_file(path).unwrap_or_else(|e| exit_err(e)),
        None => CinderConfig::default(),
    };
    apply_args(&mut cfg, &args);

    let addr: SocketAddr = match format!("{}:{}", cfg.bind, cfg.port).parse() {
        Ok(addr) => addr,
        Err(e) => exit_err(format!("invalid bind address '{}:{}': {e}", cfg.bind, cfg.port)),
    };

    if cfg.maxclients == 0 {
        exit_err("maxclients must be at least 1");
    }

    let instance = match cfg.requirepass() {
        Some(password) => {
            info!("authentication enabled (requirepass set)");
            Arc::new(Instance::with_password(password))
        }
        None => Arc::new(Instance::new()),
    };

    if let Err(e) = server::run(addr, instance, cfg.maxclients).await {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}
