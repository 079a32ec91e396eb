mod app;

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ssj_config::{load_config, Config, LogConfig};
use ssj_platform::logging::{DEFAULT_MAX_LOG_FILES, DEFAULT_MAX_LOG_SIZE};
use ssj_platform::{ensure_log_dir, log_level_to_filter, rotate_log_files};
use ssj_platform::{DefaultPaths, PlatformPaths};
use ssj_session::{SessionFactory, SessionSettings};

use crate::app::{App, ConsoleSink};

/// Split a `host[:port]` argument, filling in whatever is missing from the
/// configured defaults.
fn parse_target(arg: Option<&str>, config: &Config) -> Result<(String, u16)> {
    let default_host = config.connection.host.clone();
    let default_port = config.connection.port;
    let Some(arg) = arg else {
        return Ok((default_host, default_port));
    };
    match arg.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .with_context(|| format!("invalid port in {arg:?}"))?;
            if port == 0 {
                bail!("port must not be 0");
            }
            let host = if host.is_empty() { default_host } else { host.to_string() };
            Ok((host, port))
        }
        None if arg.is_empty() => Ok((default_host, default_port)),
        None => Ok((arg.to_string(), default_port)),
    }
}

fn session_settings(config: &Config) -> SessionSettings {
    SessionSettings {
        connect_timeout: config.connection.connect_timeout(),
        handshake_timeout: config.connection.handshake_timeout(),
        watermark_text: config.watermark.text.clone(),
        watermark_color: config.watermark.color,
        ..SessionSettings::default()
    }
}

/// Send tracing output to a log file so it never mixes with the console.
fn init_logging(log: &LogConfig, paths: &dyn PlatformPaths) -> Result<PathBuf> {
    let path = log.file.clone().unwrap_or_else(|| paths.log_file());
    ensure_log_dir(&path).with_context(|| format!("failed to create {}", path.display()))?;
    rotate_log_files(&path, DEFAULT_MAX_LOG_SIZE, DEFAULT_MAX_LOG_FILES)
        .with_context(|| format!("failed to rotate {}", path.display()))?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_env("SSJ_LOG")
        .unwrap_or_else(|_| EnvFilter::new(log_level_to_filter(log.level.as_str())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(path)
}

async fn run(target: Option<String>) -> Result<()> {
    let paths = DefaultPaths::new().context("failed to detect platform paths")?;

    let project_dir = env::current_dir().ok();
    let (config, config_error) = match load_config(&paths.config_dir(), project_dir.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let log_path = init_logging(&config.log, &paths)?;
    info!("ssj {} logging to {}", env!("CARGO_PKG_VERSION"), log_path.display());
    if let Some(e) = config_error {
        error!("config load failed, using defaults: {e}");
        eprintln!("ssj: config load failed, using defaults: {e}");
    }

    let (host, port) = parse_target(target.as_deref(), &config)?;
    let mut factory = SessionFactory::new(session_settings(&config));
    println!("connecting to {host}:{port}...");
    let session = factory
        .connect(&host, port, ConsoleSink)
        .await
        .with_context(|| format!("failed to attach to {host}:{port}"))?;

    let mut app = App::new(session, config.display.clone());
    app.run().await
}

#[tokio::main]
async fn main() {
    let target = env::args().nth(1);

    if let Err(e) = run(target).await {
        eprintln!("ssj: {:#}", e);
        std::process::exit(1);
    }
}
