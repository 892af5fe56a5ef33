use anyhow::{Context as _, Result};
use clap::Parser;
use foliod::{auth, config::DaemonConfig, rest, AppContext};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(
    name = "foliod",
    about = "Portfolio backend daemon — project catalog API + SMTP contact relay",
    version
)]
struct Args {
    /// HTTP API port
    #[arg(long, env = "FOLIOD_PORT")]
    port: Option<u16>,

    /// Data directory for the project file, contact log and config.toml
    #[arg(long, env = "FOLIOD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FOLIOD_LOG")]
    log: Option<String>,

    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "FOLIOD_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "FOLIOD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = DaemonConfig::new(args.port, args.data_dir, args.log, args.bind_address);

    let _log_guard = setup_logging(&config.log, args.log_file.as_deref(), &config.log_format);

    if config.admin_secret_defaulted {
        warn!("no admin secret configured — using the default \"admin\" (set FOLIOD_ADMIN_SECRET)");
    }
    if config.relay.host.is_none() || config.relay.recipient.is_none() {
        warn!("mail relay not fully configured — contact submissions will fail until it is");
    }

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

    let ctx = Arc::new(AppContext::new(config));
    ctx.store
        .ensure_initialized()
        .await
        .context("initializing the project file")?;

    // ── Periodic session sweep ────────────────────────────────────────────────
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(auth::SWEEP_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = ctx.tokens.sweep().await;
                if removed > 0 {
                    debug!(removed, "swept expired sessions");
                }
            }
        });
    }

    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(version = env!("CARGO_PKG_VERSION"), "foliod starting");

    rest::serve(ctx, listener).await
}

/// Initialise the tracing subscriber.
///
/// Pretty (compact) or JSON format per config; when a log file is given,
/// logs go to both stdout and a daily-rotated file. Returns the non-blocking
/// writer guard, which must stay alive for the process lifetime.
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("foliod.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}
