use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_RELAY_PORT: u16 = 465;
const DEFAULT_TOKEN_TTL_MINUTES: u64 = 120;
const DEFAULT_ADMIN_SECRET: &str = "admin";
const DEFAULT_EMAIL_SUBJECT: &str = "New contact from the portfolio";

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

// ─── RelayConfig ──────────────────────────────────────────────────────────────

/// Outbound mail relay configuration (`[relay]` in config.toml).
///
/// `host`, `identity`, `secret` and `recipient` have no defaults — contact
/// submissions fail with a configuration error until all four are set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Relay hostname, e.g. `"smtp.example.com"`. None = not configured.
    pub host: Option<String>,
    /// Relay TLS submission port (default: 465).
    pub port: u16,
    /// Account identity used for AUTH LOGIN. None = not configured.
    pub identity: Option<String>,
    /// Account secret used for AUTH LOGIN. None = not configured.
    pub secret: Option<String>,
    /// Address contact submissions are delivered to. None = not configured.
    pub recipient: Option<String>,
    /// Subject line stamped on every contact email.
    pub subject: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_RELAY_PORT,
            identity: None,
            secret: None,
            recipient: None,
            subject: DEFAULT_EMAIL_SUBJECT.to_string(),
        }
    }
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP API port (default: 4000).
    port: Option<u16>,
    /// Bind address (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    /// Log level filter string, e.g. "debug", "info,foliod=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured for log aggregators).
    log_format: Option<String>,
    /// Admin login secret. Falls back to "admin" with a startup warning.
    admin_secret: Option<String>,
    /// Session token lifetime in minutes (default: 120).
    token_ttl_minutes: Option<u64>,
    /// Allowed CORS origins; `["*"]` mirrors the request origin (default).
    allowed_origins: Option<Vec<String>>,
    /// Mail relay configuration (`[relay]`).
    relay: Option<RelayConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

// ─── DaemonConfig ─────────────────────────────────────────────────────────────

/// Resolved daemon configuration, shared read-only across all handlers.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub port: u16,
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub log: String,
    /// Log output format: "pretty" (default) | "json".
    pub log_format: String,
    /// Secret compared against login submissions.
    pub admin_secret: String,
    /// True when no secret was configured and the built-in default applies.
    /// The caller logs a startup warning in that case.
    pub admin_secret_defaulted: bool,
    /// Session token lifetime in minutes (default: 120).
    pub token_ttl_minutes: u64,
    /// CORS origin allow-list; a `"*"` entry mirrors the request origin.
    pub allowed_origins: Vec<String>,
    /// Outbound mail relay settings.
    pub relay: RelayConfig,
}

impl DaemonConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = env_var("FOLIOD_LOG_FORMAT")
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let configured_secret = env_var("FOLIOD_ADMIN_SECRET").or(toml.admin_secret);
        let admin_secret_defaulted = configured_secret.is_none();
        let admin_secret =
            configured_secret.unwrap_or_else(|| DEFAULT_ADMIN_SECRET.to_string());

        let token_ttl_minutes = env_var("FOLIOD_TOKEN_TTL_MINUTES")
            .and_then(|v| v.parse().ok())
            .or(toml.token_ttl_minutes)
            .filter(|&ttl| ttl > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES);

        let allowed_origins = env_var("FOLIOD_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .or(toml.allowed_origins)
            .unwrap_or_else(|| vec!["*".to_string()]);

        let mut relay = toml.relay.unwrap_or_default();
        if let Some(host) = env_var("FOLIOD_RELAY_HOST") {
            relay.host = Some(host);
        }
        if let Some(port) = env_var("FOLIOD_RELAY_PORT").and_then(|v| v.parse().ok()) {
            relay.port = port;
        }
        if let Some(identity) = env_var("FOLIOD_RELAY_IDENTITY") {
            relay.identity = Some(identity);
        }
        if let Some(secret) = env_var("FOLIOD_RELAY_SECRET") {
            relay.secret = Some(secret);
        }
        if let Some(recipient) = env_var("FOLIOD_CONTACT_RECIPIENT") {
            relay.recipient = Some(recipient);
        }
        if let Some(subject) = env_var("FOLIOD_EMAIL_SUBJECT") {
            relay.subject = subject;
        }

        Self {
            port,
            bind_address,
            data_dir,
            log,
            log_format,
            admin_secret,
            admin_secret_defaulted,
            token_ttl_minutes,
            allowed_origins,
            relay,
        }
    }

    /// Path of the JSON file holding the project collection.
    pub fn projects_path(&self) -> PathBuf {
        self.data_dir.join("projects.json")
    }

    /// Path of the append-only contact submission log.
    pub fn contact_log_path(&self) -> PathBuf {
        self.data_dir.join("contact-log.txt")
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_overrides() {
        let cfg = DaemonConfig::new(None, Some(PathBuf::from("/nonexistent")), None, None);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.bind_address, "127.0.0.1");
        assert_eq!(cfg.token_ttl_minutes, 120);
        assert_eq!(cfg.allowed_origins, vec!["*".to_string()]);
        assert_eq!(cfg.relay.port, 465);
        assert!(cfg.relay.host.is_none());
    }

    #[test]
    fn cli_values_win_over_defaults() {
        let cfg = DaemonConfig::new(
            Some(8080),
            Some(PathBuf::from("/nonexistent")),
            Some("debug".to_string()),
            Some("0.0.0.0".to_string()),
        );
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.log, "debug");
        assert_eq!(cfg.bind_address, "0.0.0.0");
    }

    #[test]
    fn toml_layer_fills_unset_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            r#"
port = 9999
admin_secret = "hunter2"
allowed_origins = ["https://example.com"]

[relay]
host = "smtp.example.com"
recipient = "me@example.com"
"#,
        )
        .unwrap();

        let cfg = DaemonConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(cfg.port, 9999);
        assert_eq!(cfg.admin_secret, "hunter2");
        assert!(!cfg.admin_secret_defaulted);
        assert_eq!(cfg.allowed_origins, vec!["https://example.com".to_string()]);
        assert_eq!(cfg.relay.host.as_deref(), Some("smtp.example.com"));
        assert_eq!(cfg.relay.recipient.as_deref(), Some("me@example.com"));
        // unset relay fields keep their defaults
        assert_eq!(cfg.relay.port, 465);
    }

    #[test]
    fn data_paths_live_under_data_dir() {
        let cfg = DaemonConfig::new(None, Some(PathBuf::from("/tmp/folio")), None, None);
        assert_eq!(cfg.projects_path(), PathBuf::from("/tmp/folio/projects.json"));
        assert_eq!(
            cfg.contact_log_path(),
            PathBuf::from("/tmp/folio/contact-log.txt")
        );
    }
}
