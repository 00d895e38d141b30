//! Grantvote configuration file handling
//!
//! Provides default configuration generation and loading for the operator
//! CLI. Configuration files are TOML and live in the data directory next to
//! the voting database unless `--config` points elsewhere.

use grantvote::notify::{parse_sender, SmtpSecurity, SmtpSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default sender address for invitations
const DEFAULT_SENDER: &str = "grants@example.org";

/// Default public prefix of voting links
const DEFAULT_BASE_URL: &str = "http://localhost:5000/vote";

/// Read when `[mail] password` is not set
pub const SMTP_PASSWORD_ENV: &str = "GRANTVOTE_SMTP_PASSWORD";

/// Operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantVoteConfig {
    /// Voting database
    pub database: DatabaseConfig,

    /// Invitation delivery
    #[serde(default)]
    pub mail: MailConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// From address on invitations
    #[serde(default = "default_sender")]
    pub sender: String,

    /// Voting links are `<base_url>/<token>`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Directory invitations are spooled into when no SMTP relay is set
    pub outbox_dir: Option<PathBuf>,

    /// SMTP relay; takes precedence over the outbox
    pub smtp_host: Option<String>,

    /// Defaults to 587, 465 or 25 depending on `smtp_security`
    pub smtp_port: Option<u16>,

    #[serde(default)]
    pub smtp_security: SmtpSecurity,

    pub username: Option<String>,

    /// Falls back to $GRANTVOTE_SMTP_PASSWORD
    pub password: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_sender() -> String {
    DEFAULT_SENDER.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: default_sender(),
            base_url: default_base_url(),
            outbox_dir: None,
            smtp_host: None,
            smtp_port: None,
            smtp_security: SmtpSecurity::default(),
            username: None,
            password: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl GrantVoteConfig {
    /// Create a new configuration for the given database path
    #[cfg(test)]
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            database: DatabaseConfig {
                path: database_path,
            },
            mail: MailConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: GrantVoteConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        config
            .validate()
            .map_err(|e| format!("Invalid config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        parse_sender(&self.mail.sender).map_err(|e| format!("[mail] sender: {}", e))?;

        if let Some(host) = &self.mail.smtp_host {
            if host.is_empty() || host.chars().any(|c| c.is_control() || c.is_whitespace()) {
                return Err(format!("[mail] smtp_host: invalid host '{}'", host.escape_debug()));
            }
        }
        Ok(())
    }

    /// Relay settings, if an SMTP host is configured
    pub fn smtp_settings(&self) -> Option<SmtpSettings> {
        let host = self.mail.smtp_host.as_ref()?;
        let password = self
            .mail
            .password
            .clone()
            .or_else(|| std::env::var(SMTP_PASSWORD_ENV).ok());

        Some(SmtpSettings {
            port: self.mail.smtp_port,
            security: self.mail.smtp_security,
            username: self.mail.username.clone(),
            password,
            ..SmtpSettings::new(host.clone())
        })
    }

    /// Save configuration to a TOML file
    #[cfg(test)]
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(database_path: &Path, outbox_dir: &Path) -> String {
        format!(
            r#"# Grantvote Configuration
#
# Operator settings for the grant application voting committee.
# Voting members and applications live in the database, not here.

[database]
# SQLite database holding members, applications, tokens and comments
path = "{database_path}"

[mail]
# From address on voting invitations
sender = "{sender}"

# Public prefix of voting links; each member receives <base_url>/<token>
base_url = "{base_url}"

# Invitations are written as .eml files here for the site mail relay.
# Comment out to only log that an invitation was due.
outbox_dir = "{outbox_dir}"

# Send invitations directly through an SMTP relay instead of the outbox.
# smtp_host = "smtp.example.org"
# smtp_security = "starttls"   # starttls (587), tls (465) or none (25)
# smtp_port = 587
# username = "grants@example.org"
# password is read from $GRANTVOTE_SMTP_PASSWORD when not set here

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/grantvote/grantvote.log"
"#,
            database_path = database_path.display(),
            sender = DEFAULT_SENDER,
            base_url = DEFAULT_BASE_URL,
            outbox_dir = outbox_dir.display(),
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        database_path: &Path,
        outbox_dir: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(database_path, outbox_dir);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Get the default data directory (~/.local/share/grantvote on Linux)
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("grantvote")
}

pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

pub fn default_database_path() -> PathBuf {
    default_data_dir().join("grantvote.db")
}

/// The outbox sits next to the database
pub fn default_outbox_dir(database_path: &Path) -> PathBuf {
    database_path
        .parent()
        .unwrap_or(database_path)
        .join("outbox")
}
