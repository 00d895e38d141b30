//! Shared command plumbing: config loading, logging and service wiring

use super::config::{default_config_path, GrantVoteConfig, LoggingConfig};
use grantvote::notify::{ConfiguredNotifier, LogNotifier, OutboxNotifier, SmtpNotifier};
use grantvote::store::SqliteStore;
use grantvote::voting::{ApplicationId, GrantApplication, VotingError, VotingService};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub type Service = VotingService<SqliteStore, ConfiguredNotifier>;

/// Loaded configuration plus a service bound to the configured database
pub struct Context {
    pub config_path: PathBuf,
    pub config: GrantVoteConfig,
    pub service: Service,
}

/// Resolve `--config` or fall back to the default location
pub fn config_path(config: Option<String>) -> PathBuf {
    config.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Install the tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. A second call in
/// the same process is a no-op.
pub fn init_logging(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let result = match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("Failed to open log file '{}': {}", path.display(), e))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

/// SMTP relay if configured, else the outbox, else log only
fn notifier(config: &GrantVoteConfig) -> Result<ConfiguredNotifier, Box<dyn std::error::Error>> {
    let mail = &config.mail;
    if let Some(settings) = config.smtp_settings() {
        let smtp = SmtpNotifier::new(&settings, mail.sender.clone(), mail.base_url.clone())?;
        return Ok(ConfiguredNotifier::Smtp(smtp));
    }

    Ok(match &mail.outbox_dir {
        Some(dir) => ConfiguredNotifier::Outbox(OutboxNotifier::new(
            dir,
            mail.sender.clone(),
            mail.base_url.clone(),
        )),
        None => ConfiguredNotifier::Log(LogNotifier::new(mail.base_url.clone())),
    })
}

impl Context {
    /// Load the config at `config` (or the default path) and open the database
    pub async fn open(config: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = config_path(config);
        if !config_path.exists() {
            return Err(format!(
                "No config file at '{}'. Run `grantvote init` first.",
                config_path.display()
            )
            .into());
        }

        let config = GrantVoteConfig::load(&config_path)?;
        init_logging(&config.logging)?;

        let store = SqliteStore::open(&config.database.path).await?;
        let service = VotingService::new(Arc::new(store), Arc::new(notifier(&config)?));

        Ok(Self {
            config_path,
            config,
            service,
        })
    }

    /// Look up an application by numeric id or reference code
    pub async fn find_application(
        &self,
        key: &str,
    ) -> Result<GrantApplication, Box<dyn std::error::Error>> {
        let key = key.trim();
        if let Ok(id) = key.parse::<i64>() {
            return Ok(self.service.application(ApplicationId(id)).await?);
        }

        let reference = key.to_ascii_uppercase();
        self.service
            .application_by_reference(&reference)
            .await?
            .ok_or_else(|| format!("No application with reference code '{}'", reference).into())
    }
}

/// Render a `VotingError` for the operator
pub fn describe(err: &VotingError) -> String {
    format!("{} ({})", err, err.kind())
}
