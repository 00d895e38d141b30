use super::config::{default_database_path, default_outbox_dir, GrantVoteConfig};
use super::context::{config_path, init_logging};
use grantvote::store::SqliteStore;
use std::path::PathBuf;

/// Write a default config file and create the voting database
///
/// The database defaults to `grantvote.db` next to the config file when
/// `--config` is given, otherwise to the data directory.
pub async fn execute(
    config: Option<String>,
    database: Option<String>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🗳️  Initializing grantvote...");
    println!();

    let explicit_config = config.is_some();
    let config_path = config_path(config);

    if config_path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    let database_path = match database {
        Some(path) => PathBuf::from(path),
        None if explicit_config => config_path
            .parent()
            .map(|p| p.join("grantvote.db"))
            .unwrap_or_else(default_database_path),
        None => default_database_path(),
    };
    let outbox_dir = default_outbox_dir(&database_path);

    GrantVoteConfig::create_default(&config_path, &database_path, &outbox_dir)?;
    println!("📝 Config:   {}", config_path.display());

    let config = GrantVoteConfig::load(&config_path)?;
    init_logging(&config.logging)?;

    let store = SqliteStore::open(&config.database.path).await?;
    store.close().await;
    println!("💾 Database: {}", database_path.display());
    println!("📬 Outbox:   {}", outbox_dir.display());
    println!();
    println!("✅ Ready. Add committee members with `grantvote add-member`.");

    Ok(())
}
