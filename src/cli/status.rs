use super::context::Context;

/// Check database health and show counts
///
/// Displays:
/// - Config and database locations
/// - Store health check result
/// - Member counts (total / active)
/// - Application counts (total / open for voting)
/// - Where invitations are delivered
pub async fn execute(config: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(config).await?;
    let service = &ctx.service;

    println!("📊 Grantvote Status");
    println!();
    println!("  Config:   {}", ctx.config_path.display());
    println!("  Database: {}", ctx.config.database.path.display());

    match service.health().await {
        Ok(()) => println!("  ✅ Database: healthy"),
        Err(e) => {
            println!("  ❌ Database: {}", e);
            return Err(e.into());
        }
    }

    let members = service.list_members().await?;
    let active = members.iter().filter(|m| m.is_active).count();
    println!();
    println!("  Members: {} ({} active)", members.len(), active);

    let now = service.now();
    let applications = service.list_applications().await?;
    let open = applications
        .iter()
        .filter(|a| grantvote::voting::deadline::is_open(a, now))
        .count();
    println!(
        "  Applications: {} ({} open for voting)",
        applications.len(),
        open
    );

    let mail = &ctx.config.mail;
    match (&mail.smtp_host, &mail.outbox_dir) {
        (Some(host), _) => println!("  Invitations: sent via SMTP relay {}", host),
        (None, Some(dir)) => println!("  Invitations: spooled to {}", dir.display()),
        (None, None) => println!("  Invitations: logged only (no relay or outbox configured)"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::GrantVoteConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_status_execute() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        GrantVoteConfig::new(temp_dir.path().join("grantvote.db"))
            .save(&config_path)
            .unwrap();

        let result = execute(Some(config_path.to_string_lossy().to_string())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_status_without_config_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(execute(Some(missing.to_string_lossy().to_string())).await.is_err());
    }
}
