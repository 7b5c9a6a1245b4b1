//! Configuration inspection and connection-test commands.

use anyhow::{Context, Result, bail};
use clap::Parser;
use pgvault_api::AppState;
use pgvault_core::config::PgVaultConfig;
use pgvault_core::types::{ConfigId, PgProvider};
use pgvault_security::access::{Role, RoleSet};
use pgvault_security::keys::KeyRing;
use pgvault_security::tenant::{Principal, RequestContext, TenantContext};
use pgvault_service::connection::ConnectionTestDispatcher;
use tracing::info;

use super::settings;

/// Actor recorded on history rows written from the command line.
const CLI_ACTOR: &str = "cli";

/// Arguments for the test-connection command
#[derive(Parser)]
pub struct TestConnectionArgs {
    /// Configuration id
    pub config_id: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Validates the configuration and prints a summary.
///
/// # Errors
///
/// Returns error if validation fails or the key ring cannot be built.
pub fn check(config: &PgVaultConfig) -> Result<()> {
    settings::validate(config)?;
    let keys =
        KeyRing::from_settings(&config.encryption).context("Failed to load encryption keys")?;

    println!("Configuration OK");
    println!("================");
    println!("Active key version: v{}", keys.active_version());
    let mut versions = keys.versions();
    versions.sort_unstable();
    println!(
        "Loaded versions:    {}",
        versions
            .iter()
            .map(|v| format!("v{v}"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "Storage:            {}",
        config.storage.path.as_deref().unwrap_or("in-memory")
    );
    println!(
        "Base domains:       {}",
        if config.tenant.base_domains.is_empty() {
            "(none)".to_string()
        } else {
            config.tenant.base_domains.join(", ")
        }
    );
    println!("Listen address:     {}:{}", config.server.host, config.server.port);
    Ok(())
}

/// Runs a live connection test for one stored configuration and records it.
///
/// # Errors
///
/// Returns error if the configuration cannot be found or tested, or when the
/// provider refuses the credentials.
pub async fn test_connection(config: &PgVaultConfig, args: &TestConnectionArgs) -> Result<()> {
    settings::validate(config)?;
    let config_id: ConfigId = args
        .config_id
        .parse()
        .with_context(|| format!("Invalid configuration id: {}", args.config_id))?;

    let state = AppState::from_config(config)
        .await
        .context("Failed to initialize services")?;
    let ctx = RequestContext::new(
        TenantContext::new(),
        Some(Principal::new(CLI_ACTOR, RoleSet::new().with(Role::Ops))),
    );

    info!(config_id = %config_id, "Running connection test");
    let result = state
        .service
        .ops_test_connection(&ctx, &config_id)
        .await
        .context("Connection test could not run")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Outcome:  {}", result.outcome);
        println!("Message:  {}", result.message);
        println!("Duration: {} ms", result.duration_ms);
    }

    if !result.success {
        bail!("Connection test {}: {}", result.outcome, result.message);
    }
    Ok(())
}

/// Prints version and provider support.
pub fn info(config: &PgVaultConfig) {
    println!("PgVault");
    println!("=======");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Rust Edition: 2024");
    println!();
    println!("Providers:");

    let dispatcher = ConnectionTestDispatcher::from_settings(&config.connection_test).ok();
    for provider in PgProvider::ALL {
        let tested = dispatcher
            .as_ref()
            .is_some_and(|d| d.supports(provider));
        println!(
            "  - {:<8} {:<20} {}",
            provider.as_str(),
            provider.display_name(),
            if tested { "live connection test" } else { "no connection test" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgvault_core::config::KeySettings;
    use pgvault_security::keys::generate_encoded_key;

    fn keyed_config() -> PgVaultConfig {
        let mut config = PgVaultConfig::default();
        config.encryption.keys.push(KeySettings {
            version: 1,
            key: Some(generate_encoded_key().unwrap()),
            ..KeySettings::default()
        });
        config
    }

    #[test]
    fn test_check_accepts_keyed_config() {
        check(&keyed_config()).unwrap();
    }

    #[test]
    fn test_check_rejects_missing_active_key() {
        let mut config = keyed_config();
        config.encryption.active_version = 2;
        assert!(check(&config).is_err());
    }

    #[tokio::test]
    async fn test_connection_rejects_malformed_id() {
        let args = TestConnectionArgs {
            config_id: "nope".to_string(),
            json: false,
        };
        let err = test_connection(&keyed_config(), &args).await.unwrap_err();
        assert!(err.to_string().contains("Invalid configuration id"));
    }

    #[tokio::test]
    async fn test_connection_unknown_id_fails() {
        let args = TestConnectionArgs {
            config_id: ConfigId::new().to_string(),
            json: true,
        };
        assert!(test_connection(&keyed_config(), &args).await.is_err());
    }
}
