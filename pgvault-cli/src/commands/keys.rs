//! Encryption key commands.

use anyhow::{Context, Result, bail};
use clap::Parser;
use pgvault_core::config::PgVaultConfig;
use pgvault_core::repository::open_store;
use pgvault_core::types::TenantId;
use pgvault_security::keys::{CredentialCipher, KeyRing, generate_encoded_key};
use pgvault_service::rotation::{KeyRotationService, RotationReport};
use std::sync::Arc;
use tracing::{info, warn};

use super::settings;

/// Arguments for the rotate command
#[derive(Parser)]
pub struct RotateArgs {
    /// Rotate every tenant's configurations
    #[arg(long, conflicts_with = "tenant", required_unless_present = "tenant")]
    pub all: bool,

    /// Rotate one tenant's configurations
    #[arg(short, long)]
    pub tenant: Option<String>,
}

/// Arguments for the keygen command
#[derive(Parser)]
pub struct KeygenArgs {
    /// Number of keys to generate
    #[arg(
        short = 'n',
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(1..=16)
    )]
    pub count: u8,
}

/// Re-encrypts stored credentials under the active key version.
///
/// # Errors
///
/// Returns error if the store or keys cannot be loaded, or if any row fails.
pub async fn rotate(config: &PgVaultConfig, args: &RotateArgs) -> Result<()> {
    settings::validate(config)?;

    let store = open_store(&config.storage)
        .await
        .context("Failed to open configuration store")?;
    let keys =
        KeyRing::from_settings(&config.encryption).context("Failed to load encryption keys")?;
    info!(active_key_version = keys.active_version(), "Starting credential rotation");

    let service = KeyRotationService::new(store, CredentialCipher::new(Arc::new(keys)));
    let report = match &args.tenant {
        Some(raw) => {
            let tenant = TenantId::new(raw.as_str()).context("Invalid tenant id")?;
            service
                .rotate_tenant(&tenant)
                .await
                .with_context(|| format!("Rotation failed for tenant {tenant}"))?
        }
        None => service.rotate_all().await.context("Rotation failed")?,
    };

    print_report(&report);
    if report.failed > 0 {
        warn!(failed = report.failed, "Some configurations were not rotated");
        bail!("{} configuration(s) could not be rotated", report.failed);
    }
    Ok(())
}

fn print_report(report: &RotationReport) {
    println!("Rotation Report");
    println!("===============");
    println!("Scanned:   {}", report.scanned);
    println!("Rotated:   {}", report.rotated);
    println!("Unchanged: {}", report.unchanged);
    println!("Failed:    {}", report.failed);
}

/// Prints freshly generated base64 keys.
///
/// # Errors
///
/// Returns error if the system random source fails.
pub fn keygen(args: &KeygenArgs) -> Result<()> {
    for _ in 0..args.count {
        let key = generate_encoded_key().context("Failed to generate key")?;
        println!("{key}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pgvault_core::config::KeySettings;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        rotate: RotateArgs,
    }

    #[test]
    fn test_rotate_args_require_a_scope() {
        Harness::command().debug_assert();
        assert!(Harness::try_parse_from(["rotate"]).is_err());
        assert!(Harness::try_parse_from(["rotate", "--all", "--tenant", "acme"]).is_err());

        let parsed = Harness::try_parse_from(["rotate", "--tenant", "acme"]).unwrap();
        assert!(!parsed.rotate.all);
        assert_eq!(parsed.rotate.tenant.as_deref(), Some("acme"));
    }

    #[tokio::test]
    async fn test_rotate_empty_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PgVaultConfig::default();
        config.storage.path = Some(dir.path().join("configs.json").display().to_string());
        config.encryption.keys.push(KeySettings {
            version: 1,
            key: Some(generate_encoded_key().unwrap()),
            ..KeySettings::default()
        });

        let args = RotateArgs {
            all: true,
            tenant: None,
        };
        rotate(&config, &args).await.unwrap();
    }

    #[tokio::test]
    async fn test_rotate_rejects_bad_tenant() {
        let mut config = PgVaultConfig::default();
        config.encryption.keys.push(KeySettings {
            version: 1,
            key: Some(generate_encoded_key().unwrap()),
            ..KeySettings::default()
        });

        let args = RotateArgs {
            all: false,
            tenant: Some("not a tenant".to_string()),
        };
        let err = rotate(&config, &args).await.unwrap_err();
        assert!(err.to_string().contains("Invalid tenant id"));
    }
}
