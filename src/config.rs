/// Configuration management for the moderation service
use crate::error::{ModerationError, ModerationResult};
use crate::moderation::AuditPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub policy: PolicyConfig,
    pub jobs: JobsConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file; None keeps everything in memory
    pub database: Option<PathBuf>,
    /// Optional JSON array of owner profiles
    pub owner_directory: Option<PathBuf>,
}

/// Moderation policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub audit_policy: AuditPolicy,
    /// Admin ids allowed to act; empty allows any non-empty id
    pub admin_ids: Vec<String>,
    /// Actor recorded for background sweeps
    pub system_actor: String,
    /// Per-entity bound for bulk actions
    pub bulk_item_timeout: Option<Duration>,
}

/// Background job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    pub enabled: bool,
    pub expiration_sweep_interval: Duration,
    pub suspension_sweep_interval: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, taken from `RUST_LOG`
    pub level: String,
    pub json: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 8080,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            storage: StorageConfig {
                database: None,
                owner_directory: None,
            },
            policy: PolicyConfig {
                audit_policy: AuditPolicy::RecordAll,
                admin_ids: Vec::new(),
                system_actor: "system".to_string(),
                bulk_item_timeout: None,
            },
            jobs: JobsConfig {
                enabled: true,
                expiration_sweep_interval: Duration::from_secs(900),
                suspension_sweep_interval: Duration::from_secs(900),
            },
            logging: LoggingConfig {
                level: "marketplace_moderation=debug,tower_http=debug".to_string(),
                json: false,
            },
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> ModerationResult<T> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ModerationError::Validation(format!("Invalid value for {}: {}", name, raw))),
        _ => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ModerationConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> ModerationResult<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let hostname = env::var("MODERATION_HOST").unwrap_or(defaults.service.hostname);
        let port = parse_var("MODERATION_PORT", defaults.service.port)?;

        let database = env::var("MODERATION_DATABASE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        let owner_directory = env::var("MODERATION_OWNER_DIRECTORY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let audit_policy = match env::var("MODERATION_AUDIT_POLICY") {
            Ok(raw) if !raw.trim().is_empty() => AuditPolicy::from_str(raw.trim())?,
            _ => defaults.policy.audit_policy,
        };
        let admin_ids = env::var("MODERATION_ADMIN_IDS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();
        let system_actor =
            env::var("MODERATION_SYSTEM_ACTOR").unwrap_or(defaults.policy.system_actor);
        let bulk_item_timeout = match parse_var::<u64>("MODERATION_BULK_ITEM_TIMEOUT_MS", 0)? {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        let jobs_enabled = parse_var("MODERATION_JOBS_ENABLED", defaults.jobs.enabled)?;
        let expiration_sweep_secs = parse_var(
            "MODERATION_EXPIRATION_SWEEP_SECS",
            defaults.jobs.expiration_sweep_interval.as_secs(),
        )?;
        let suspension_sweep_secs = parse_var(
            "MODERATION_SUSPENSION_SWEEP_SECS",
            defaults.jobs.suspension_sweep_interval.as_secs(),
        )?;

        let level = env::var("RUST_LOG").unwrap_or(defaults.logging.level);
        let json = env::var("MODERATION_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ModerationConfig {
            service: ServiceConfig {
                hostname,
                port,
                version: defaults.service.version,
            },
            storage: StorageConfig {
                database,
                owner_directory,
            },
            policy: PolicyConfig {
                audit_policy,
                admin_ids,
                system_actor,
                bulk_item_timeout,
            },
            jobs: JobsConfig {
                enabled: jobs_enabled,
                expiration_sweep_interval: Duration::from_secs(expiration_sweep_secs),
                suspension_sweep_interval: Duration::from_secs(suspension_sweep_secs),
            },
            logging: LoggingConfig { level, json },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ModerationResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ModerationError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.policy.system_actor.trim().is_empty() {
            return Err(ModerationError::Validation(
                "System actor cannot be empty".to_string(),
            ));
        }

        if self.jobs.enabled
            && (self.jobs.expiration_sweep_interval.is_zero()
                || self.jobs.suspension_sweep_interval.is_zero())
        {
            return Err(ModerationError::Validation(
                "Sweep intervals must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether `admin_id` may perform admin actions
    pub fn is_admin(&self, admin_id: &str) -> bool {
        let admin_id = admin_id.trim();
        if admin_id.is_empty() {
            return false;
        }
        self.policy.admin_ids.is_empty() || self.policy.admin_ids.iter().any(|id| id == admin_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ModerationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy.audit_policy, AuditPolicy::RecordAll);
        assert!(config.storage.database.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = ModerationConfig::default();
        config.jobs.expiration_sweep_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config.jobs.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_admin_allow_list() {
        let mut config = ModerationConfig::default();
        assert!(config.is_admin("anyone"));
        assert!(!config.is_admin("  "));

        config.policy.admin_ids = parse_list("admin-1, admin-2,,");
        assert_eq!(config.policy.admin_ids, vec!["admin-1", "admin-2"]);
        assert!(config.is_admin("admin-2"));
        assert!(!config.is_admin("intruder"));
    }
}
