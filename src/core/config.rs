use crate::core::money::MIN_TRANSACT_VALUE;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Extra attempts after a failed status request (fixed delay, no backoff).
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: "http://localhost:9000".to_string(),
            timeout_secs: 10,
            retries: 2,
            retry_delay_ms: 500,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Periods of the background jobs, in seconds.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    pub reconcile_secs: u64,
    pub expire_secs: u64,
    pub bill_credits_secs: u64,
    pub repay_investments_secs: u64,
}

const DAY_SECS: u64 = 24 * 60 * 60;

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            reconcile_secs: 60,
            expire_secs: DAY_SECS,
            bill_credits_secs: DAY_SECS,
            repay_investments_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AdminConfig {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
}

impl AdminConfig {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BankConfig {
    pub initial_funds: Decimal,
    /// Deadline given to payments issued by the bank itself.
    pub pay_date_days: i64,
    /// Confirm investment payouts as soon as they are issued.
    pub settle_payouts: bool,
    pub admin: AdminConfig,
}

impl Default for BankConfig {
    fn default() -> Self {
        BankConfig {
            initial_funds: Decimal::from(1_000_000_000_000_000_i64),
            pay_date_days: 365 * 5,
            settle_payouts: true,
            admin: AdminConfig {
                username: "bank".to_string(),
                first_name: "Central".to_string(),
                last_name: "Bank".to_string(),
                email: None,
                phone: "80000000000".to_string(),
            },
        }
    }
}

/// Rates (percent) seeded for each tariff family on first bootstrap.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TariffRates {
    pub account: Decimal,
    pub credit: Decimal,
    pub investment: Decimal,
}

impl Default for TariffRates {
    fn default() -> Self {
        TariffRates {
            account: Decimal::from(3),
            credit: Decimal::from(12),
            investment: Decimal::from(8),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub bank: BankConfig,
    #[serde(default)]
    pub tariffs: TariffRates,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "paysync", "paysync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "paysync", "paysync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let funds = self.bank.initial_funds;
        if funds < Decimal::ZERO || (funds > Decimal::ZERO && funds < MIN_TRANSACT_VALUE) {
            bail!("bank.initial_funds must be 0 or at least {MIN_TRANSACT_VALUE}, got {funds}");
        }
        if self.bank.pay_date_days < 1 {
            bail!("bank.pay_date_days must be positive");
        }
        Ok(())
    }

    /// Bootstrap credentials may come from the environment instead of the file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let admin = &mut self.bank.admin;
        if let Some(v) = lookup("ADMIN_USERNAME") {
            admin.username = v;
        }
        if let Some(v) = lookup("ADMIN_FIRST_NAME") {
            admin.first_name = v;
        }
        if let Some(v) = lookup("ADMIN_LAST_NAME") {
            admin.last_name = v;
        }
        if let Some(v) = lookup("ADMIN_EMAIL") {
            admin.email = Some(v);
        }
        if let Some(v) = lookup("ADMIN_PHONE_NUMBER") {
            admin.phone = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
provider:
  base_url: "http://gateway.test"
  retries: 0
server:
  bind: "0.0.0.0:9090"
schedule:
  reconcile_secs: 15
bank:
  initial_funds: 5000000
  admin:
    username: "root"
    first_name: "Root"
    last_name: "Admin"
    phone: "81234567890"
tariffs:
  credit: 9.5
data_path: "/tmp/paysync"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.provider.base_url, "http://gateway.test");
        assert_eq!(config.provider.retries, 0);
        assert_eq!(config.provider.timeout_secs, 10);
        assert_eq!(config.server.bind, "0.0.0.0:9090");
        assert_eq!(config.schedule.reconcile_secs, 15);
        assert_eq!(config.schedule.expire_secs, DAY_SECS);
        assert_eq!(config.bank.initial_funds, Decimal::from(5_000_000));
        assert_eq!(config.bank.pay_date_days, 365 * 5);
        assert!(config.bank.settle_payouts);
        assert_eq!(config.bank.admin.display_name(), "Root Admin");
        assert_eq!(config.tariffs.credit, Decimal::new(95, 1));
        assert_eq!(config.tariffs.account, Decimal::from(3));
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/paysync")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.schedule.reconcile_secs, 60);
        assert_eq!(config.bank.admin.username, "bank");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ADMIN_USERNAME", "ops"),
            ("ADMIN_EMAIL", "ops@bank.test"),
            ("ADMIN_PHONE_NUMBER", "89990001122"),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.bank.admin.username, "ops");
        assert_eq!(config.bank.admin.email.as_deref(), Some("ops@bank.test"));
        assert_eq!(config.bank.admin.phone, "89990001122");
        assert_eq!(config.bank.admin.first_name, "Central");
    }

    #[test]
    fn test_initial_funds_validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.bank.initial_funds = Decimal::ZERO;
        assert!(config.validate().is_ok());

        config.bank.initial_funds = Decimal::new(5, 1);
        assert!(config.validate().is_err());

        config.bank.initial_funds = Decimal::from(-10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_invalid_funds() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "bank:\n  initial_funds: 0.25\n").unwrap();

        let err = AppConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("initial_funds"));
    }
}
