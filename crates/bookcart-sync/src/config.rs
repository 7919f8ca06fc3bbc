//! # Storefront Configuration
//!
//! Fee schedule, reentrancy policy and checkout rules for the storefront
//! client.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BOOKCART_TAX_RATE_BPS=825                                          │
//! │     BOOKCART_REENTRANCY=allow                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/storefront/storefront.toml (Linux)                       │
//! │     ~/Library/Application Support/com.bookcart.storefront/ (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     $35.00 threshold, $100.00 fee, 2% tax, reject re-entrant calls     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # storefront.toml
//! [fees]
//! shipping_threshold_cents = 3500
//! shipping_fee_cents = 10000
//! tax_rate_bps = 200
//!
//! [sync]
//! reentrancy = "reject"  # reject | allow
//!
//! [checkout]
//! invalidating_messages = ["not available", "Cart is empty", "Insufficient stock"]
//! ```

use bookcart_core::{FeeSchedule, Money, TaxRate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::checkout::{default_invalidating_messages, InvalidationRules};
use crate::error::{ConfigError, ConfigResult};
use crate::pending::ReentrancyPolicy;

const CONFIG_FILE_NAME: &str = "storefront.toml";

// =============================================================================
// Fee Settings
// =============================================================================

/// Shipping and tax settings, in cents and basis points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSettings {
    /// Subtotals strictly above this ship free.
    #[serde(default = "default_shipping_threshold")]
    pub shipping_threshold_cents: i64,

    #[serde(default = "default_shipping_fee")]
    pub shipping_fee_cents: i64,

    /// 200 = 2%.
    #[serde(default = "default_tax_rate")]
    pub tax_rate_bps: u32,
}

fn default_shipping_threshold() -> i64 {
    3500
}

fn default_shipping_fee() -> i64 {
    10000
}

fn default_tax_rate() -> u32 {
    200
}

impl Default for FeeSettings {
    fn default() -> Self {
        FeeSettings {
            shipping_threshold_cents: default_shipping_threshold(),
            shipping_fee_cents: default_shipping_fee(),
            tax_rate_bps: default_tax_rate(),
        }
    }
}

// =============================================================================
// Sync & Checkout Settings
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Behavior for a second call on a `(book, kind)` already in flight.
    #[serde(default)]
    pub reentrancy: ReentrancyPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Failure messages that mean the cart is stale (case-sensitive
    /// substrings, used when the remote sends no failure code).
    #[serde(default = "default_invalidating_messages")]
    pub invalidating_messages: Vec<String>,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            invalidating_messages: default_invalidating_messages(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete storefront client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub fees: FeeSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,
}

impl StorefrontConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (storefront.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading storefront config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load storefront config: {}. Using defaults.", e);
            Self::default()
        })
    }

    fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Storefront config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.fees.shipping_threshold_cents < 0 {
            return Err(ConfigError::Invalid(
                "shipping_threshold_cents must not be negative".into(),
            ));
        }

        if self.fees.shipping_fee_cents < 0 {
            return Err(ConfigError::Invalid(
                "shipping_fee_cents must not be negative".into(),
            ));
        }

        if self.fees.tax_rate_bps > 10_000 {
            return Err(ConfigError::Invalid(format!(
                "tax_rate_bps must be at most 10000 (100%), got: {}",
                self.fees.tax_rate_bps
            )));
        }

        if self.checkout.invalidating_messages.iter().any(|m| m.is_empty()) {
            return Err(ConfigError::Invalid(
                "invalidating_messages must not contain empty strings".into(),
            ));
        }

        Ok(())
    }

    /// Applies `BOOKCART_*` overrides read through `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("BOOKCART_SHIPPING_THRESHOLD_CENTS") {
            match value.parse() {
                Ok(cents) => self.fees.shipping_threshold_cents = cents,
                Err(_) => warn!(value = %value, "Ignoring invalid BOOKCART_SHIPPING_THRESHOLD_CENTS"),
            }
        }

        if let Some(value) = lookup("BOOKCART_SHIPPING_FEE_CENTS") {
            match value.parse() {
                Ok(cents) => self.fees.shipping_fee_cents = cents,
                Err(_) => warn!(value = %value, "Ignoring invalid BOOKCART_SHIPPING_FEE_CENTS"),
            }
        }

        if let Some(value) = lookup("BOOKCART_TAX_RATE_BPS") {
            match value.parse::<u32>() {
                Ok(bps) => {
                    debug!(bps, "Overriding tax rate from environment");
                    self.fees.tax_rate_bps = bps;
                }
                Err(_) => warn!(value = %value, "Ignoring invalid BOOKCART_TAX_RATE_BPS"),
            }
        }

        if let Some(value) = lookup("BOOKCART_REENTRANCY") {
            match value.parse::<ReentrancyPolicy>() {
                Ok(policy) => {
                    debug!(%policy, "Overriding reentrancy policy from environment");
                    self.sync.reentrancy = policy;
                }
                Err(e) => warn!(error = %e, "Ignoring BOOKCART_REENTRANCY"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "bookcart", "storefront")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The fee schedule shared by the cart view and the checkout.
    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule::new(
            Money::from_cents(self.fees.shipping_threshold_cents),
            Money::from_cents(self.fees.shipping_fee_cents),
            TaxRate::from_bps(self.fees.tax_rate_bps),
        )
    }

    pub fn reentrancy(&self) -> ReentrancyPolicy {
        self.sync.reentrancy
    }

    pub fn invalidation_rules(&self) -> InvalidationRules {
        InvalidationRules::new(self.checkout.invalidating_messages.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = StorefrontConfig::default();
        assert_eq!(config.fee_schedule(), FeeSchedule::default());
        assert_eq!(config.reentrancy(), ReentrancyPolicy::Reject);
        assert_eq!(config.invalidation_rules(), InvalidationRules::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: StorefrontConfig = toml::from_str(
            r#"
            [fees]
            tax_rate_bps = 825

            [sync]
            reentrancy = "allow"
            "#,
        )
        .unwrap();

        assert_eq!(config.fees.tax_rate_bps, 825);
        assert_eq!(config.fees.shipping_fee_cents, 10000);
        assert_eq!(config.reentrancy(), ReentrancyPolicy::Allow);
        assert_eq!(config.checkout.invalidating_messages.len(), 3);
    }

    #[test]
    fn test_config_validation() {
        let mut config = StorefrontConfig::default();

        config.fees.tax_rate_bps = 10_001;
        assert!(config.validate().is_err());

        config.fees.tax_rate_bps = 200;
        config.fees.shipping_fee_cents = -1;
        assert!(config.validate().is_err());

        config.fees.shipping_fee_cents = 0;
        config.checkout.invalidating_messages.push(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BOOKCART_SHIPPING_THRESHOLD_CENTS", "5000"),
            ("BOOKCART_TAX_RATE_BPS", "not-a-number"),
            ("BOOKCART_REENTRANCY", "concurrent"),
        ]
        .into_iter()
        .collect();

        let mut config = StorefrontConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.fees.shipping_threshold_cents, 5000);
        assert_eq!(config.fees.tax_rate_bps, 200);
        assert_eq!(config.reentrancy(), ReentrancyPolicy::Allow);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = StorefrontConfig::default();
        config.fees.shipping_threshold_cents = 5000;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[fees]"));
        assert!(contents.contains("[checkout]"));

        let loaded = StorefrontConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[fees]\ntax_rate_bps = \"lots\"\n").unwrap();

        assert!(matches!(
            StorefrontConfig::from_file(&path),
            Err(ConfigError::Parse(_))
        ));

        let config = StorefrontConfig::load_or_default(Some(path));
        assert_eq!(config.fees.tax_rate_bps, 200);
    }
}
