use crate::services::RechargePricing;
use rust_decimal::Decimal;
use service_core::config::{self as core_config, env_var, parsed_env_var};
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub mongodb: MongoConfig,
    pub recharge: RechargeConfig,
    pub notifications: NotificationConfig,
    pub sales_contact_email: String,
    /// Batch expiry sweep interval; 0 disables the background task.
    pub expiry_sweep_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct RechargeConfig {
    pub base_price: Decimal,
    pub base_pack: u32,
    pub price_per_message: Decimal,
    pub min_messages: u32,
    pub max_messages: u32,
}

impl RechargeConfig {
    fn validate(&self) -> Result<(), AppError> {
        if self.min_messages == 0 || self.min_messages > self.max_messages {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RECHARGE_MIN_MESSAGES must be between 1 and RECHARGE_MAX_MESSAGES"
            )));
        }
        if self.base_pack == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RECHARGE_BASE_PACK must be at least 1"
            )));
        }
        Ok(())
    }
}

impl From<&RechargeConfig> for RechargePricing {
    fn from(config: &RechargeConfig) -> Self {
        RechargePricing {
            base_price: config.base_price,
            base_pack: config.base_pack,
            price_per_message: config.price_per_message,
            min_messages: config.min_messages,
            max_messages: config.max_messages,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// HTTP base URL of the notification service. Unset means log-only.
    pub service_url: Option<String>,
}

impl AccountConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = common.is_production();

        let recharge = RechargeConfig {
            base_price: parsed_env_var("RECHARGE_BASE_PRICE", Decimal::from(30))?,
            base_pack: parsed_env_var("RECHARGE_BASE_PACK", 10)?,
            price_per_message: parsed_env_var("RECHARGE_PRICE_PER_MESSAGE", Decimal::from(3))?,
            min_messages: parsed_env_var("RECHARGE_MIN_MESSAGES", 10)?,
            max_messages: parsed_env_var("RECHARGE_MAX_MESSAGES", 1000)?,
        };
        recharge.validate()?;

        Ok(AccountConfig {
            common,
            service_name: env_var("SERVICE_NAME", Some("account-service"), is_prod)?,
            log_level: env_var("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            mongodb: MongoConfig {
                uri: env_var("MONGODB_URI", None, is_prod)?,
                database: env_var("MONGODB_DATABASE", Some("account_db"), is_prod)?,
            },
            recharge,
            notifications: NotificationConfig {
                service_url: env::var("NOTIFICATION_SERVICE_URL")
                    .ok()
                    .filter(|v| !v.is_empty()),
            },
            sales_contact_email: env_var(
                "SALES_CONTACT_EMAIL",
                Some("sales@example.com"),
                is_prod,
            )?,
            expiry_sweep_interval_secs: parsed_env_var("EXPIRY_SWEEP_INTERVAL_SECS", 3600)?,
        })
    }

    pub fn recharge_pricing(&self) -> RechargePricing {
        RechargePricing::from(&self.recharge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recharge() -> RechargeConfig {
        RechargeConfig {
            base_price: Decimal::from(30),
            base_pack: 10,
            price_per_message: Decimal::from(3),
            min_messages: 10,
            max_messages: 1000,
        }
    }

    #[test]
    fn recharge_config_maps_to_pricing() {
        let config = recharge();
        assert!(config.validate().is_ok());
        assert_eq!(RechargePricing::from(&config), RechargePricing::default());
    }

    #[test]
    fn inverted_recharge_bounds_are_rejected() {
        let config = RechargeConfig {
            min_messages: 500,
            max_messages: 100,
            ..recharge()
        };
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));

        let empty_pack = RechargeConfig {
            base_pack: 0,
            ..recharge()
        };
        assert!(matches!(empty_pack.validate(), Err(AppError::ConfigError(_))));
    }
}
