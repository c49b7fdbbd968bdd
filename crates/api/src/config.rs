//! Process configuration, read from the environment once at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crosslist_auth::ClientCredentials;
use crosslist_marketplaces::ebay::EbayPolicies;
use crosslist_marketplaces::{EbayConfig, EbayEnvironment, EtsyConfig};
use crosslist_publishing::PublishConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ebay_client: ClientCredentials,
    pub etsy_client: ClientCredentials,
    /// Public base URL of this service; OAuth callbacks hang off it.
    pub redirect_base_url: Url,
    pub ebay_ru_name: Option<String>,
    pub ebay_environment: EbayEnvironment,
    pub ebay_policies: EbayPolicies,
    pub ebay_category_id: Option<String>,
    pub etsy_shop_id: Option<String>,
    pub etsy_shipping_profile_id: Option<u64>,
    pub etsy_taxonomy_id: Option<u64>,
    pub catalog_file: PathBuf,
    pub media_root: PathBuf,
    pub port: u16,
    pub publish: PublishConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let redirect_base_url = env.required("REDIRECT_BASE_URL")?;
        let redirect_base_url = Url::parse(&redirect_base_url).map_err(|e| ConfigError::Invalid {
            name: "REDIRECT_BASE_URL",
            reason: e.to_string(),
        })?;

        let mut publish = PublishConfig::default();
        if let Some(max_attempts) = env.parsed::<u32>("PUBLISH_MAX_ATTEMPTS")? {
            if max_attempts == 0 {
                return Err(ConfigError::Invalid {
                    name: "PUBLISH_MAX_ATTEMPTS",
                    reason: "must be at least 1".to_string(),
                });
            }
            publish = publish.with_max_attempts(max_attempts);
        }
        if let Some(secs) = env.parsed::<u64>("PUBLISH_TIMEOUT_SECS")? {
            publish = publish.with_call_timeout(Duration::from_secs(secs.max(1)));
        }

        Ok(Self {
            ebay_client: ClientCredentials::new(
                env.required("EBAY_CLIENT_ID")?,
                env.required("EBAY_CLIENT_SECRET")?,
            ),
            etsy_client: ClientCredentials::new(
                env.required("ETSY_CLIENT_ID")?,
                env.required("ETSY_CLIENT_SECRET")?,
            ),
            redirect_base_url,
            ebay_ru_name: env.optional("EBAY_RU_NAME"),
            ebay_environment: env.parsed("EBAY_ENVIRONMENT")?.unwrap_or_default(),
            ebay_policies: EbayPolicies {
                fulfillment_policy_id: env.optional("EBAY_FULFILLMENT_POLICY_ID"),
                payment_policy_id: env.optional("EBAY_PAYMENT_POLICY_ID"),
                return_policy_id: env.optional("EBAY_RETURN_POLICY_ID"),
            },
            ebay_category_id: env.optional("EBAY_CATEGORY_ID"),
            etsy_shop_id: env.optional("ETSY_SHOP_ID"),
            etsy_shipping_profile_id: env.parsed("ETSY_SHIPPING_PROFILE_ID")?,
            etsy_taxonomy_id: env.parsed("ETSY_TAXONOMY_ID")?,
            catalog_file: env.optional("CATALOG_FILE").unwrap_or_else(|| "catalog.json".to_string()).into(),
            media_root: env.optional("MEDIA_ROOT").unwrap_or_else(|| ".".to_string()).into(),
            port: env.parsed("PORT")?.unwrap_or(10000),
            publish,
        })
    }

    pub fn callback_url(&self, marketplace: &str) -> String {
        format!(
            "{}/callback/{marketplace}",
            self.redirect_base_url.as_str().trim_end_matches('/')
        )
    }

    pub fn ebay_config(&self) -> EbayConfig {
        let redirect_uri = self
            .ebay_ru_name
            .clone()
            .unwrap_or_else(|| self.callback_url("ebay"));
        let mut config = EbayConfig::new(self.ebay_client.clone(), redirect_uri, self.ebay_environment);
        config.policies = self.ebay_policies.clone();
        config.default_category_id = self.ebay_category_id.clone();
        config.public_base_url = Some(self.redirect_base_url.clone());
        config
    }

    pub fn etsy_config(&self) -> EtsyConfig {
        let mut config = EtsyConfig::new(self.etsy_client.clone(), self.callback_url("etsy"));
        config.shop_id = self.etsy_shop_id.clone();
        config.shipping_profile_id = self.etsy_shipping_profile_id;
        config.default_taxonomy_id = self.etsy_taxonomy_id;
        config.media_root = self.media_root.clone();
        config
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn parsed<T>(&self, name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(name)
            .map(|v| {
                v.parse().map_err(|e: T::Err| ConfigError::Invalid {
                    name,
                    reason: e.to_string(),
                })
            })
            .transpose()
    }
}
