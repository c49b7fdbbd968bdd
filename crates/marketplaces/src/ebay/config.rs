use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crosslist_auth::ClientCredentials;

pub const DEFAULT_SCOPES: [&str; 3] = [
    "https://api.ebay.com/oauth/api_scope",
    "https://api.ebay.com/oauth/api_scope/sell.inventory",
    "https://api.ebay.com/oauth/api_scope/sell.marketing",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown eBay environment {0:?} (expected sandbox or production)")]
pub struct UnknownEnvironment(pub String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EbayEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl EbayEnvironment {
    pub fn authorize_url(self) -> &'static str {
        match self {
            EbayEnvironment::Sandbox => "https://auth.sandbox.ebay.com/oauth2/authorize",
            EbayEnvironment::Production => "https://auth.ebay.com/oauth2/authorize",
        }
    }

    pub fn api_base(self) -> &'static str {
        match self {
            EbayEnvironment::Sandbox => "https://api.sandbox.ebay.com",
            EbayEnvironment::Production => "https://api.ebay.com",
        }
    }
}

impl fmt::Display for EbayEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EbayEnvironment::Sandbox => "sandbox",
            EbayEnvironment::Production => "production",
        })
    }
}

impl FromStr for EbayEnvironment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(EbayEnvironment::Sandbox),
            "production" => Ok(EbayEnvironment::Production),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}

/// Business policies every eBay offer must reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EbayPolicies {
    pub fulfillment_policy_id: Option<String>,
    pub payment_policy_id: Option<String>,
    pub return_policy_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EbayConfig {
    pub client: ClientCredentials,
    /// RuName when one is configured, the callback URL otherwise.
    pub redirect_uri: String,
    pub environment: EbayEnvironment,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base: String,
    pub scopes: Vec<String>,
    pub marketplace_id: String,
    pub content_language: String,
    pub policies: EbayPolicies,
    /// Catalog category (lowercase) to eBay category id.
    pub category_ids: BTreeMap<String, String>,
    pub default_category_id: Option<String>,
    /// Base URL relative image paths are served under.
    pub public_base_url: Option<Url>,
}

impl EbayConfig {
    pub fn new(client: ClientCredentials, redirect_uri: impl Into<String>, environment: EbayEnvironment) -> Self {
        let api_base = environment.api_base();
        Self {
            client,
            redirect_uri: redirect_uri.into(),
            environment,
            authorize_url: environment.authorize_url().to_string(),
            token_url: format!("{api_base}/identity/v1/oauth2/token"),
            api_base: api_base.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            marketplace_id: "EBAY_US".to_string(),
            content_language: "en-US".to_string(),
            policies: EbayPolicies::default(),
            category_ids: BTreeMap::new(),
            default_category_id: None,
            public_base_url: None,
        }
    }

    /// Point every endpoint at `base` (a local mock in tests).
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.authorize_url = format!("{base}/oauth2/authorize");
        self.token_url = format!("{base}/identity/v1/oauth2/token");
        self.api_base = base.to_string();
        self
    }

    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_is_the_default_environment() {
        let config = EbayConfig::new(ClientCredentials::new("id", "secret"), "RuName-1", EbayEnvironment::default());
        assert_eq!(config.authorize_url, "https://auth.sandbox.ebay.com/oauth2/authorize");
        assert_eq!(config.token_url, "https://api.sandbox.ebay.com/identity/v1/oauth2/token");
        assert_eq!(config.scopes.len(), 3);
    }

    #[test]
    fn production_endpoints() {
        let config = EbayConfig::new(ClientCredentials::new("id", "secret"), "RuName-1", EbayEnvironment::Production);
        assert_eq!(config.authorize_url, "https://auth.ebay.com/oauth2/authorize");
        assert_eq!(config.api_base, "https://api.ebay.com");
    }

    #[test]
    fn environment_names_parse_case_insensitively() {
        assert_eq!("Production".parse::<EbayEnvironment>(), Ok(EbayEnvironment::Production));
        assert_eq!(" sandbox ".parse::<EbayEnvironment>(), Ok(EbayEnvironment::Sandbox));
        assert!("staging".parse::<EbayEnvironment>().is_err());
    }
}
