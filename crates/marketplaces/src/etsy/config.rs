use std::collections::BTreeMap;
use std::path::PathBuf;

use crosslist_auth::ClientCredentials;

pub const AUTHORIZE_URL: &str = "https://www.etsy.com/oauth/connect";
pub const TOKEN_URL: &str = "https://api.etsy.com/v3/public/oauth/token";
pub const API_BASE: &str = "https://openapi.etsy.com/v3/application";
pub const DEFAULT_SCOPES: [&str; 2] = ["listings_r", "listings_w"];

#[derive(Debug, Clone)]
pub struct EtsyConfig {
    pub client: ClientCredentials,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base: String,
    pub scopes: Vec<String>,
    pub shop_id: Option<String>,
    pub shipping_profile_id: Option<u64>,
    /// Catalog category (lowercase) to Etsy taxonomy id.
    pub taxonomy_ids: BTreeMap<String, u64>,
    pub default_taxonomy_id: Option<u64>,
    /// Directory locally uploaded images are read from.
    pub media_root: PathBuf,
}

impl EtsyConfig {
    pub fn new(client: ClientCredentials, redirect_uri: impl Into<String>) -> Self {
        Self {
            client,
            redirect_uri: redirect_uri.into(),
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            api_base: API_BASE.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            shop_id: None,
            shipping_profile_id: None,
            taxonomy_ids: BTreeMap::new(),
            default_taxonomy_id: None,
            media_root: PathBuf::from("."),
        }
    }

    /// Point every endpoint at `base` (a local mock in tests).
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.authorize_url = format!("{base}/oauth/connect");
        self.token_url = format!("{base}/v3/public/oauth/token");
        self.api_base = format!("{base}/v3/application");
        self
    }

    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }
}
