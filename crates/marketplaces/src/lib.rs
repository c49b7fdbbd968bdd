//! `crosslist-marketplaces`: eBay and Etsy implementations of the OAuth,
//! schema mapping and publishing capabilities.
//!
//! Every endpoint URL lives in the per-marketplace config so deployments can
//! switch between sandbox and production (and tests can point at a local
//! server).

pub mod ebay;
pub mod etsy;
pub mod http;
pub mod images;
mod token;

pub use ebay::{EbayConfig, EbayEnvironment, EbayMapper, EbayOAuthClient, EbayPublisher};
pub use etsy::{EtsyConfig, EtsyMapper, EtsyOAuthClient, EtsyPublisher};
pub use http::http_client;
