//! External marketplaces a product can be listed on.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A marketplace with its own OAuth flow and listing API.
///
/// Marketplace-specific behavior is attached through capability
/// implementations registered under this key; nothing else switches on it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    Ebay,
    Etsy,
}

impl Marketplace {
    pub const ALL: [Marketplace; 2] = [Marketplace::Ebay, Marketplace::Etsy];

    pub fn as_str(self) -> &'static str {
        match self {
            Marketplace::Ebay => "ebay",
            Marketplace::Etsy => "etsy",
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Marketplace {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ebay" => Ok(Marketplace::Ebay),
            "etsy" => Ok(Marketplace::Etsy),
            other => Err(DomainError::UnknownMarketplace(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("EBAY".parse::<Marketplace>().unwrap(), Marketplace::Ebay);
        assert_eq!(" etsy ".parse::<Marketplace>().unwrap(), Marketplace::Etsy);
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert_eq!(
            "amazon".parse::<Marketplace>(),
            Err(DomainError::UnknownMarketplace("amazon".to_string()))
        );
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Marketplace::Etsy).unwrap();
        assert_eq!(json, "\"etsy\"");
    }
}
