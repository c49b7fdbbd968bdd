use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crosslist_auth::CredentialState;
use crosslist_catalog::{ListingStatus, NewProduct, Product};
use crosslist_core::{Cents, Marketplace};
use crosslist_publishing::{PublishOutcome, PublishReport};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: u64,
    #[serde(default)]
    pub cost_cents: u64,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(body: CreateProductRequest) -> Self {
        NewProduct {
            title: body.title,
            description: body.description,
            price: Cents(body.price_cents),
            cost: Cents(body.cost_cents),
            quantity: body.quantity,
            images: body.images,
            category: body.category,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishRequest {
    /// Empty means every registered marketplace.
    #[serde(default)]
    pub marketplaces: Vec<Marketplace>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ListingView {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&ListingStatus> for ListingView {
    fn from(status: &ListingStatus) -> Self {
        Self {
            status: status.label(),
            external_id: status.external_id().map(str::to_string),
            reason: match status {
                ListingStatus::Failed { reason, .. } => Some(reason.clone()),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: String,
    pub price_cents: u64,
    pub cost_cents: u64,
    pub profit_margin: String,
    pub quantity: u32,
    pub images: Vec<String>,
    pub category: Option<String>,
    pub created_at: String,
    pub listings: BTreeMap<Marketplace, ListingView>,
}

impl From<&Product> for ProductView {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id().to_string(),
            title: p.title().to_string(),
            description: p.description().to_string(),
            price: p.price().to_string(),
            price_cents: p.price().get(),
            cost_cents: p.cost().get(),
            profit_margin: p.margin().to_string(),
            quantity: p.quantity(),
            images: p.images().to_vec(),
            category: p.category().map(str::to_string),
            created_at: p.created_at().to_rfc3339(),
            listings: Marketplace::ALL
                .into_iter()
                .map(|m| (m, ListingView::from(&p.listing_status(m))))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OutcomeView {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<String>>,
}

impl From<&PublishOutcome> for OutcomeView {
    fn from(outcome: &PublishOutcome) -> Self {
        Self {
            outcome: outcome.kind(),
            external_id: outcome.external_id().map(str::to_string),
            reason: outcome.failure_reason(),
            retry_after_secs: match outcome {
                PublishOutcome::RateLimited { retry_after } => Some(retry_after.as_secs()),
                _ => None,
            },
            violations: match outcome {
                PublishOutcome::Invalid(err) => Some(err.violations.iter().map(ToString::to_string).collect()),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublishReportView {
    pub product_id: String,
    pub correlation_id: String,
    pub results: BTreeMap<Marketplace, OutcomeView>,
}

impl From<&PublishReport> for PublishReportView {
    fn from(report: &PublishReport) -> Self {
        Self {
            product_id: report.product_id.to_string(),
            correlation_id: report.correlation_id.to_string(),
            results: report
                .outcomes
                .iter()
                .map(|(m, outcome)| (*m, OutcomeView::from(outcome)))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConnectionView {
    pub marketplace: Marketplace,
    pub state: CredentialState,
}
