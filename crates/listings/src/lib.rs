//! `crosslist-listings`: the per-marketplace listing capabilities.
//!
//! A [`SchemaMapper`] turns a catalog product into a marketplace payload and
//! a [`Publisher`] sends that payload. Both are implemented per marketplace in
//! `crosslist-marketplaces`; this crate holds only the contracts and the
//! shared response classification.

pub mod classify;
pub mod mapper;
pub mod payload;
pub mod publisher;
pub mod validation;

pub use classify::{ClassificationRule, ClassificationTable, ResponseClass, StatusRange};
pub use mapper::SchemaMapper;
pub use payload::MarketplacePayload;
pub use publisher::{PublishResult, Publisher};
pub use validation::{FieldViolation, ValidationError, Violations};
