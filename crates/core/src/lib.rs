//! `crosslist-core`: shared domain building blocks.
//!
//! Pure types only: identifiers, the marketplace enumeration, money and the
//! domain error model. No IO lives here.

pub mod error;
pub mod id;
pub mod marketplace;
pub mod money;

pub use error::{DomainError, DomainResult};
pub use id::{CorrelationId, ProductId};
pub use marketplace::Marketplace;
pub use money::Cents;
