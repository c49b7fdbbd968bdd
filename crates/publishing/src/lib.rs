//! `crosslist-publishing`: pushes catalog products to marketplaces.
//!
//! The [`PublishOrchestrator`] runs one branch per requested marketplace:
//! credential, mapping, publish with bounded retries, and the resulting
//! listing status written back to the catalog. [`AuthorizationFlow`] covers
//! the OAuth authorization-code round trip that puts credentials in place.

pub mod authorization;
pub mod config;
pub mod error;
pub mod locks;
pub mod orchestrator;
pub mod outcome;
pub mod recorder;
pub mod registry;
pub mod retry;

pub use authorization::AuthorizationFlow;
pub use config::PublishConfig;
pub use error::{AuthorizationError, PublishError, RegistryError};
pub use locks::ListingLocks;
pub use orchestrator::PublishOrchestrator;
pub use outcome::{PublishAttempt, PublishOutcome, PublishReport};
pub use recorder::{ListingRecorder, PendingListing};
pub use registry::{MarketplaceAdapter, MarketplaceRegistry};
pub use retry::{BackoffStrategy, RetryPolicy, RetryState};

pub use tokio_util::sync::CancellationToken;
