//! Product catalog: the system of record the publishing pipeline writes
//! listing outcomes into.
//!
//! The domain types here are pure. The stores are small: in-memory for
//! tests and dev, a JSON file for the single-seller deployment.

pub mod export;
pub mod json_store;
pub mod product;
pub mod store;

pub use export::write_csv;
pub use json_store::JsonFileCatalogStore;
pub use product::{ListingStatus, NewProduct, Product, ProfitMargin};
pub use store::{CatalogError, CatalogStore, InMemoryCatalogStore};
