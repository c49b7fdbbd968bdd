//! CSV export of the catalog with per-marketplace listing state.

use std::io::Write;

use thiserror::Error;

use crosslist_core::Marketplace;

use crate::product::Product;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv export failed: {0}")]
    Io(#[from] std::io::Error),
}

const FIXED_COLUMNS: [&str; 9] = [
    "id",
    "title",
    "description",
    "price",
    "cost",
    "profit_margin",
    "quantity",
    "category",
    "created_at",
];

/// Write `products` as CSV, one row per product, with a status and listing-id
/// column pair for every marketplace.
pub fn write_csv<W: Write>(products: &[Product], writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
    for marketplace in Marketplace::ALL {
        header.push(format!("{marketplace}_status"));
        header.push(format!("{marketplace}_listing_id"));
    }
    csv.write_record(&header)?;

    for product in products {
        let mut row = vec![
            product.id().to_string(),
            product.title().to_string(),
            product.description().to_string(),
            product.price().to_string(),
            product.cost().to_string(),
            product.margin().to_string(),
            product.quantity().to_string(),
            product.category().unwrap_or_default().to_string(),
            product.created_at().to_rfc3339(),
        ];
        for marketplace in Marketplace::ALL {
            let status = product.listing_status(marketplace);
            row.push(status.label().to_string());
            row.push(status.external_id().unwrap_or_default().to_string());
        }
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}
