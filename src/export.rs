use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::models::Listing;

/// Write the surviving listings to `path` as UTF-8 CSV, header first, rows
/// in ascending id order.
pub fn export(listings: &[Listing], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    export_to_writer(listings, file)?;
    info!("Saved {} listings to {}", listings.len(), path.display());
    Ok(())
}

pub fn export_to_writer<W: Write>(listings: &[Listing], writer: W) -> Result<()> {
    let mut ordered: Vec<&Listing> = listings.iter().collect();
    ordered.sort_by_key(|l| l.id);

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["ID", "Title", "Price", "URL"])?;
    for listing in ordered {
        let price = listing.price.map(|p| p.to_string()).unwrap_or_default();
        wtr.write_record([
            listing.id.to_string().as_str(),
            &listing.title,
            &price,
            &listing.url,
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
