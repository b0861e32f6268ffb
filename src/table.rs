// CSV tables exchanged with the rest of the listing workflow.
//
// candidates: brand,product_name,image_url
// results:    brand,product_name,image_url
// products:   brand,product_name
// listings:   brand,product_name,image_url,processed_image_path (appended to)

use crate::core_modules::candidate::{CandidateImage, SelectionResult};
use crate::error::TableError;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;

/// A product to search candidate images for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRow {
    pub brand: String,
    pub product_name: String,
}

impl ProductRow {
    pub fn query(&self) -> String {
        format!("{} {}", self.brand, self.product_name)
    }
}

/// One finished product in the persistent listings table. `processed_image_path`
/// is empty when background removal failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRow {
    pub brand: String,
    pub product_name: String,
    pub image_url: String,
    pub processed_image_path: String,
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, TableError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Writes the header even when there are no rows, so an empty result is still a valid table.
fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<(), TableError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_candidates(path: &Path) -> Result<Vec<CandidateImage>, TableError> {
    read_rows(path)
}

pub fn write_candidates(path: &Path, candidates: &[CandidateImage]) -> Result<(), TableError> {
    write_rows(path, &["brand", "product_name", "image_url"], candidates)
}

pub fn read_products(path: &Path) -> Result<Vec<ProductRow>, TableError> {
    read_rows(path)
}

pub fn write_results(path: &Path, results: &[SelectionResult]) -> Result<(), TableError> {
    write_rows(path, &["brand", "product_name", "image_url"], results)
}

/// Appends one row, creating the table with its header when it does not exist yet.
pub fn append_listing(path: &Path, listing: &ListingRow) -> Result<(), TableError> {
    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(is_new).from_writer(file);
    writer.serialize(listing)?;
    writer.flush()?;
    Ok(())
}

pub fn read_listings(path: &Path) -> Result<Vec<ListingRow>, TableError> {
    read_rows(path)
}
