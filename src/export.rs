//! CSV artifacts: per-combination files, the merged file, and the summary.
//!
//! Every file shares the ProductRecord column order, which is what lets the
//! merger concatenate data rows under a single header. Files whose header
//! deviates are excluded from the merge, never fatal.

use crate::models::ProductRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixed name of the consolidated output file.
pub const MERGED_FILE_NAME: &str = "blinkit_products.csv";

/// Fixed name of the per-location summary file.
pub const SUMMARY_FILE_NAME: &str = "summary.csv";

/// Expected header of every per-combination file, in column order.
pub const CSV_HEADER: [&str; 19] = [
    "date",
    "lat",
    "lng",
    "l1_category",
    "l1_category_id",
    "l2_category",
    "l2_category_id",
    "store_id",
    "variant_id",
    "variant_name",
    "group_id",
    "selling_price",
    "mrp",
    "in_stock",
    "inventory",
    "is_offer",
    "image_url",
    "brand_id",
    "brand",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("header mismatch in {file}")]
    SchemaMismatch { file: String },
}

/// Write one combination's records. Always writes the header row, so an
/// empty combination still yields a well-formed (header-only) file.
/// Overwrites any existing file of the same name.
pub fn write_combination_csv(
    path: &Path,
    records: &[ProductRecord],
) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;

    if records.is_empty() {
        writer.write_record(CSV_HEADER)?;
    } else {
        for record in records {
            writer.serialize(record)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Outcome of one merge pass.
#[derive(Debug)]
pub struct MergeReport {
    pub path: PathBuf,
    pub files_merged: usize,
    pub files_excluded: Vec<String>,
    pub rows: usize,
}

/// Concatenate every per-combination CSV in `output_dir` into the merged
/// file. Files are matched by the `products_*.csv` naming convention;
/// a file whose header differs is logged, reported, and excluded.
pub fn merge_combination_csvs(output_dir: &Path) -> Result<MergeReport, ExportError> {
    let mut sources: Vec<PathBuf> = std::fs::read_dir(output_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_combination_csv(path))
        .collect();
    sources.sort();

    let merged_path = output_dir.join(MERGED_FILE_NAME);
    let mut writer = csv::Writer::from_path(&merged_path)?;
    writer.write_record(CSV_HEADER)?;

    let mut report = MergeReport {
        path: merged_path,
        files_merged: 0,
        files_excluded: Vec::new(),
        rows: 0,
    };

    for source in &sources {
        match append_rows(&mut writer, source) {
            Ok(rows) => {
                report.files_merged += 1;
                report.rows += rows;
            }
            Err(ExportError::SchemaMismatch { file }) => {
                log::error!("excluding {} from merge: header mismatch", file);
                report.files_excluded.push(file);
            }
            Err(e) => return Err(e),
        }
    }

    writer.flush()?;
    Ok(report)
}

fn is_combination_csv(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "csv")
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |name| name.starts_with("products_"))
}

fn append_rows(
    writer: &mut csv::Writer<std::fs::File>,
    source: &Path,
) -> Result<usize, ExportError> {
    let mut reader = csv::Reader::from_path(source)?;

    let header = reader.headers()?;
    if header != &csv::StringRecord::from(CSV_HEADER.as_slice()) {
        return Err(ExportError::SchemaMismatch {
            file: source.display().to_string(),
        });
    }

    let mut rows = 0;
    for row in reader.records() {
        writer.write_record(&row?)?;
        rows += 1;
    }
    Ok(rows)
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    latitude: String,
    longitude: String,
    unique_products: usize,
    products_with_offers: usize,
    offer_percentage: f64,
}

/// Per-location rollup of the merged file: unique products, offer counts,
/// and the offer percentage, one row per (lat, lng).
pub fn write_summary_csv(merged_path: &Path, out_path: &Path) -> Result<(), ExportError> {
    let mut reader = csv::Reader::from_path(merged_path)?;

    let mut groups: BTreeMap<(String, String), (std::collections::HashSet<String>, usize)> =
        BTreeMap::new();

    for row in reader.deserialize::<ProductRecord>() {
        let record = row?;
        let entry = groups
            .entry((record.lat.clone(), record.lng.clone()))
            .or_default();
        entry.0.insert(record.variant_id.clone());
        if record.is_offer == "Yes" {
            entry.1 += 1;
        }
    }

    let mut writer = csv::Writer::from_path(out_path)?;
    if groups.is_empty() {
        writer.write_record([
            "latitude",
            "longitude",
            "unique_products",
            "products_with_offers",
            "offer_percentage",
        ])?;
    }
    for ((lat, lng), (variants, offers)) in groups {
        let unique = variants.len();
        let percentage = if unique == 0 {
            0.0
        } else {
            (offers as f64 / unique as f64 * 10000.0).round() / 100.0
        };
        writer.serialize(SummaryRow {
            latitude: lat,
            longitude: lng,
            unique_products: unique,
            products_with_offers: offers,
            offer_percentage: percentage,
        })?;
    }
    writer.flush()?;
    Ok(())
}
