//! CSV writer and merger tests: round-trips, merge accounting, and
//! header-mismatch exclusion.

use blinkit_scraper::export::{
    self, CSV_HEADER, MERGED_FILE_NAME, SUMMARY_FILE_NAME,
};
use blinkit_scraper::models::ProductRecord;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn record(variant_id: &str, lat: &str, lng: &str, is_offer: &str) -> ProductRecord {
    ProductRecord {
        date: "2026-08-06".to_string(),
        lat: lat.to_string(),
        lng: lng.to_string(),
        l1_category: "munchies".to_string(),
        l1_category_id: "1237".to_string(),
        l2_category: "bhujia-mixtures".to_string(),
        l2_category_id: "1178".to_string(),
        store_id: "s1".to_string(),
        variant_id: variant_id.to_string(),
        variant_name: format!("Product {}", variant_id),
        group_id: "9".to_string(),
        selling_price: "45".to_string(),
        mrp: "60".to_string(),
        in_stock: "Yes".to_string(),
        inventory: 5,
        is_offer: is_offer.to_string(),
        image_url: String::new(),
        brand_id: "7".to_string(),
        brand: "Bikaji".to_string(),
    }
}

fn read_records(path: &Path) -> Vec<ProductRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .deserialize::<ProductRecord>()
        .map(|r| r.unwrap())
        .collect()
}

#[test]
fn written_csv_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("products_munchies_x.csv");

    let records = vec![
        record("101", "28.6", "77.2", "Yes"),
        record("102", "28.6", "77.2", "No"),
        record("103", "28.6", "77.2", "No"),
    ];
    export::write_combination_csv(&path, &records).unwrap();

    assert_eq!(read_records(&path), records);
}

#[test]
fn empty_combination_writes_header_only() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("products_munchies_y.csv");

    export::write_combination_csv(&path, &[]).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(
        reader.headers().unwrap(),
        &csv::StringRecord::from(CSV_HEADER.as_slice())
    );
    assert_eq!(reader.records().count(), 0);
}

#[test]
fn overwrites_previous_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("products_munchies_x.csv");

    export::write_combination_csv(
        &path,
        &[
            record("101", "28.6", "77.2", "No"),
            record("102", "28.6", "77.2", "No"),
        ],
    )
    .unwrap();
    export::write_combination_csv(&path, &[record("103", "28.6", "77.2", "No")]).unwrap();

    let records = read_records(&path);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].variant_id, "103");
}

#[test]
fn merge_concatenates_data_rows_under_one_header() {
    let dir = tempdir().unwrap();

    export::write_combination_csv(
        &dir.path().join("products_munchies_x.csv"),
        &[
            record("101", "28.6", "77.2", "Yes"),
            record("102", "28.6", "77.2", "No"),
            record("103", "28.6", "77.2", "No"),
        ],
    )
    .unwrap();
    // Empty but well-formed combination
    export::write_combination_csv(&dir.path().join("products_munchies_y.csv"), &[]).unwrap();
    // Unrelated file is not picked up
    fs::write(dir.path().join("notes.txt"), "not a csv").unwrap();

    let report = export::merge_combination_csvs(dir.path()).unwrap();
    assert_eq!(report.files_merged, 2);
    assert!(report.files_excluded.is_empty());
    assert_eq!(report.rows, 3);

    let merged = read_records(&dir.path().join(MERGED_FILE_NAME));
    assert_eq!(merged.len(), 3);

    let content = fs::read_to_string(dir.path().join(MERGED_FILE_NAME)).unwrap();
    assert_eq!(content.lines().count(), 4); // one header + three rows
}

#[test]
fn schema_mismatch_excludes_file_but_continues() {
    let dir = tempdir().unwrap();

    export::write_combination_csv(
        &dir.path().join("products_munchies_x.csv"),
        &[
            record("101", "28.6", "77.2", "No"),
            record("102", "28.6", "77.2", "No"),
        ],
    )
    .unwrap();
    fs::write(
        dir.path().join("products_stale_schema.csv"),
        "name,price\nfoo,1\nbar,2\n",
    )
    .unwrap();

    let report = export::merge_combination_csvs(dir.path()).unwrap();
    assert_eq!(report.files_merged, 1);
    assert_eq!(report.files_excluded.len(), 1);
    assert!(report.files_excluded[0].contains("products_stale_schema.csv"));
    // Excluded rows do not appear in the merged output
    assert_eq!(report.rows, 2);
    assert_eq!(read_records(&report.path).len(), 2);
}

#[test]
fn rerunning_merge_does_not_ingest_its_own_output() {
    let dir = tempdir().unwrap();

    export::write_combination_csv(
        &dir.path().join("products_munchies_x.csv"),
        &[record("101", "28.6", "77.2", "No")],
    )
    .unwrap();

    let first = export::merge_combination_csvs(dir.path()).unwrap();
    assert_eq!(first.rows, 1);
    let second = export::merge_combination_csvs(dir.path()).unwrap();
    assert_eq!(second.rows, 1);
    assert_eq!(second.files_merged, 1);
}

#[test]
fn summary_groups_by_location() {
    let dir = tempdir().unwrap();

    export::write_combination_csv(
        &dir.path().join("products_munchies_x.csv"),
        &[
            record("101", "28.6", "77.2", "Yes"),
            record("102", "28.6", "77.2", "No"),
        ],
    )
    .unwrap();
    export::write_combination_csv(
        &dir.path().join("products_munchies_y.csv"),
        &[record("101", "19.0", "72.8", "No")],
    )
    .unwrap();

    let report = export::merge_combination_csvs(dir.path()).unwrap();
    let summary_path = dir.path().join(SUMMARY_FILE_NAME);
    export::write_summary_csv(&report.path, &summary_path).unwrap();

    let content = fs::read_to_string(&summary_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3); // header + two locations
    assert_eq!(
        lines[0],
        "latitude,longitude,unique_products,products_with_offers,offer_percentage"
    );
    assert!(lines.iter().any(|l| l.starts_with("28.6,77.2,2,1,50")));
    assert!(lines.iter().any(|l| l.starts_with("19.0,72.8,1,0,0")));
}
