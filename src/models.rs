use serde::{Deserialize, Serialize};

/// One extracted product row. Field order is the CSV column order and must stay
/// stable across all per-combination files for the merger to concatenate them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub date: String,
    pub lat: String,
    pub lng: String,
    pub l1_category: String,
    pub l1_category_id: String,
    pub l2_category: String,
    pub l2_category_id: String,
    pub store_id: String,
    pub variant_id: String,
    pub variant_name: String,
    pub group_id: String,
    pub selling_price: String,
    pub mrp: String,
    pub in_stock: String,
    pub inventory: i64,
    pub is_offer: String,
    pub image_url: String,
    pub brand_id: String,
    pub brand: String,
}

/// A category listing page, parsed from a URL of the form
/// `https://blinkit.com/cn/<l1-slug>/<l2-slug>/cid/<l1-id>/<l2-id>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub url: String,
    pub l1_slug: String,
    pub l2_slug: String,
    pub l1_id: String,
    pub l2_id: String,
    /// `<l1-slug>_<l2-slug>_<l1-id>_<l2-id>`, or a fallback derived from the
    /// last path segments when the URL does not match the expected pattern.
    pub name: String,
}

/// A delivery location. The site resolves inventory per store, so the same
/// category can yield different rows at different coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub label: Option<String>,
}

impl Location {
    /// Filesystem-safe identifier used in artifact names.
    pub fn slug(&self) -> String {
        match &self.label {
            Some(label) => crate::helpers::sanitize_component(label),
            None => format!("lat{}_lng{}", self.lat, self.lng),
        }
    }
}

/// One (category, location) pair driving a single pipeline iteration.
/// `location: None` means the site's default location.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub category: Category,
    pub location: Option<Location>,
}

impl Combination {
    pub fn location_slug(&self) -> String {
        match &self.location {
            Some(loc) => loc.slug(),
            None => "default_location".to_string(),
        }
    }

    /// Human-readable name used in logs and the run summary.
    pub fn name(&self) -> String {
        format!("{} @ {}", self.category.name, self.location_slug())
    }

    /// File name of the per-combination CSV inside the output directory.
    pub fn csv_file_name(&self) -> String {
        format!("products_{}_{}.csv", self.category.name, self.location_slug())
    }

    /// Directory holding this combination's raw payload snapshots,
    /// relative to the output directory.
    pub fn raw_dir(&self) -> String {
        format!("raw/{}/{}", self.category.name, self.location_slug())
    }
}

/// What happened to one combination. "No products" and "failed to capture"
/// are deliberately distinct: an empty combination still writes a header-only
/// CSV, a failed one writes nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum CombinationOutcome {
    /// Extracted and written to CSV.
    Scraped { records: usize, skipped: usize },
    /// Raw payloads captured, extraction deferred (scrape-only mode).
    Captured { payloads: usize },
    /// Well-formed payloads with zero products; a header-only CSV exists.
    Empty,
    /// Nothing was produced for this combination.
    Failed(String),
}

impl CombinationOutcome {
    /// True when the combination produced a non-empty CSV file.
    pub fn produced_rows(&self) -> bool {
        matches!(self, CombinationOutcome::Scraped { records, .. } if *records > 0)
    }
}
