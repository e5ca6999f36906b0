//! Listing payload extraction.
//!
//! The captured API bodies come in two shapes: a `widgets` tree with nested
//! product objects, and a `snippets` tree where every field is wrapped in a
//! `{text: ...}` object and prices carry a currency symbol. Both map onto the
//! same ProductRecord schema. Records missing a product name are skipped and
//! counted, never fatal; duplicate products within a combination collapse to
//! one record and also count as skipped, so for every payload batch
//! `records + skipped == total entries`.

use crate::helpers::parse_price;
use crate::models::{Combination, ProductRecord};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid listing payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingPayload {
    Widgets(WidgetsPayload),
    Snippets(SnippetsPayload),
}

#[derive(Debug, Deserialize)]
struct WidgetsPayload {
    widgets: Vec<Widget>,
}

#[derive(Debug, Deserialize)]
struct Widget {
    #[serde(default)]
    products: Vec<WidgetProduct>,
}

/// Product object in the `widgets` shape. Ids arrive as numbers or strings
/// depending on the endpoint version, hence the raw `Value` fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WidgetProduct {
    id: Option<Value>,
    name: Option<String>,
    variant: Option<String>,
    group_id: Option<Value>,
    store_id: Option<Value>,
    price: PriceBlock,
    is_in_stock: Option<bool>,
    inventory: Option<i64>,
    image_url: Option<String>,
    brand_id: Option<Value>,
    brand: Option<String>,
    is_offer: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PriceBlock {
    selling_price: Option<Value>,
    mrp: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SnippetsPayload {
    response: SnippetsResponse,
}

#[derive(Debug, Deserialize)]
struct SnippetsResponse {
    snippets: Vec<Snippet>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    data: Option<SnippetData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SnippetData {
    name: Option<TextValue>,
    variant: Option<TextValue>,
    normal_price: Option<TextValue>,
    mrp: Option<TextValue>,
    brand_name: Option<TextValue>,
    image: Option<ImageValue>,
    product_id: Option<Value>,
    merchant_id: Option<Value>,
    group_id: Option<Value>,
    inventory: Option<i64>,
    is_sold_out: Option<bool>,
    offer_tag: Option<Value>,
    offer: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TextValue {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageValue {
    url: Option<String>,
}

/// Result of extracting one payload batch.
#[derive(Debug, Default)]
pub struct ExtractOutcome {
    pub records: Vec<ProductRecord>,
    pub skipped: usize,
}

/// Maps payloads to records for one combination, deduplicating across the
/// combination's payloads.
pub struct RecordExtractor {
    seen: HashSet<String>,
    date: String,
}

impl RecordExtractor {
    pub fn new() -> Self {
        Self::with_date(chrono::Local::now().format("%Y-%m-%d").to_string())
    }

    /// Fixed-date constructor, used by tests.
    pub fn with_date(date: String) -> Self {
        Self {
            seen: HashSet::new(),
            date,
        }
    }

    /// Extract all product records from one raw payload body.
    pub fn extract(
        &mut self,
        raw: &str,
        combo: &Combination,
    ) -> Result<ExtractOutcome, ExtractError> {
        let payload: ListingPayload = serde_json::from_str(raw)?;
        let mut outcome = ExtractOutcome::default();

        match payload {
            ListingPayload::Widgets(w) => {
                for widget in &w.widgets {
                    for product in &widget.products {
                        self.push_widget_product(product, combo, &mut outcome);
                    }
                }
            }
            ListingPayload::Snippets(s) => {
                for snippet in &s.response.snippets {
                    match &snippet.data {
                        Some(data) => self.push_snippet_product(data, combo, &mut outcome),
                        None => outcome.skipped += 1,
                    }
                }
            }
        }

        Ok(outcome)
    }

    fn push_widget_product(
        &mut self,
        product: &WidgetProduct,
        combo: &Combination,
        outcome: &mut ExtractOutcome,
    ) {
        let name = product.name.clone().unwrap_or_default();
        let variant = product.variant.clone().unwrap_or_default();
        let variant_name = format!("{} {}", name, variant).trim().to_string();
        if name.trim().is_empty() {
            outcome.skipped += 1;
            return;
        }

        let selling_price = value_to_string(&product.price.selling_price);
        let mrp = value_to_string(&product.price.mrp);
        let has_offer = product.is_offer == Some(true) || price_drop(&mrp, &selling_price);

        let record = ProductRecord {
            date: self.date.clone(),
            lat: lat_string(combo),
            lng: lng_string(combo),
            l1_category: combo.category.l1_slug.clone(),
            l1_category_id: combo.category.l1_id.clone(),
            l2_category: combo.category.l2_slug.clone(),
            l2_category_id: combo.category.l2_id.clone(),
            store_id: value_to_string(&product.store_id),
            variant_id: value_to_string(&product.id),
            variant_name,
            group_id: value_to_string(&product.group_id),
            selling_price,
            mrp,
            in_stock: yes_no(product.is_in_stock == Some(true)),
            inventory: product.inventory.unwrap_or(0),
            is_offer: yes_no(has_offer),
            image_url: product.image_url.clone().unwrap_or_default(),
            brand_id: value_to_string(&product.brand_id),
            brand: product.brand.clone().unwrap_or_default(),
        };

        self.push_deduplicated(record, outcome);
    }

    fn push_snippet_product(
        &mut self,
        data: &SnippetData,
        combo: &Combination,
        outcome: &mut ExtractOutcome,
    ) {
        let name = text_of(&data.name);
        if name.trim().is_empty() {
            outcome.skipped += 1;
            return;
        }
        let variant = text_of(&data.variant);
        let variant_name = format!("{} {}", name, variant).trim().to_string();

        let selling_price = strip_currency(&text_of(&data.normal_price));
        let mrp_raw = strip_currency(&text_of(&data.mrp));
        let mrp = if mrp_raw.is_empty() {
            selling_price.clone()
        } else {
            mrp_raw
        };

        let has_offer = data.offer_tag.as_ref().map_or(false, |v| !v.is_null())
            || price_drop(&mrp, &selling_price)
            || offer_field_set(&data.offer, &mrp, &selling_price);

        let record = ProductRecord {
            date: self.date.clone(),
            lat: lat_string(combo),
            lng: lng_string(combo),
            l1_category: combo.category.l1_slug.clone(),
            l1_category_id: combo.category.l1_id.clone(),
            l2_category: combo.category.l2_slug.clone(),
            l2_category_id: combo.category.l2_id.clone(),
            store_id: value_to_string(&data.merchant_id),
            variant_id: value_to_string(&data.product_id),
            variant_name,
            group_id: value_to_string(&data.group_id),
            selling_price,
            mrp,
            // A missing sold-out flag counts as sold out
            in_stock: yes_no(data.is_sold_out == Some(false)),
            inventory: data.inventory.unwrap_or(0),
            is_offer: yes_no(has_offer),
            image_url: data
                .image
                .as_ref()
                .and_then(|i| i.url.clone())
                .unwrap_or_default(),
            brand_id: String::new(),
            brand: text_of(&data.brand_name),
        };

        self.push_deduplicated(record, outcome);
    }

    fn push_deduplicated(&mut self, record: ProductRecord, outcome: &mut ExtractOutcome) {
        let key = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            record.l1_category,
            record.l2_category,
            record.variant_id,
            record.variant_name,
            record.group_id,
            record.selling_price,
            record.mrp,
            record.brand,
        );

        if self.seen.insert(key) {
            outcome.records.push(record);
        } else {
            outcome.skipped += 1;
        }
    }
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn lat_string(combo: &Combination) -> String {
    combo
        .location
        .as_ref()
        .map(|l| l.lat.to_string())
        .unwrap_or_default()
}

fn lng_string(combo: &Combination) -> String {
    combo
        .location
        .as_ref()
        .map(|l| l.lng.to_string())
        .unwrap_or_default()
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

fn text_of(value: &Option<TextValue>) -> String {
    value
        .as_ref()
        .and_then(|t| t.text.clone())
        .unwrap_or_default()
}

fn strip_currency(text: &str) -> String {
    text.replace('₹', "").trim().to_string()
}

/// Scalar that may arrive as a JSON number or string.
fn value_to_string(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// True when both prices parse and the list price exceeds the selling price.
fn price_drop(mrp: &str, selling_price: &str) -> bool {
    match (parse_price(mrp), parse_price(selling_price)) {
        (Some(m), Some(s)) => m > s,
        _ => false,
    }
}

/// The `offer` field counts when it is set, not false, and either truthy
/// itself or accompanied by differing prices.
fn offer_field_set(offer: &Option<Value>, mrp: &str, selling_price: &str) -> bool {
    match offer {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(value) => value_truthy(value) || mrp != selling_price,
    }
}

fn value_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_numeric_and_string_scalars() {
        assert_eq!(value_to_string(&Some(Value::from(42))), "42");
        assert_eq!(value_to_string(&Some(Value::from("abc"))), "abc");
        assert_eq!(value_to_string(&None), "");
        assert_eq!(value_to_string(&Some(Value::Null)), "");
    }

    #[test]
    fn detects_price_drop() {
        assert!(price_drop("60", "45"));
        assert!(!price_drop("45", "45"));
        assert!(!price_drop("", "45"));
        assert!(!price_drop("abc", "45"));
    }

    #[test]
    fn offer_field_semantics() {
        assert!(!offer_field_set(&None, "45", "45"));
        assert!(!offer_field_set(&Some(Value::Bool(false)), "60", "45"));
        assert!(offer_field_set(&Some(Value::Bool(true)), "45", "45"));
        // Falsy-but-set offer still counts when prices differ
        assert!(offer_field_set(&Some(Value::from("")), "60", "45"));
        assert!(!offer_field_set(&Some(Value::from("")), "45", "45"));
    }
}
