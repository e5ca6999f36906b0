//! Record extraction tests covering both captured payload shapes,
//! skip accounting, and duplicate collapsing.

use blinkit_scraper::extract::RecordExtractor;
use blinkit_scraper::helpers::parse_category_url;
use blinkit_scraper::models::{Combination, Location};

fn combo() -> Combination {
    Combination {
        category: parse_category_url(
            "https://blinkit.com/cn/munchies/bhujia-mixtures/cid/1237/1178",
        ),
        location: Some(Location {
            lat: 28.6,
            lng: 77.2,
            label: None,
        }),
    }
}

const WIDGETS_PAYLOAD: &str = r#"{
    "widgets": [
        {
            "products": [
                {
                    "id": 101,
                    "name": "Bhujia",
                    "variant": "200 g",
                    "group_id": 9,
                    "store_id": "s1",
                    "price": {"selling_price": 45, "mrp": 60},
                    "is_in_stock": true,
                    "inventory": 12,
                    "image_url": "https://cdn.example/bhujia.jpg",
                    "brand_id": 7,
                    "brand": "Bikaji"
                },
                {
                    "id": "102",
                    "name": "Mixture",
                    "price": {"selling_price": "80", "mrp": "80"},
                    "is_in_stock": false
                },
                {
                    "id": 103,
                    "name": "Sev",
                    "price": {},
                    "is_offer": true
                }
            ]
        },
        {"type": "banner"}
    ]
}"#;

const SNIPPETS_PAYLOAD: &str = r#"{
    "response": {
        "snippets": [
            {
                "data": {
                    "name": {"text": "Aloo Bhujia"},
                    "variant": {"text": "400 g"},
                    "normal_price": {"text": "₹95"},
                    "mrp": {"text": "₹120"},
                    "brand_name": {"text": "Haldiram's"},
                    "image": {"url": "https://cdn.example/aloo.jpg"},
                    "product_id": 555,
                    "merchant_id": "m9",
                    "group_id": 42,
                    "inventory": 3,
                    "is_sold_out": false
                }
            },
            {
                "data": {
                    "name": {"text": "Corn Puffs"},
                    "normal_price": {"text": "₹50"},
                    "offer_tag": {"title": "10% OFF"},
                    "product_id": 556
                }
            },
            {"widget": "ad"}
        ]
    }
}"#;

#[test]
fn widgets_payload_maps_all_fields() {
    let mut extractor = RecordExtractor::with_date("2026-08-06".to_string());
    let outcome = extractor.extract(WIDGETS_PAYLOAD, &combo()).unwrap();

    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.skipped, 0);

    let first = &outcome.records[0];
    assert_eq!(first.date, "2026-08-06");
    assert_eq!(first.lat, "28.6");
    assert_eq!(first.lng, "77.2");
    assert_eq!(first.l1_category, "munchies");
    assert_eq!(first.l1_category_id, "1237");
    assert_eq!(first.l2_category, "bhujia-mixtures");
    assert_eq!(first.l2_category_id, "1178");
    assert_eq!(first.store_id, "s1");
    assert_eq!(first.variant_id, "101");
    assert_eq!(first.variant_name, "Bhujia 200 g");
    assert_eq!(first.group_id, "9");
    assert_eq!(first.selling_price, "45");
    assert_eq!(first.mrp, "60");
    assert_eq!(first.in_stock, "Yes");
    assert_eq!(first.inventory, 12);
    assert_eq!(first.is_offer, "Yes");
    assert_eq!(first.image_url, "https://cdn.example/bhujia.jpg");
    assert_eq!(first.brand_id, "7");
    assert_eq!(first.brand, "Bikaji");

    // String-typed ids and equal prices
    let second = &outcome.records[1];
    assert_eq!(second.variant_id, "102");
    assert_eq!(second.variant_name, "Mixture");
    assert_eq!(second.in_stock, "No");
    assert_eq!(second.is_offer, "No");
    assert_eq!(second.inventory, 0);

    // Offer flag without prices
    let third = &outcome.records[2];
    assert_eq!(third.selling_price, "");
    assert_eq!(third.mrp, "");
    assert_eq!(third.is_offer, "Yes");
}

#[test]
fn snippets_payload_maps_wrapped_fields() {
    let mut extractor = RecordExtractor::with_date("2026-08-06".to_string());
    let outcome = extractor.extract(SNIPPETS_PAYLOAD, &combo()).unwrap();

    // The third snippet has no data block and counts as skipped
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.skipped, 1);

    let first = &outcome.records[0];
    assert_eq!(first.variant_name, "Aloo Bhujia 400 g");
    assert_eq!(first.selling_price, "95");
    assert_eq!(first.mrp, "120");
    assert_eq!(first.store_id, "m9");
    assert_eq!(first.variant_id, "555");
    assert_eq!(first.in_stock, "Yes");
    assert_eq!(first.inventory, 3);
    assert_eq!(first.is_offer, "Yes");
    assert_eq!(first.brand, "Haldiram's");
    assert_eq!(first.brand_id, "");

    let second = &outcome.records[1];
    // Missing mrp falls back to the selling price
    assert_eq!(second.selling_price, "50");
    assert_eq!(second.mrp, "50");
    // Offer tag forces the flag even with equal prices
    assert_eq!(second.is_offer, "Yes");
    // Missing sold-out flag counts as sold out
    assert_eq!(second.in_stock, "No");
}

#[test]
fn missing_name_skips_record_not_batch() {
    let payload = r#"{
        "widgets": [{"products": [
            {"id": 1, "name": "Named", "price": {"selling_price": 10, "mrp": 10}},
            {"id": 2, "price": {"selling_price": 20, "mrp": 20}},
            {"id": 3, "name": "  ", "price": {}}
        ]}]
    }"#;

    let mut extractor = RecordExtractor::with_date("2026-08-06".to_string());
    let outcome = extractor.extract(payload, &combo()).unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.skipped, 2);
    // Skip count plus record count equals total input entries
    assert_eq!(outcome.records.len() + outcome.skipped, 3);
}

#[test]
fn duplicates_collapse_across_payloads() {
    let mut extractor = RecordExtractor::with_date("2026-08-06".to_string());

    let first = extractor.extract(WIDGETS_PAYLOAD, &combo()).unwrap();
    assert_eq!(first.records.len(), 3);

    // The same payload again: every entry is a duplicate
    let second = extractor.extract(WIDGETS_PAYLOAD, &combo()).unwrap();
    assert_eq!(second.records.len(), 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(second.records.len() + second.skipped, 3);
}

#[test]
fn malformed_optional_fields_never_raise() {
    let payload = r#"{
        "widgets": [{"products": [
            {
                "id": null,
                "name": "Odd One",
                "group_id": [],
                "store_id": null,
                "price": {"selling_price": null, "mrp": "not-a-price"},
                "inventory": null,
                "image_url": null,
                "brand": null
            }
        ]}]
    }"#;

    let mut extractor = RecordExtractor::with_date("2026-08-06".to_string());
    let outcome = extractor.extract(payload, &combo()).unwrap();

    assert_eq!(outcome.records.len(), 1);
    let record = &outcome.records[0];
    assert_eq!(record.variant_id, "");
    assert_eq!(record.selling_price, "");
    assert_eq!(record.mrp, "not-a-price");
    assert_eq!(record.is_offer, "No");
    assert_eq!(record.inventory, 0);
}

#[test]
fn empty_widgets_payload_yields_no_records() {
    let mut extractor = RecordExtractor::with_date("2026-08-06".to_string());
    let outcome = extractor.extract(r#"{"widgets": []}"#, &combo()).unwrap();
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.skipped, 0);
}

#[test]
fn unparseable_payload_is_an_error() {
    let mut extractor = RecordExtractor::with_date("2026-08-06".to_string());
    assert!(extractor.extract("not json", &combo()).is_err());
    assert!(extractor.extract(r#"{"foo": 1}"#, &combo()).is_err());
}

#[test]
fn default_location_leaves_coordinates_empty() {
    let combo = Combination {
        category: parse_category_url(
            "https://blinkit.com/cn/munchies/bhujia-mixtures/cid/1237/1178",
        ),
        location: None,
    };

    let mut extractor = RecordExtractor::with_date("2026-08-06".to_string());
    let outcome = extractor.extract(WIDGETS_PAYLOAD, &combo).unwrap();
    assert_eq!(outcome.records[0].lat, "");
    assert_eq!(outcome.records[0].lng, "");
}
