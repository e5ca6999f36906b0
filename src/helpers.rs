//! Helper functions shared across the pipeline:
//! - Category URL parsing
//! - Artifact name sanitizing
//! - Price text parsing

use crate::models::Category;

/// Parse a category listing URL into its components.
///
/// Example: `https://blinkit.com/cn/munchies/bhujia-mixtures/cid/1237/1178`
/// yields the name `munchies_bhujia-mixtures_1237_1178`. URLs that do not
/// match the pattern fall back to the last two path segments, and finally to
/// the literal `category`.
pub fn parse_category_url(url: &str) -> Category {
    if let Ok(re) = regex::Regex::new(r"/cn/([^/]+)/([^/]+)/cid/(\d+)/(\d+)") {
        if let Some(caps) = re.captures(url) {
            let l1_slug = caps[1].to_string();
            let l2_slug = caps[2].to_string();
            let l1_id = caps[3].to_string();
            let l2_id = caps[4].to_string();
            let name = format!("{}_{}_{}_{}", l1_slug, l2_slug, l1_id, l2_id);
            return Category {
                url: url.to_string(),
                l1_slug,
                l2_slug,
                l1_id,
                l2_id,
                name,
            };
        }
    }

    // Fallback: last two non-empty path segments
    let parts: Vec<&str> = url.split('/').filter(|p| !p.is_empty()).collect();
    let name = if parts.len() >= 2 {
        format!(
            "{}_{}",
            sanitize_component(parts[parts.len() - 2]),
            sanitize_component(parts[parts.len() - 1])
        )
    } else {
        "category".to_string()
    };

    Category {
        url: url.to_string(),
        l1_slug: String::new(),
        l2_slug: String::new(),
        l1_id: String::new(),
        l2_id: String::new(),
        name,
    }
}

/// Reduce a string to a filesystem-safe artifact name component.
pub fn sanitize_component(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Parse a price string as rendered by the site (`"₹45"`, `"45"`, `"45.0"`).
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned = text.replace('₹', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_category_url() {
        let cat =
            parse_category_url("https://blinkit.com/cn/munchies/bhujia-mixtures/cid/1237/1178");
        assert_eq!(cat.l1_slug, "munchies");
        assert_eq!(cat.l2_slug, "bhujia-mixtures");
        assert_eq!(cat.l1_id, "1237");
        assert_eq!(cat.l2_id, "1178");
        assert_eq!(cat.name, "munchies_bhujia-mixtures_1237_1178");
    }

    #[test]
    fn falls_back_to_path_segments() {
        let cat = parse_category_url("https://blinkit.com/some/listing");
        assert_eq!(cat.name, "some_listing");
        assert!(cat.l1_id.is_empty());
    }

    #[test]
    fn degenerate_url_uses_generic_name() {
        assert_eq!(parse_category_url("blinkit").name, "category");
    }

    #[test]
    fn sanitizes_unsafe_characters() {
        assert_eq!(sanitize_component("a b/c:d"), "a_b_c_d");
        assert_eq!(sanitize_component("lat28.6_lng77.2"), "lat28.6_lng77.2");
    }

    #[test]
    fn parses_prices_with_currency_symbol() {
        assert_eq!(parse_price("₹45"), Some(45.0));
        assert_eq!(parse_price(" 45.5 "), Some(45.5));
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("n/a"), None);
    }
}
