//! Street address normalization for geocoding queries
//!
//! Reduces a free-text street address to `number name [type]` and joins the
//! tokens with `+`, which is the form the geocoding service matches best.

use crate::tagger::{self, Component};
use std::collections::BTreeMap;
use tracing::{debug, warn};

type ComponentMap = BTreeMap<Component, String>;

/// Normalize a raw street address into a query fragment
///
/// Tagging falls back from [`tagger::tag`] to [`tagger::parse`] and finally
/// to the raw text. The result never contains a space and is only empty when
/// `raw_address` is.
pub fn normalize(raw_address: &str) -> String {
    let fragment = components(raw_address)
        .and_then(|map| street_fragment(&map))
        .unwrap_or_else(|| raw_address.to_string());

    fragment.replace(' ', "+")
}

/// Map each component label to its text, or `None` when both tagging tiers fail
fn components(raw_address: &str) -> Option<ComponentMap> {
    match tagger::tag(raw_address) {
        Ok(tagged) => return Some(tagged.components.into_iter().collect()),
        Err(e) => debug!("tagging '{}' failed, falling back to parse: {}", raw_address, e),
    }

    match tagger::parse(raw_address) {
        // Later tokens overwrite earlier ones carrying the same label
        Ok(tokens) => Some(tokens.into_iter().map(|(text, label)| (label, text)).collect()),
        Err(e) => {
            warn!("Couldn't parse: {}: {}", raw_address, e);
            None
        }
    }
}

fn street_fragment(map: &ComponentMap) -> Option<String> {
    let number = map.get(&Component::AddressNumber)?;
    let name = map.get(&Component::StreetName)?;

    let mut fragment = format!("{} {}", number, name);
    if let Some(street_type) = map.get(&Component::StreetNamePostType) {
        fragment.push(' ');
        fragment.push_str(street_type);
    }
    Some(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_number_name_type() {
        assert_eq!(normalize("123 Main St"), "123+Main+St");
    }

    #[test]
    fn test_normalize_without_street_type() {
        assert_eq!(normalize("77 Broadway"), "77+Broadway");
    }

    #[test]
    fn test_normalize_drops_unit_and_directionals() {
        assert_eq!(normalize("500 N Lake Shore Dr NE Apt 12"), "500+Lake+Shore+Dr");
        assert_eq!(normalize("123 Main St, Springfield, IL 62701"), "123+Main+St");
    }

    #[test]
    fn test_normalize_po_box_keeps_raw_text() {
        assert_eq!(normalize("PO Box 44"), "PO+Box+44");
    }

    #[test]
    fn test_normalize_without_house_number_keeps_raw_text() {
        assert_eq!(normalize("Main St & Oak Ave"), "Main+St+&+Oak+Ave");
    }

    #[test]
    fn test_normalize_repeated_labels_use_parse_tier() {
        // tag refuses two street addresses; parse keeps the last of each label
        assert_eq!(normalize("12 Main St 40 Oak Ave"), "40+Oak+Ave");
    }

    #[test]
    fn test_normalize_unparseable_keeps_raw_text() {
        assert_eq!(normalize("   "), "+++");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_never_contains_spaces() {
        let inputs = [
            "123 Main St",
            "1600 Martin Luther King Jr Blvd",
            "PO Box 44",
            "  221 1/2   Baker St  ",
            "Main St & Oak Ave",
            "Broadway",
            "12 Main St 40 Oak Ave",
        ];
        for input in inputs {
            let out = normalize(input);
            assert!(!out.contains(' '), "{:?} -> {:?}", input, out);
            assert!(!out.is_empty());
        }
    }
}
