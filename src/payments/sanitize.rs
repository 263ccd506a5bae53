//! Field sanitizing and truncation
//!
//! The gateway enforces low byte-length limits on many fields. Non-essential
//! fields are shortened rather than failing the transaction: a clipped
//! description on the payment page is better than no payment at all.

use crate::payments::types::FieldMap;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Basket field delimiter
pub const BASKET_DELIMITER: &str = ":";

/// Maximum encoded length of the `Basket` field, in bytes
pub const BASKET_FIELD_LENGTH: usize = 7500;

const FIELD_LENGTHS: &[(&str, usize)] = &[("Description", 100), ("CustomerEMail", 255)];

const ADDRESS_FIELD_LENGTHS: &[(&str, usize)] = &[
    ("Surname", 20),
    ("Firstnames", 20),
    ("Address1", 20),
    ("Address2", 20),
    ("City", 40),
    ("PostCode", 10),
    ("State", 2),
    ("Country", 2),
    ("Phone", 20),
];

const ADDRESS_PREFIXES: &[&str] = &["Billing", "Delivery"];

// Control characters and the delimiter cannot be escaped inside a basket line.
static INVALID_BASKET_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1f\x7f-\x9f:]").expect("static regex"));

/// Byte limit for every truncated field, address fields expanded for both
/// billing and delivery prefixes
pub fn field_limits() -> Vec<(String, usize)> {
    let mut limits: Vec<(String, usize)> = FIELD_LENGTHS
        .iter()
        .map(|(name, len)| (name.to_string(), *len))
        .collect();
    for prefix in ADDRESS_PREFIXES {
        limits.extend(
            ADDRESS_FIELD_LENGTHS
                .iter()
                .map(|(name, len)| (format!("{}{}", prefix, name), *len)),
        );
    }
    limits
}

/// Replace characters that would corrupt a delimited encoding with a space
pub fn sanitize_basket_text(value: &str) -> String {
    INVALID_BASKET_CHARS.replace_all(value, " ").into_owned()
}

/// Truncate `value` so its UTF-8 encoding is at most `max_bytes` long.
///
/// A code point straddling the limit is dropped entirely.
pub fn utf8_truncate(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Apply gateway length limits to an outgoing field set.
///
/// An over-long `Basket` is removed outright: cutting it would leave a
/// structurally broken delimited list.
pub fn truncate_overlong_fields(fields: &FieldMap) -> FieldMap {
    let mut out = fields.clone();

    if let Some(basket) = out.remove("Basket") {
        if basket.len() <= BASKET_FIELD_LENGTH {
            out.insert("Basket".to_string(), basket);
        } else {
            warn!(
                "Dropping basket: encoded length {} exceeds {} bytes",
                basket.len(),
                BASKET_FIELD_LENGTH
            );
        }
    }

    for (name, limit) in field_limits() {
        if let Some(value) = out.get_mut(&name) {
            if value.len() > limit {
                debug!("Truncating field {} from {} to {} bytes", name, value.len(), limit);
                let truncated = utf8_truncate(value, limit).to_string();
                *value = truncated;
            }
        }
    }

    out
}
