//! Canonical forms for raw GTFS field values.
//!
//! Static tables and the realtime feed disagree on how identifiers are typed
//! (a route id may arrive as `20` from one source and `"20"` from another), so
//! every comparison between the two goes through [`coerce_id`].

use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Deserializer};

/// Converts any value to its trimmed textual form. Absent values become `""`.
pub fn normalize_value<T: Display>(raw: Option<T>) -> String {
    match raw {
        Some(value) => value.to_string().trim().to_string(),
        None => String::new(),
    }
}

/// Textual form of an identifier, used on both sides of every id comparison.
pub fn coerce_id<T: Display + ?Sized>(id: &T) -> String {
    id.to_string().trim().to_string()
}

/// Resolves a raw `route_color` into a `#RRGGBB` display color.
///
/// GTFS publishers use `000000` (and an empty field) to mean "no color", so
/// black goes through the same fallback chain as malformed input:
/// `fallbacks[short_name]`, then `default_color`.
pub fn normalize_color(
    raw: &str,
    fallbacks: &HashMap<String, String>,
    short_name: &str,
    default_color: &str,
) -> String {
    let stripped = raw.trim();
    let stripped = stripped.strip_prefix('#').unwrap_or(stripped).to_uppercase();
    let padded = format!("{stripped:0>6}");

    if !is_hex_color_body(&stripped) || padded == "000000" {
        return fallbacks
            .get(short_name)
            .cloned()
            .unwrap_or_else(|| default_color.to_string());
    }

    format!("#{padded}")
}

/// Matches `^[0-9A-F]{1,6}$`.
fn is_hex_color_body(s: &str) -> bool {
    !s.is_empty() && s.len() <= 6 && s.chars().all(|c| matches!(c, '0'..='9' | 'A'..='F'))
}

/// Returns the canonical `#RRGGBB` form of a fully specified color, if it is one.
pub fn canonical_hex_color(color: &str) -> Option<String> {
    let body = color.trim().strip_prefix('#')?.to_uppercase();
    (body.len() == 6 && is_hex_color_body(&body)).then(|| format!("#{body}"))
}

/// Serde adapter applying [`normalize_value`] while deserializing a table column.
pub fn normalized<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(normalize_value(raw))
}

/// Like [`normalized`], but an empty result becomes `None`.
pub fn normalized_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = normalized(deserializer)?;
    Ok((!value.is_empty()).then_some(value))
}
