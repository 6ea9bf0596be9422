//! County FIPS code utilities.
//!
//! The relationship table splits a county into a two-digit state code and
//! a three-digit county code, while the county-name table stores the
//! combined code as an integer-looking string with the leading zero
//! dropped (e.g. `"6037"` for Los Angeles County). Both are normalized to
//! the five-digit county GEOID before matching.

/// Builds the five-digit county GEOID from separate state and county codes.
///
/// Returns `None` if either part is empty, non-numeric, or too long.
#[must_use]
pub fn county_geoid(state: &str, county: &str) -> Option<String> {
    let state = pad_digits(state, 2)?;
    let county = pad_digits(county, 3)?;
    Some(format!("{state}{county}"))
}

/// Normalizes a combined state+county code to the five-digit county GEOID.
///
/// Returns `None` for empty, non-numeric, or over-long codes.
#[must_use]
pub fn normalize_county_code(code: &str) -> Option<String> {
    pad_digits(code, 5)
}

fn pad_digits(raw: &str, width: usize) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > width || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{raw:0>width$}"))
}
