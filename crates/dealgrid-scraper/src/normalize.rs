//! Pure text normalizers shared by the extractors and the discovery crawler.
//!
//! Nothing here touches a page: every function maps a noisy string scraped
//! from the DOM to a number, slug, or identifier, and falls back to a zero
//! or empty value instead of failing.

use std::sync::LazyLock;

use regex::Regex;

/// First decimal number, optionally with thousands separators.
static PRICE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d,]+(?:\.\d+)?").expect("valid regex"));

static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

static PERCENT_BADGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)%").expect("valid regex"));

static SLUG_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}-]+").expect("valid regex"));

static PERCENT_SAVINGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*percent savings").expect("valid regex"));

/// Parses the first price-like token in `raw`.
///
/// `"AED 1,079.00"` → `1079.0`; `"List Price: AED 219.41"` → `219.41`.
/// Returns `0.0` when there is no number or the token does not parse
/// (e.g. a bare `","`).
#[must_use]
pub fn parse_price(raw: &str) -> f64 {
    let Some(token) = PRICE_TOKEN_RE.find(raw) else {
        return 0.0;
    };
    let cleaned = token.as_str().replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(raw, token = token.as_str(), error = %e, "unparsable price token");
            0.0
        }
    }
}

/// First run of digits in `raw`, tolerating signs and symbols (`"-46%"` → 46).
#[must_use]
pub fn parse_percent(raw: &str) -> Option<u32> {
    INTEGER_RE
        .find(raw)
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Percentage from a results-card badge such as `"35% off"`.
#[must_use]
pub fn parse_badge_percent(raw: &str) -> Option<u32> {
    PERCENT_BADGE_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Percentage from accessibility text like `"with 46 percent savings"`.
#[must_use]
pub fn parse_percent_savings(raw: &str) -> Option<u32> {
    PERCENT_SAVINGS_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Builds a URL-safe slug: spaces become hyphens, anything that is not a
/// letter, digit, or hyphen is dropped, and the result is lowercased.
///
/// Letters outside ASCII (e.g. Arabic titles) are kept; combining marks such
/// as Arabic vowel signs are not letters and are dropped.
#[must_use]
pub fn create_slug(title: &str) -> String {
    let hyphenated = title.replace(' ', "-");
    SLUG_STRIP_RE.replace_all(&hyphenated, "").to_lowercase()
}

/// Extracts the item identifier from an item URL.
///
/// Handles `/dp/<id>` and `/gp/<kind>/<id>` paths, ignoring any query string,
/// fragment, or trailing path segments.
#[must_use]
pub fn item_id_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    while let Some(segment) = segments.next() {
        match segment {
            "dp" => return segments.next().map(str::to_string),
            "gp" => return segments.nth(1).map(str::to_string),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
