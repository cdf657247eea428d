use super::*;

// -----------------------------------------------------------------------
// parse_price
// -----------------------------------------------------------------------

#[test]
fn parse_price_strips_currency_and_thousands_separator() {
    assert!((parse_price("AED 1,079.00") - 1079.0).abs() < f64::EPSILON);
}

#[test]
fn parse_price_reads_label_prefixed_text() {
    assert!((parse_price("List Price: AED 219.41") - 219.41).abs() < f64::EPSILON);
}

#[test]
fn parse_price_integer_only() {
    assert!((parse_price("AED119") - 119.0).abs() < f64::EPSILON);
}

#[test]
fn parse_price_no_digits_is_zero() {
    assert!(parse_price("No Price").abs() < f64::EPSILON);
}

#[test]
fn parse_price_empty_is_zero() {
    assert!(parse_price("").abs() < f64::EPSILON);
}

#[test]
fn parse_price_lone_separator_is_zero() {
    assert!(parse_price("a, b").abs() < f64::EPSILON);
}

// -----------------------------------------------------------------------
// percentages
// -----------------------------------------------------------------------

#[test]
fn parse_percent_ignores_sign_and_symbol() {
    assert_eq!(parse_percent("-46%"), Some(46));
}

#[test]
fn parse_percent_none_without_digits() {
    assert_eq!(parse_percent("savings"), None);
}

#[test]
fn parse_badge_percent_reads_off_badge() {
    assert_eq!(parse_badge_percent("35% off"), Some(35));
    assert_eq!(parse_badge_percent("Limited time deal"), None);
}

#[test]
fn parse_percent_savings_reads_accessibility_text() {
    assert_eq!(
        parse_percent_savings("-46% AED 119.00 with 46 percent savings"),
        Some(46)
    );
    assert_eq!(parse_percent_savings("List Price: AED 219.41"), None);
}

// -----------------------------------------------------------------------
// create_slug
// -----------------------------------------------------------------------

#[test]
fn create_slug_hyphenates_and_lowercases() {
    assert_eq!(
        create_slug("Wireless Earbuds, Pro (2nd Gen)"),
        "wireless-earbuds-pro-2nd-gen"
    );
}

#[test]
fn create_slug_keeps_non_ascii_letters() {
    assert_eq!(create_slug("سماعات لاسلكية"), "سماعات-لاسلكية");
}

#[test]
fn create_slug_drops_arabic_vowel_marks() {
    assert_eq!(create_slug("سَلام World"), "سلام-world");
}

#[test]
fn create_slug_keeps_existing_hyphens() {
    assert_eq!(create_slug("USB-C Cable"), "usb-c-cable");
}

// -----------------------------------------------------------------------
// item_id_from_url
// -----------------------------------------------------------------------

#[test]
fn item_id_from_dp_url() {
    assert_eq!(
        item_id_from_url("https://www.amazon.ae/Some-Item/dp/B0C1234567/ref=sr_1_1?th=1"),
        Some("B0C1234567".to_string())
    );
}

#[test]
fn item_id_from_gp_url() {
    assert_eq!(
        item_id_from_url("https://www.amazon.ae/gp/product/B0C7654321?psc=1"),
        Some("B0C7654321".to_string())
    );
}

#[test]
fn item_id_absent_for_other_paths() {
    assert_eq!(item_id_from_url("https://www.amazon.ae/deals"), None);
}
