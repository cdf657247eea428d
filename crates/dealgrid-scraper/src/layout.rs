//! CSS selectors and markers describing a listing site's markup.
//!
//! Each field lists its strategies in priority order. Another marketplace on
//! the same storefront platform plugs in by supplying its own layout.

/// Item (detail) page markup.
#[derive(Debug, Clone, Copy)]
pub struct ItemLayout {
    /// Primary content container first, then fallbacks.
    pub containers: &'static [&'static str],
    /// Lowercase substrings of the document title that indicate a robot check.
    pub robot_title_markers: &'static [&'static str],
    pub challenge_form: &'static str,
    pub challenge_submit: &'static str,

    pub title: &'static str,
    pub byline: &'static str,
    pub byline_prefixes: &'static [&'static str],
    pub byline_suffixes: &'static [&'static str],
    pub brand_attribute: &'static str,
    pub availability: &'static [&'static str],

    pub pay_price: &'static str,
    pub strike_price: &'static str,
    pub savings_percent: &'static str,
    /// Screen-reader spans that repeat price context as plain text.
    pub price_context: &'static str,
    pub list_price_marker: &'static str,
    pub savings_marker: &'static str,

    /// Substring identifying the inline script that holds the image data.
    pub image_script_marker: &'static str,
    /// Key preceding the image array inside that script.
    pub image_array_key: &'static str,

    pub overview_table: &'static str,
    pub detail_bullets: &'static str,
    pub product_information: &'static str,
    pub feature_bullets: &'static str,
    pub description: &'static str,
}

impl ItemLayout {
    #[must_use]
    pub const fn amazon() -> Self {
        Self {
            containers: &["#ppd", "#dp", "#centerCol", "#productDetails"],
            robot_title_markers: &["robot check", "captcha"],
            challenge_form: r#"form[action="/errors/validateCaptcha"]"#,
            challenge_submit: r#"form[action="/errors/validateCaptcha"] button[type="submit"]"#,

            title: "#productTitle",
            byline: "#bylineInfo",
            byline_prefixes: &["Visit the ", "Brand: "],
            byline_suffixes: &[" Store"],
            brand_attribute: ".po-brand .po-break-word",
            availability: &[
                "#availability",
                ".a-section.a-spacing-none span.a-size-medium",
            ],

            pay_price: ".priceToPay .a-offscreen",
            strike_price: "span[data-a-strike='true'] .a-offscreen",
            savings_percent: ".savingsPercentage",
            price_context: "span.aok-offscreen",
            list_price_marker: "List Price:",
            savings_marker: "percent savings",

            image_script_marker: "'colorImages'",
            image_array_key: "'initial':",

            overview_table: "#productOverview_feature_div table",
            detail_bullets: "#detailBullets_feature_div",
            product_information: "#prodDetails",
            feature_bullets: "#feature-bullets",
            description: "#productDescription",
        }
    }
}

impl Default for ItemLayout {
    fn default() -> Self {
        Self::amazon()
    }
}

/// Results feed (deals grid) markup.
#[derive(Debug, Clone, Copy)]
pub struct FeedLayout {
    /// Path of the feed page relative to the site origin.
    pub path: &'static str,
    /// Query parameter carrying the encoded filter payload.
    pub filter_param: &'static str,

    pub departments_expand: &'static str,
    pub department_option: &'static str,
    pub department_input: &'static str,
    pub department_label: &'static str,

    pub card: &'static str,
    pub card_link: &'static str,
    pub card_title: &'static str,
    pub card_badge: &'static str,

    pub footer: &'static str,
    pub end_marker: &'static str,
    pub load_more: &'static str,
    pub spinner: &'static str,
}

impl FeedLayout {
    #[must_use]
    pub const fn amazon() -> Self {
        Self {
            path: "/deals",
            filter_param: "discounts-widget",

            departments_expand: "button[aria-labelledby='see-more-departments-label']",
            department_option: "div[data-a-input-name='departments']",
            department_input: "input[name='departments']",
            department_label: "span.a-label .a-size-base",

            card: "div[data-testid='product-card']",
            card_link: "a[data-testid='product-card-link']",
            card_title: "p[id^='title-']",
            card_badge: ".style_filledRoundedBadgeLabel__Vo-4g span",

            footer: "div[data-testid='load-more-footer']",
            end_marker: ".LoadMore-module__spacer_TKuLOc0qWGD0grhZzukT",
            load_more: "button[data-testid='load-more-view-more-button']",
            spinner: "[role='progressbar']",
        }
    }
}

impl Default for FeedLayout {
    fn default() -> Self {
        Self::amazon()
    }
}
