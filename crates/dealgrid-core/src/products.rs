use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position of a product in the collect → details → translate → publish
/// pipeline. Serialized with the same strings the storage layer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    New,
    NeedsDetails,
    NeedsTranslation,
    TranslationFailed,
    Completed,
    Published,
}

impl ProductStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::New => "new",
            ProductStatus::NeedsDetails => "needs_details",
            ProductStatus::NeedsTranslation => "needs_translation",
            ProductStatus::TranslationFailed => "translation_failed",
            ProductStatus::Completed => "completed",
            ProductStatus::Published => "published",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ProductStatus::New),
            "needs_details" => Ok(ProductStatus::NeedsDetails),
            "needs_translation" => Ok(ProductStatus::NeedsTranslation),
            "translation_failed" => Ok(ProductStatus::TranslationFailed),
            "completed" => Ok(ProductStatus::Completed),
            "published" => Ok(ProductStatus::Published),
            other => Err(format!("unknown product status: {other}")),
        }
    }
}

/// A listing discovered on the results feed, awaiting detail extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStub {
    /// Absolute item page URL.
    pub url: String,
    /// Site the stub was discovered on (e.g. `"amazon.ae"`).
    pub source_site: String,
    /// Department label chosen for the crawl.
    pub category: String,
    /// Discount badge shown on the results card, when present.
    #[serde(default)]
    pub discount_percent: Option<u32>,
    /// Card title as rendered on the feed. Informational only: it is never
    /// copied into [`ProductRecord::title_english`], which is reserved for the
    /// detail page title.
    #[serde(default)]
    pub listing_title: Option<String>,
}

impl ItemStub {
    /// Converts the stub into a bare record queued for detail extraction.
    #[must_use]
    pub fn into_record(self) -> ProductRecord {
        ProductRecord {
            discount_percent: self.discount_percent.unwrap_or(0),
            ..ProductRecord::new(self.url, self.source_site, self.category)
        }
    }
}

/// The full extractable schema for one item.
///
/// Records may be partial: every detail field defaults to empty/zero and is
/// only filled by a successful extraction attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub url: String,
    pub source_site: String,
    pub category: String,
    pub status: ProductStatus,
    #[serde(default)]
    pub title_english: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub availability: String,
    /// Overview table (attribute-stripped HTML) plus details/information text.
    #[serde(default)]
    pub specifications_html: String,
    /// Feature bullets followed by the free-text description.
    #[serde(default)]
    pub description_html: String,
    #[serde(default)]
    pub original_price: f64,
    #[serde(default)]
    pub discount_price: f64,
    #[serde(default)]
    pub discount_percent: u32,
    #[serde(default)]
    pub main_image_url: String,
    /// Gallery images in page order, never containing duplicates or the main image.
    #[serde(default)]
    pub gallery_image_urls: Vec<String>,
    #[serde(default)]
    pub scraped_at: Option<DateTime<Utc>>,
}

impl ProductRecord {
    /// Creates an empty record with status [`ProductStatus::NeedsDetails`].
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        source_site: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            source_site: source_site.into(),
            category: category.into(),
            status: ProductStatus::NeedsDetails,
            title_english: String::new(),
            brand: String::new(),
            availability: String::new(),
            specifications_html: String::new(),
            description_html: String::new(),
            original_price: 0.0,
            discount_price: 0.0,
            discount_percent: 0,
            main_image_url: String::new(),
            gallery_image_urls: Vec::new(),
            scraped_at: None,
        }
    }

    /// Returns `true` when the record already carries detail data and a
    /// detail visit can be skipped.
    #[must_use]
    pub fn has_details(&self) -> bool {
        !self.title_english.is_empty() || self.scraped_at.is_some()
    }
}

/// A `{value, label}` pair from the results feed's department filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentOption {
    pub value: String,
    pub label: String,
}
