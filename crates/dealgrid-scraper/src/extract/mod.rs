//! Field extraction for a loaded item page.
//!
//! Each field cascades through its strategies in priority order and settles
//! on an empty or zero value when nothing matches; no field can fail the
//! page. The fields are independent and run concurrently, each bounded by
//! its own poll deadline.

mod details;
mod price;
mod text;

use std::future::Future;

use chrono::{DateTime, Utc};
use dealgrid_core::{ProductRecord, ProductStatus};

use crate::browser::Page;
use crate::images::{extract_images, ImageSet};
use crate::layout::ItemLayout;
use crate::wait::PollConfig;

pub use details::{strip_attributes, DetailSections};
pub use price::{reconcile_prices, PriceTrio};
pub use text::clean_byline;

/// Everything one extraction pass read from an item page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub title: String,
    pub brand: String,
    pub availability: String,
    pub prices: PriceTrio,
    pub images: ImageSet,
    pub details: DetailSections,
}

impl ExtractedFields {
    /// Writes the fields into `record`, stamps `scraped_at`, and moves the
    /// record on to translation.
    ///
    /// A zero percentage from the page does not erase a discount the record
    /// already carries from the results feed.
    pub fn apply_to(self, record: &mut ProductRecord, scraped_at: DateTime<Utc>) {
        record.title_english = self.title;
        record.brand = self.brand;
        record.availability = self.availability;
        record.original_price = self.prices.original;
        record.discount_price = self.prices.discount;
        if self.prices.percent > 0 {
            record.discount_percent = self.prices.percent;
        }
        record.main_image_url = self.images.main;
        record.gallery_image_urls = self.images.gallery;
        record.specifications_html = self.details.specifications;
        record.description_html = self.details.description;
        record.scraped_at = Some(scraped_at);
        record.status = ProductStatus::NeedsTranslation;
    }
}

/// A site-specific extractor. The page orchestrator only needs this, so a
/// new marketplace plugs in without touching navigation or retry logic.
pub trait ItemExtractor: Send + Sync {
    fn extract<P: Page>(&self, page: &P) -> impl Future<Output = ExtractedFields> + Send;
}

/// Selector-driven extractor for storefronts described by an [`ItemLayout`].
#[derive(Debug, Clone)]
pub struct LayoutExtractor {
    layout: ItemLayout,
    element_poll: PollConfig,
    image_poll: PollConfig,
}

impl LayoutExtractor {
    #[must_use]
    pub fn new(layout: ItemLayout, element_poll: PollConfig, image_poll: PollConfig) -> Self {
        Self {
            layout,
            element_poll,
            image_poll,
        }
    }
}

impl ItemExtractor for LayoutExtractor {
    async fn extract<P: Page>(&self, page: &P) -> ExtractedFields {
        let layout = &self.layout;
        let poll = self.element_poll;
        let (title, brand, availability, prices, images, details) = tokio::join!(
            text::extract_title(page, layout, poll),
            text::extract_brand(page, layout, poll),
            text::extract_availability(page, layout, poll),
            price::extract_prices(page, layout, poll),
            extract_images(page, layout, self.image_poll),
            details::extract_details(page, layout, poll),
        );
        tracing::debug!(
            title_len = title.len(),
            brand = %brand,
            gallery = images.gallery.len(),
            spec_len = details.specifications.len(),
            "fields extracted"
        );
        ExtractedFields {
            title,
            brand,
            availability,
            prices,
            images,
            details,
        }
    }
}
