//! Single-text fields: title, brand, availability.

use crate::browser::{Element, Page};
use crate::layout::ItemLayout;
use crate::wait::{wait_for_element, PollConfig};

/// Trimmed text of the first element matching `selector`, waiting up to the
/// poll deadline. Lookup or read failures count as "not found".
pub(crate) async fn text_of<P: Page>(page: &P, selector: &str, poll: PollConfig) -> Option<String> {
    let element = match wait_for_element(page, selector, poll).await {
        Ok(Some(element)) => element,
        Ok(None) => {
            tracing::debug!(selector, "element not found");
            return None;
        }
        Err(e) => {
            tracing::debug!(selector, error = %e, "element lookup failed");
            return None;
        }
    };
    match element.text().await {
        Ok(text) => Some(text.trim().to_string()),
        Err(e) => {
            tracing::debug!(selector, error = %e, "element text unreadable");
            None
        }
    }
}

/// First non-empty text among `selectors`, tried in order.
pub(crate) async fn first_text<P: Page>(
    page: &P,
    selectors: &[&str],
    poll: PollConfig,
) -> Option<String> {
    for selector in selectors {
        if let Some(text) = text_of(page, selector, poll).await {
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

pub(crate) async fn extract_title<P: Page>(page: &P, layout: &ItemLayout, poll: PollConfig) -> String {
    text_of(page, layout.title, poll).await.unwrap_or_default()
}

/// Byline text with marketing affixes removed, else the structured brand
/// attribute.
pub(crate) async fn extract_brand<P: Page>(page: &P, layout: &ItemLayout, poll: PollConfig) -> String {
    if let Some(byline) = text_of(page, layout.byline, poll).await {
        let brand = clean_byline(&byline, layout.byline_prefixes, layout.byline_suffixes);
        if !brand.is_empty() {
            return brand;
        }
    }
    text_of(page, layout.brand_attribute, poll)
        .await
        .unwrap_or_default()
}

pub(crate) async fn extract_availability<P: Page>(
    page: &P,
    layout: &ItemLayout,
    poll: PollConfig,
) -> String {
    first_text(page, layout.availability, poll)
        .await
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Strips one leading prefix and one trailing suffix from a byline such as
/// `"Visit the Anker Store"`.
#[must_use]
pub fn clean_byline(raw: &str, prefixes: &[&str], suffixes: &[&str]) -> String {
    let mut text = raw.trim();
    if let Some(rest) = prefixes.iter().find_map(|p| text.strip_prefix(p)) {
        text = rest;
    }
    if let Some(rest) = suffixes.iter().find_map(|s| text.strip_suffix(s)) {
        text = rest;
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{FakeNode, FakePage, FakeState};

    fn poll() -> PollConfig {
        PollConfig::new(Duration::from_millis(10), Duration::from_millis(2))
    }

    #[test]
    fn clean_byline_visit_store() {
        let layout = ItemLayout::amazon();
        assert_eq!(
            clean_byline(
                "Visit the Anker Store",
                layout.byline_prefixes,
                layout.byline_suffixes
            ),
            "Anker"
        );
    }

    #[test]
    fn clean_byline_brand_label() {
        let layout = ItemLayout::amazon();
        assert_eq!(
            clean_byline("  Brand: Philips ", layout.byline_prefixes, layout.byline_suffixes),
            "Philips"
        );
    }

    #[tokio::test]
    async fn brand_falls_back_to_attribute_table() {
        let layout = ItemLayout::amazon();
        let page = FakePage::new(
            FakeState::default().with(".po-brand .po-break-word", FakeNode::text(" Xiaomi ")),
        );
        assert_eq!(extract_brand(&page, &layout, poll()).await, "Xiaomi");
    }

    #[tokio::test]
    async fn availability_skips_empty_primary() {
        let layout = ItemLayout::amazon();
        let page = FakePage::new(
            FakeState::default()
                .with("#availability", FakeNode::text("   "))
                .with(
                    ".a-section.a-spacing-none span.a-size-medium",
                    FakeNode::text("Only 2 left in stock."),
                ),
        );
        assert_eq!(
            extract_availability(&page, &layout, poll()).await,
            "Only 2 left in stock."
        );
    }

    #[tokio::test]
    async fn availability_defaults_to_unknown() {
        let layout = ItemLayout::amazon();
        let page = FakePage::new(FakeState::default());
        assert_eq!(extract_availability(&page, &layout, poll()).await, "Unknown");
    }

    #[tokio::test]
    async fn missing_title_is_empty() {
        let layout = ItemLayout::amazon();
        let page = FakePage::new(FakeState::default());
        assert_eq!(extract_title(&page, &layout, poll()).await, "");
    }
}
