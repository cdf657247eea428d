//! The price trio: original, discounted, and percent off.

use crate::browser::{Element, Page};
use crate::layout::ItemLayout;
use crate::normalize::{parse_percent, parse_percent_savings, parse_price};
use crate::wait::PollConfig;

use super::text::text_of;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceTrio {
    pub original: f64,
    pub discount: f64,
    pub percent: u32,
}

impl PriceTrio {
    fn complete(&self) -> bool {
        self.original > 0.0 && self.discount > 0.0 && self.percent > 0
    }
}

/// Final consistency pass over whatever the page yielded.
///
/// A missing original price means the item is not discounted, so it takes
/// the discount price. A missing percentage is derived from the two prices
/// when `original > discount > 0`, rounded to the nearest whole percent.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn reconcile_prices(mut trio: PriceTrio) -> PriceTrio {
    if trio.original <= 0.0 && trio.discount > 0.0 {
        trio.original = trio.discount;
    }
    if trio.percent == 0 && trio.original > trio.discount && trio.discount > 0.0 {
        trio.percent = ((trio.original - trio.discount) / trio.original * 100.0).round() as u32;
    }
    trio
}

/// Reads the three price fields, backfills from price context text, then
/// reconciles.
///
/// Only the pay price waits for the poll deadline; the strike-through and
/// savings elements render with it, so they are checked once.
pub(crate) async fn extract_prices<P: Page>(
    page: &P,
    layout: &ItemLayout,
    poll: PollConfig,
) -> PriceTrio {
    let once = PollConfig::immediate();
    let mut trio = PriceTrio::default();

    if let Some(text) = text_of(page, layout.pay_price, poll).await {
        trio.discount = parse_price(&text);
    }
    if let Some(text) = text_of(page, layout.strike_price, once).await {
        trio.original = parse_price(&text);
    }
    if let Some(text) = text_of(page, layout.savings_percent, once).await {
        trio.percent = parse_percent(&text).unwrap_or(0);
    }

    if !trio.complete() {
        backfill_from_context(page, layout, &mut trio).await;
    }

    let reconciled = reconcile_prices(trio);
    tracing::debug!(
        original = reconciled.original,
        discount = reconciled.discount,
        percent = reconciled.percent,
        "prices extracted"
    );
    reconciled
}

async fn backfill_from_context<P: Page>(page: &P, layout: &ItemLayout, trio: &mut PriceTrio) {
    let spans = match page.query_all(layout.price_context).await {
        Ok(spans) => spans,
        Err(e) => {
            tracing::debug!(error = %e, "price context lookup failed");
            return;
        }
    };
    for span in &spans {
        let Ok(text) = span.text().await else {
            continue;
        };
        apply_context_text(&text, layout, trio);
    }
}

/// Fills unset trio fields from one context fragment.
fn apply_context_text(text: &str, layout: &ItemLayout, trio: &mut PriceTrio) {
    if text.contains(layout.list_price_marker) && trio.original <= 0.0 {
        trio.original = parse_price(text);
    }
    if text.contains(layout.savings_marker) {
        if trio.discount <= 0.0 {
            trio.discount = parse_price(text);
        }
        if trio.percent == 0 {
            trio.percent = parse_percent_savings(text).unwrap_or(0);
        }
    }
}
