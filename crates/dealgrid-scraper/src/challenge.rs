//! Robot-check and interstitial handling for item pages.

use std::time::Duration;

use crate::browser::{Element, Page};
use crate::error::ScraperError;
use crate::layout::ItemLayout;
use crate::wait::{wait_for_any, wait_for_element, PollConfig};

/// Returns `true` when `title` carries one of the robot-check markers.
#[must_use]
pub fn is_robot_title(title: &str, markers: &[&str]) -> bool {
    let lowered = title.to_lowercase();
    markers.iter().any(|marker| lowered.contains(marker))
}

/// Dismisses the "continue shopping" challenge form if the page shows one.
///
/// Returns `Ok(false)` when no challenge is present and `Ok(true)` when one
/// was dismissed and the primary container is back.
///
/// # Errors
///
/// Returns [`ScraperError::Interstitial`] if the dismissal control is missing
/// or cannot be clicked, or if no container is present afterwards.
pub(crate) async fn clear_interstitial<P: Page>(
    page: &P,
    url: &str,
    layout: &ItemLayout,
    control_poll: PollConfig,
    navigation_timeout: Duration,
) -> Result<bool, ScraperError> {
    let interstitial = |reason: &str| ScraperError::Interstitial {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    if page.query(layout.challenge_form).await?.is_none() {
        return Ok(false);
    }
    tracing::warn!(url, "challenge form detected, attempting dismissal");

    let Some(button) = wait_for_element(page, layout.challenge_submit, control_poll).await? else {
        return Err(interstitial("dismissal control not found"));
    };
    if let Err(e) = button.click().await {
        return Err(interstitial(&format!("dismissal click failed: {e}")));
    }

    if let Err(e) = page.wait_navigation(navigation_timeout).await {
        tracing::debug!(url, error = %e, "no navigation signal after dismissal");
    }

    if wait_for_any(page, layout.containers, PollConfig::immediate())
        .await?
        .is_none()
    {
        return Err(interstitial("content container missing after dismissal"));
    }
    tracing::info!(url, "challenge dismissed");
    Ok(true)
}
