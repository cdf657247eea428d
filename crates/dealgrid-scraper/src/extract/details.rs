//! Specifications and description, assembled from several optional sections.

use std::sync::LazyLock;

use regex::Regex;

use crate::browser::{Element, Page};
use crate::layout::ItemLayout;
use crate::wait::{wait_for_element, PollConfig};

use super::text::text_of;

/// An opening tag with attributes: name in group 1, self-closing slash in group 2.
static TAG_WITH_ATTRS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([a-zA-Z][a-zA-Z0-9-]*)\s[^>]*?(/?)>").expect("valid regex")
});

/// Removes every attribute from every opening tag, keeping text and structure.
#[must_use]
pub fn strip_attributes(html: &str) -> String {
    TAG_WITH_ATTRS_RE.replace_all(html, "<${1}${2}>").into_owned()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailSections {
    pub specifications: String,
    pub description: String,
}

pub(crate) async fn extract_details<P: Page>(
    page: &P,
    layout: &ItemLayout,
    poll: PollConfig,
) -> DetailSections {
    let (overview, details, information, bullets, description) = tokio::join!(
        overview_html(page, layout.overview_table, poll),
        text_of(page, layout.detail_bullets, poll),
        text_of(page, layout.product_information, poll),
        text_of(page, layout.feature_bullets, poll),
        text_of(page, layout.description, poll),
    );
    assemble(overview, details, information, bullets, description)
}

async fn overview_html<P: Page>(page: &P, selector: &str, poll: PollConfig) -> Option<String> {
    let table = wait_for_element(page, selector, poll).await.ok().flatten()?;
    match table.html().await {
        Ok(html) => Some(strip_attributes(html.trim())),
        Err(e) => {
            tracing::debug!(selector, error = %e, "overview table unreadable");
            None
        }
    }
}

fn assemble(
    overview: Option<String>,
    details: Option<String>,
    information: Option<String>,
    bullets: Option<String>,
    description: Option<String>,
) -> DetailSections {
    let specifications = [
        ("Product Overview", overview),
        ("Product Details", details),
        ("Product Information", information),
    ]
    .into_iter()
    .filter_map(|(heading, body)| {
        body.filter(|b| !b.is_empty())
            .map(|b| format!("<h2>{heading}</h2>\n{b}"))
    })
    .collect::<Vec<_>>()
    .join("\n");

    let description = [bullets, description]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    DetailSections {
        specifications,
        description,
    }
}
