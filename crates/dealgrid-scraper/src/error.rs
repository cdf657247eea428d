use thiserror::Error;

use crate::browser::BrowserError;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("robot check page served for {url} (title {title:?})")]
    RobotCheck { url: String, title: String },

    #[error("could not clear interstitial on {url}: {reason}")]
    Interstitial { url: String, reason: String },

    #[error("no primary content container found on {url}")]
    ContainerNotFound { url: String },

    #[error("extraction likely failed for {url}: title is empty")]
    ExtractionIncomplete { url: String },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("could not encode feed filters: {0}")]
    FeedPayload(#[source] serde_json::Error),
}

impl ScraperError {
    /// Short stable label for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ScraperError::Navigation { .. } => "navigation",
            ScraperError::RobotCheck { .. } => "robot_check",
            ScraperError::Interstitial { .. } => "interstitial",
            ScraperError::ContainerNotFound { .. } => "container_not_found",
            ScraperError::ExtractionIncomplete { .. } => "extraction_incomplete",
            ScraperError::Browser(_) => "browser",
            ScraperError::InvalidBaseUrl { .. } => "invalid_base_url",
            ScraperError::FeedPayload(_) => "feed_payload",
        }
    }
}
