//! Error type for harvest configuration and fetch failures that stop the chapter loop.

use thiserror::Error;

/// Harvest error. Config variants are fatal before the loop starts; fetch variants stop the loop
/// and are carried in [StopReason::FetchFailed](crate::harvest::StopReason::FetchFailed).
#[derive(Debug, Error)]
pub enum HarvestError {
    // Startup configuration
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Invalid {role} selector {selector:?}: {reason}")]
    InvalidSelector {
        role: &'static str,
        selector: String,
        reason: String,
    },

    #[error("Invalid harvest configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Failed to create HTTP client: {source}")]
    Client { source: reqwest::Error },

    // Fetch failures
    #[error("Page not found (HTTP 404): {url}")]
    NotFound { url: String },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request failed for {url}: {reason}")]
    Request { url: String, reason: String },

    #[error("Network error: could not reach {url} after {attempts} attempt(s): {reason}")]
    Network {
        url: String,
        attempts: u32,
        reason: String,
    },
}

impl HarvestError {
    /// True for errors raised while building the configuration, before any page is fetched.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            HarvestError::InvalidUrl { .. }
                | HarvestError::InvalidSelector { .. }
                | HarvestError::InvalidConfig { .. }
                | HarvestError::Client { .. }
        )
    }
}
