//! Parsed page and compiled selectors shared by the extractors.

use crate::harvest::client::PageBody;
use crate::harvest::error::HarvestError;
use scraper::{Html, Selector};

/// A CSS selector compiled once at startup, keeping its source text for diagnostics.
#[derive(Debug, Clone)]
pub struct PageSelector {
    source: String,
    inner: Selector,
}

impl PageSelector {
    /// Parse a CSS selector. `role` names it in the error (e.g. "content", "next-link").
    pub fn parse(role: &'static str, source: &str) -> Result<Self, HarvestError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(HarvestError::InvalidSelector {
                role,
                selector: source.to_string(),
                reason: "selector is empty".to_string(),
            });
        }
        let inner = Selector::parse(source).map_err(|e| HarvestError::InvalidSelector {
            role,
            selector: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            inner,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub(crate) fn selector(&self) -> &Selector {
        &self.inner
    }
}

/// One fetched page: raw text plus its parsed tree. Lives for a single harvest iteration.
pub struct PageContent {
    url: String,
    final_url: String,
    text: String,
    html: Html,
}

impl PageContent {
    pub fn parse(body: PageBody) -> Self {
        let html = Html::parse_document(&body.text);
        Self {
            url: body.url,
            final_url: body.final_url,
            text: body.text,
            html,
        }
    }

    /// Parse HTML that did not come from the network (fixtures, tests).
    pub fn from_html(url: &str, text: &str) -> Self {
        Self::parse(PageBody {
            url: url.to_string(),
            final_url: url.to_string(),
            text: text.to_string(),
        })
    }

    /// URL that was requested for this page.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL after redirects.
    pub fn final_url(&self) -> &str {
        &self.final_url
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn html(&self) -> &Html {
        &self.html
    }
}
