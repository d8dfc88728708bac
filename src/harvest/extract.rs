//! Chapter body and title-region extraction from a parsed page.

use crate::harvest::page::{PageContent, PageSelector};
use thiserror::Error;

/// The content selector matched nothing on a page. Recovered by skipping the chapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("content selector {selector:?} matched nothing at {url}")]
pub struct ContentNotFound {
    pub selector: String,
    pub url: String,
}

/// Outer HTML of every element matching `selector`, in document order.
pub fn extract_content(
    page: &PageContent,
    selector: &PageSelector,
) -> Result<Vec<String>, ContentNotFound> {
    let fragments = page
        .html()
        .select(selector.selector())
        .map(|el| el.html())
        .collect::<Vec<_>>();
    if fragments.is_empty() {
        return Err(ContentNotFound {
            selector: selector.as_str().to_string(),
            url: page.url().to_string(),
        });
    }
    Ok(fragments)
}

/// Text of the first element matching `selector` with whitespace collapsed; None if absent or blank.
pub fn extract_title_text(page: &PageContent, selector: &PageSelector) -> Option<String> {
    page.html()
        .select(selector.selector())
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
