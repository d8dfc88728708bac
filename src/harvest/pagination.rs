//! Next-chapter link discovery.

use crate::harvest::page::{PageContent, PageSelector};
use reqwest::Url;
use std::fmt;
use tracing::warn;

/// Where the chain goes after the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextLink {
    /// Absolute URL of the next chapter.
    Url(String),
    /// No further chapter. Not an error.
    Terminal(TerminalReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalReason {
    /// The next-link selector matched nothing.
    NoNextLink,
    /// The link exists but its href is missing or blank.
    EmptyHref,
    /// The href uses a scheme that cannot be fetched (e.g. `javascript:`).
    UnsupportedScheme(String),
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalReason::NoNextLink => write!(f, "no next-chapter link"),
            TerminalReason::EmptyHref => write!(f, "next-chapter link has no href"),
            TerminalReason::UnsupportedScheme(s) => {
                write!(f, "next-chapter link uses unsupported scheme '{}'", s)
            }
        }
    }
}

/// Find the first match of `next_selector` on `page` and resolve its href against `base_origin`.
pub fn resolve_next(page: &PageContent, next_selector: &PageSelector, base_origin: &str) -> NextLink {
    let Some(anchor) = page.html().select(next_selector.selector()).next() else {
        return NextLink::Terminal(TerminalReason::NoNextLink);
    };
    let href = anchor.value().attr("href").map(str::trim).unwrap_or("");
    if href.is_empty() {
        warn!(
            url = page.url(),
            selector = next_selector.as_str(),
            "next-chapter link has no href; treating as end of story"
        );
        return NextLink::Terminal(TerminalReason::EmptyHref);
    }
    resolve_href(href, base_origin)
}

/// Resolve a non-empty href: absolute http(s) URLs pass through unchanged, anything else is joined to the origin.
pub fn resolve_href(href: &str, base_origin: &str) -> NextLink {
    let base = base_origin.trim_end_matches('/');
    if let Some(rest) = href.strip_prefix("//") {
        let scheme = base.split_once("://").map(|(s, _)| s).unwrap_or("https");
        return NextLink::Url(format!("{}://{}", scheme, rest));
    }
    if let Ok(url) = Url::parse(href) {
        return match url.scheme() {
            "http" | "https" => NextLink::Url(href.to_string()),
            other => {
                warn!(href, "next-chapter link is not an http(s) URL; treating as end of story");
                NextLink::Terminal(TerminalReason::UnsupportedScheme(other.to_string()))
            }
        };
    }
    if href.starts_with('/') {
        NextLink::Url(format!("{}{}", base, href))
    } else {
        NextLink::Url(format!("{}/{}", base, href))
    }
}
