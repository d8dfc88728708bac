//! Chapter heading normalization.
//!
//! A heading is either taken from an explicit chapter number found in the title text, or
//! numbered from the local counter. The counter is a high-water mark: explicit numbers raise
//! it, fallback headings increment it, nothing lowers it.

use crate::harvest::extract::extract_title_text;
use crate::harvest::page::{PageContent, PageSelector};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Result of parsing title text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleMatch {
    /// The text carries a chapter number, with optional free text after it.
    Explicit {
        number: u32,
        /// Digits after a decimal point, as in "Chapter 1.5". Never raises the counter past `number`.
        fraction: Option<String>,
        subtitle: Option<String>,
    },
    /// No recognizable number; the local counter supplies it.
    FallbackOnly,
}

/// Parse `[chapter] <number> [separator] <title>`, case-insensitive.
///
/// The number is accepted at the start of the text or right after the word "chapter"/"ch."
/// anywhere in it, so "Vol. 2 Chapter 7: Home" yields 7. A '.' directly followed by a digit is
/// a decimal point, not a separator.
pub fn parse_title(text: &str) -> TitleMatch {
    static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)(?:^\s*|\bch(?:apter|\.)?\s*)(\d+)(?:\.(\d+))?\s*(?:[-–—:.|)]+\s*)?(.*)$")
            .expect("valid regex")
    });

    let Some(caps) = TITLE_RE.captures(text) else {
        return TitleMatch::FallbackOnly;
    };
    let Ok(number) = caps[1].parse::<u32>() else {
        return TitleMatch::FallbackOnly;
    };
    let fraction = caps.get(2).map(|m| m.as_str().to_string());
    let subtitle = caps
        .get(3)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());
    TitleMatch::Explicit {
        number,
        fraction,
        subtitle,
    }
}

/// Heading for one chapter and the counter value after it.
pub fn normalize_title(text: Option<&str>, counter: u32) -> (String, u32) {
    let parsed = match text {
        Some(t) => parse_title(t),
        None => TitleMatch::FallbackOnly,
    };
    match parsed {
        TitleMatch::Explicit {
            number,
            fraction,
            subtitle,
        } => {
            let label = match fraction {
                Some(f) => format!("{}.{}", number, f),
                None => number.to_string(),
            };
            let heading = match subtitle {
                Some(sub) => format!("Chapter {} - {}", label, sub),
                None => format!("Chapter {}", label),
            };
            (heading, counter.max(number))
        }
        TitleMatch::FallbackOnly => {
            if let Some(t) = text {
                debug!(title = t, "no chapter number in title; using counter");
            }
            let next = counter.saturating_add(1);
            (format!("Chapter {}", next), next)
        }
    }
}

/// Derive the heading for `page`. Without a title selector every chapter is counter-numbered.
pub fn derive_title(
    page: &PageContent,
    title_selector: Option<&PageSelector>,
    counter: u32,
) -> (String, u32) {
    match title_selector {
        None => normalize_title(None, counter),
        Some(sel) => {
            let text = extract_title_text(page, sel);
            if text.is_none() {
                debug!(url = page.url(), selector = sel.as_str(), "title selector matched no text");
            }
            normalize_title(text.as_deref(), counter)
        }
    }
}
