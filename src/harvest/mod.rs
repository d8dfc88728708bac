//! Chapter harvesting: fetch a page, extract its body, derive a heading, append, follow the next link.
//!
//! The loop is strictly sequential since the next URL is only known once the current page is parsed.
//! Per-page failures that leave the chain intact (missing content, unnumbered titles) are logged and
//! skipped; fetch failures stop the loop. Whatever was assembled is finalized either way.

mod client;
mod error;
pub mod extract;
pub mod page;
pub mod pagination;
pub mod title;

pub use client::{FetchResult, PageBody, PageFetcher, PageFetcherBuilder};
pub use error::HarvestError;
pub use extract::ContentNotFound;
pub use page::{PageContent, PageSelector};
pub use pagination::{NextLink, TerminalReason};
pub use title::TitleMatch;

use crate::document::{DocumentAssembler, HtmlAttributeOverride};
use crate::model::{Chapter, Story};
use reqwest::Url;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

pub const DEFAULT_CONTENT_SELECTOR: &str = "div.chapter-content";
pub const DEFAULT_NEXT_SELECTOR: &str = "a#next_chap";
pub const DEFAULT_TITLE: &str = "ebook";

/// Anything that can turn a URL into a [FetchResult]. Implemented by [PageFetcher].
pub trait PageSource {
    fn fetch(&mut self, url: &str) -> FetchResult;
}

impl PageSource for PageFetcher {
    fn fetch(&mut self, url: &str) -> FetchResult {
        PageFetcher::fetch(self, url)
    }
}

/// Immutable settings for one harvest run. Selectors are compiled and the origin derived at build time.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    initial_url: String,
    base_origin: String,
    content_selector: PageSelector,
    next_selector: PageSelector,
    title_selector: Option<PageSelector>,
    chapter_limit: Option<u32>,
    title: String,
    styles: Vec<String>,
    scripts: Vec<String>,
    overrides: Vec<HtmlAttributeOverride>,
}

impl HarvestConfig {
    pub fn builder(initial_url: impl Into<String>) -> HarvestConfigBuilder {
        HarvestConfigBuilder::new(initial_url)
    }

    pub fn initial_url(&self) -> &str {
        &self.initial_url
    }

    /// Scheme, host and explicit port of the initial URL. Fixed for the whole run.
    pub fn base_origin(&self) -> &str {
        &self.base_origin
    }

    pub fn content_selector(&self) -> &PageSelector {
        &self.content_selector
    }

    pub fn next_selector(&self) -> &PageSelector {
        &self.next_selector
    }

    pub fn title_selector(&self) -> Option<&PageSelector> {
        self.title_selector.as_ref()
    }

    pub fn chapter_limit(&self) -> Option<u32> {
        self.chapter_limit
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    fn assembler(&self) -> DocumentAssembler {
        let mut doc = DocumentAssembler::new(self.title.clone());
        for href in &self.styles {
            doc.add_style(href.clone());
        }
        for src in &self.scripts {
            doc.add_script(src.clone());
        }
        for o in &self.overrides {
            doc.add_override(o.clone());
        }
        doc
    }
}

/// Builder for [HarvestConfig]. Only the initial URL is required.
#[derive(Debug, Clone)]
pub struct HarvestConfigBuilder {
    initial_url: String,
    content_selector: String,
    next_selector: String,
    title_selector: Option<String>,
    chapter_limit: Option<u32>,
    title: String,
    styles: Vec<String>,
    scripts: Vec<String>,
    overrides: Vec<HtmlAttributeOverride>,
}

impl HarvestConfigBuilder {
    pub fn new(initial_url: impl Into<String>) -> Self {
        Self {
            initial_url: initial_url.into(),
            content_selector: DEFAULT_CONTENT_SELECTOR.to_string(),
            next_selector: DEFAULT_NEXT_SELECTOR.to_string(),
            title_selector: None,
            chapter_limit: None,
            title: DEFAULT_TITLE.to_string(),
            styles: Vec::new(),
            scripts: Vec::new(),
            overrides: Vec::new(),
        }
    }

    pub fn content_selector(mut self, sel: impl Into<String>) -> Self {
        self.content_selector = sel.into();
        self
    }

    pub fn next_selector(mut self, sel: impl Into<String>) -> Self {
        self.next_selector = sel.into();
        self
    }

    /// Title selector. When unset, every heading is numbered from the local counter.
    pub fn title_selector(mut self, sel: Option<String>) -> Self {
        self.title_selector = sel;
        self
    }

    /// Maximum number of pages to visit. None means follow the chain to its end.
    pub fn chapter_limit(mut self, limit: Option<u32>) -> Self {
        self.chapter_limit = limit;
        self
    }

    /// Document title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn style(mut self, href: impl Into<String>) -> Self {
        self.styles.push(href.into());
        self
    }

    pub fn script(mut self, src: impl Into<String>) -> Self {
        self.scripts.push(src.into());
        self
    }

    pub fn attribute_override(mut self, o: HtmlAttributeOverride) -> Self {
        self.overrides.push(o);
        self
    }

    pub fn build(self) -> Result<HarvestConfig, HarvestError> {
        let base_origin = base_origin(&self.initial_url)?;
        let content_selector = PageSelector::parse("content", &self.content_selector)?;
        let next_selector = PageSelector::parse("next-link", &self.next_selector)?;
        let title_selector = match self.title_selector.as_deref() {
            Some(s) => Some(PageSelector::parse("title", s)?),
            None => None,
        };
        if self.chapter_limit == Some(0) {
            return Err(HarvestError::InvalidConfig {
                reason: "chapter limit must be at least 1".to_string(),
            });
        }
        Ok(HarvestConfig {
            initial_url: self.initial_url,
            base_origin,
            content_selector,
            next_selector,
            title_selector,
            chapter_limit: self.chapter_limit,
            title: self.title,
            styles: self.styles,
            scripts: self.scripts,
            overrides: self.overrides,
        })
    }
}

/// `scheme://host[:port]` of an http(s) URL.
pub fn base_origin(url_input: &str) -> Result<String, HarvestError> {
    let url = Url::parse(url_input).map_err(|e| HarvestError::InvalidUrl {
        input: url_input.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(HarvestError::InvalidUrl {
            input: url_input.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    let host = url.host_str().ok_or_else(|| HarvestError::InvalidUrl {
        input: url_input.to_string(),
        reason: "URL has no host".to_string(),
    })?;
    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Cooperative cancellation flag, checked between chapters.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Extracting,
    Appending,
    ResolvingNext,
    Stopped,
}

impl Phase {
    /// Whether the controller may move from `self` to `next`.
    pub fn can_transition(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Idle, Fetching)
                | (Idle, Stopped)
                | (Fetching, Extracting)
                | (Fetching, Stopped)
                | (Extracting, Appending)
                | (Extracting, ResolvingNext)
                | (Appending, ResolvingNext)
                | (ResolvingNext, Fetching)
                | (ResolvingNext, Stopped)
        )
    }
}

/// Everything the controller tracks across iterations. Owned by [harvest] and returned in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestState {
    pub phase: Phase,
    /// High-water mark of chapter numbers seen or assigned.
    pub counter: u32,
    pub pages_visited: u32,
    pub chapters_appended: u32,
    pub chapters_skipped: u32,
    pub current_url: Option<String>,
}

impl HarvestState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            counter: 0,
            pages_visited: 0,
            chapters_appended: 0,
            chapters_skipped: 0,
            current_url: None,
        }
    }

    fn transition(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition(next),
            "invalid phase transition {:?} -> {:?}",
            self.phase,
            next
        );
        trace!(from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }
}

/// Why the loop stopped.
#[derive(Debug)]
pub enum StopReason {
    /// The chain ended normally.
    EndOfStory(TerminalReason),
    ChapterLimit,
    Cancelled,
    /// A page could not be fetched; the chain cannot continue without it.
    FetchFailed(HarvestError),
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::FetchFailed(_))
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndOfStory(reason) => write!(f, "end of story ({})", reason),
            StopReason::ChapterLimit => write!(f, "chapter limit reached"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::FetchFailed(e) => write!(f, "fetch failed: {}", e),
        }
    }
}

/// Result of a run: the finalized document is present even when the run stopped on an error.
#[derive(Debug)]
pub struct HarvestReport {
    pub document: String,
    pub chapters: Vec<Chapter>,
    pub state: HarvestState,
    pub stop: StopReason,
}

impl HarvestReport {
    /// The appended chapters as a [Story], for the JSON and Markdown writers.
    pub fn story(&self, config: &HarvestConfig) -> Story {
        Story {
            title: config.title().to_string(),
            source_url: config.initial_url().to_string(),
            chapters: self.chapters.clone(),
        }
    }
}

/// Options for a run: cancellation and a progress callback invoked after every page.
#[derive(Default)]
pub struct HarvestOptions<'a> {
    pub cancel: CancelToken,
    pub progress: Option<&'a dyn Fn(&HarvestState)>,
}

fn fetch_page(source: &mut dyn PageSource, url: &str) -> Result<PageContent, HarvestError> {
    match source.fetch(url) {
        FetchResult::Success(body) => Ok(PageContent::parse(body)),
        FetchResult::NotFound => Err(HarvestError::NotFound {
            url: url.to_string(),
        }),
        FetchResult::PermanentFailure {
            status: Some(status),
            ..
        } => Err(HarvestError::HttpStatus {
            status,
            url: url.to_string(),
        }),
        FetchResult::PermanentFailure {
            status: None,
            reason,
        } => Err(HarvestError::Request {
            url: url.to_string(),
            reason,
        }),
        FetchResult::TransientFailure { attempts, reason } => Err(HarvestError::Network {
            url: url.to_string(),
            attempts,
            reason,
        }),
    }
}

/// Run the chapter loop from the initial URL until the chain ends, the limit is hit, the run is
/// cancelled, or a fetch fails. Always returns the finalized document.
pub fn harvest(
    source: &mut dyn PageSource,
    config: &HarvestConfig,
    options: &HarvestOptions<'_>,
) -> HarvestReport {
    let mut state = HarvestState::new();
    let mut doc = config.assembler();
    let mut url = config.initial_url().to_string();

    info!(url = %url, origin = config.base_origin(), "starting harvest");

    let stop = loop {
        if options.cancel.is_cancelled() {
            info!("cancelled; finalizing partial document");
            break StopReason::Cancelled;
        }

        state.transition(Phase::Fetching);
        state.current_url = Some(url.clone());
        let page = match fetch_page(source, &url) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "fetch failed; stopping");
                break StopReason::FetchFailed(e);
            }
        };
        state.pages_visited += 1;
        if page.final_url() != page.url() {
            debug!(from = page.url(), to = page.final_url(), "redirected");
        }

        state.transition(Phase::Extracting);
        match extract::extract_content(&page, config.content_selector()) {
            Ok(fragments) => {
                state.transition(Phase::Appending);
                let (heading, counter) =
                    title::derive_title(&page, config.title_selector(), state.counter);
                state.counter = counter;
                state.chapters_appended += 1;
                info!(index = state.chapters_appended, %heading, "chapter");
                doc.append_chapter(Chapter {
                    index: state.chapters_appended,
                    heading,
                    fragments,
                    source_url: url.clone(),
                });
            }
            Err(e) => {
                state.chapters_skipped += 1;
                warn!("{}; chapter skipped", e);
            }
        }

        state.transition(Phase::ResolvingNext);
        if let Some(ref progress) = options.progress {
            progress(&state);
        }

        if let Some(limit) = config.chapter_limit() {
            if state.pages_visited >= limit {
                info!(limit, "chapter limit reached");
                break StopReason::ChapterLimit;
            }
        }

        match pagination::resolve_next(&page, config.next_selector(), config.base_origin()) {
            NextLink::Url(next) => {
                debug!(next = %next, "next chapter");
                url = next;
            }
            NextLink::Terminal(reason) => {
                info!(%reason, "end of story");
                break StopReason::EndOfStory(reason);
            }
        }
    };

    state.transition(Phase::Stopped);
    let document = doc.finalize();
    info!(
        appended = state.chapters_appended,
        skipped = state.chapters_skipped,
        stop = %stop,
        "harvest finished"
    );
    HarvestReport {
        document,
        chapters: doc.into_chapters(),
        state,
        stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    const ORIGIN: &str = "https://novel.example";

    fn page(title: &str, body: Option<&str>, next: Option<&str>) -> String {
        let content = body
            .map(|b| format!("<div class=\"chapter-content\"><p>{}</p></div>", b))
            .unwrap_or_default();
        let link = next
            .map(|n| format!("<a id=\"next_chap\" href=\"{}\">Next</a>", n))
            .unwrap_or_default();
        format!(
            "<html><body><h3 class=\"title\">{}</h3>{}{}</body></html>",
            title, content, link
        )
    }

    /// In-memory source keyed by path; records every requested URL.
    struct MapSource {
        pages: HashMap<String, FetchResult>,
        requested: Vec<String>,
        on_fetch: Option<(usize, CancelToken)>,
    }

    impl MapSource {
        fn new(pages: Vec<(&str, String)>) -> Self {
            let pages = pages
                .into_iter()
                .map(|(path, html)| {
                    let url = format!("{}{}", ORIGIN, path);
                    let body = PageBody {
                        url: url.clone(),
                        final_url: url.clone(),
                        text: html,
                    };
                    (url, FetchResult::Success(body))
                })
                .collect();
            Self {
                pages,
                requested: Vec::new(),
                on_fetch: None,
            }
        }

        fn with(mut self, path: &str, result: FetchResult) -> Self {
            self.pages.insert(format!("{}{}", ORIGIN, path), result);
            self
        }
    }

    impl PageSource for MapSource {
        fn fetch(&mut self, url: &str) -> FetchResult {
            self.requested.push(url.to_string());
            if let Some((n, ref token)) = self.on_fetch {
                if self.requested.len() == n {
                    token.cancel();
                }
            }
            self.pages.get(url).cloned().unwrap_or(FetchResult::NotFound)
        }
    }

    fn three_chapter_chain() -> MapSource {
        MapSource::new(vec![
            ("/ch1", page("Chapter 1", Some("one"), Some("/ch2"))),
            ("/ch2", page("Chapter 2", Some("two"), Some("/ch3"))),
            ("/ch3", page("Chapter 3", Some("three"), None)),
        ])
    }

    fn config(limit: Option<u32>) -> Result<HarvestConfig, HarvestError> {
        HarvestConfig::builder(format!("{}/ch1", ORIGIN))
            .title("Test")
            .chapter_limit(limit)
            .build()
    }

    fn headings(report: &HarvestReport) -> Vec<&str> {
        report.chapters.iter().map(|c| c.heading.as_str()).collect()
    }

    #[test]
    fn follows_chain_to_terminal() -> Result<(), HarvestError> {
        let mut source = three_chapter_chain();
        let report = harvest(&mut source, &config(None)?, &HarvestOptions::default());
        assert_eq!(headings(&report), vec!["Chapter 1", "Chapter 2", "Chapter 3"]);
        assert_eq!(
            report.chapters.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(matches!(
            report.stop,
            StopReason::EndOfStory(TerminalReason::NoNextLink)
        ));
        assert_eq!(report.state.phase, Phase::Stopped);
        assert_eq!(source.requested.len(), 3);
        let one = report.document.find("one").unwrap_or(usize::MAX);
        let three = report.document.find("three").unwrap_or(0);
        assert!(one < three);
        Ok(())
    }

    #[test]
    fn limit_at_or_above_chain_length_changes_nothing() -> Result<(), HarvestError> {
        for limit in [3, 10] {
            let mut source = three_chapter_chain();
            let report = harvest(&mut source, &config(Some(limit))?, &HarvestOptions::default());
            assert_eq!(report.chapters.len(), 3);
        }
        Ok(())
    }

    #[test]
    fn limit_two_stops_after_two() -> Result<(), HarvestError> {
        let mut source = three_chapter_chain();
        let report = harvest(&mut source, &config(Some(2))?, &HarvestOptions::default());
        assert_eq!(headings(&report), vec!["Chapter 1", "Chapter 2"]);
        assert!(matches!(report.stop, StopReason::ChapterLimit));
        assert_eq!(source.requested.len(), 2);
        assert!(!report.document.contains("three"));
        Ok(())
    }

    #[test]
    fn missing_content_skips_chapter_but_follows_link() -> Result<(), HarvestError> {
        let mut source = MapSource::new(vec![
            ("/ch1", page("Chapter 1", Some("one"), Some("/ch2"))),
            ("/ch2", page("Chapter 2", None, Some("/ch3"))),
            ("/ch3", page("Chapter 3", Some("three"), None)),
        ]);
        let report = harvest(&mut source, &config(None)?, &HarvestOptions::default());
        assert_eq!(report.chapters.len(), 2);
        assert!(report.document.contains("one"));
        assert!(report.document.contains("three"));
        assert_eq!(report.state.chapters_skipped, 1);
        assert_eq!(report.state.pages_visited, 3);
        assert!(matches!(report.stop, StopReason::EndOfStory(_)));
        Ok(())
    }

    #[test]
    fn fetch_failure_keeps_partial_document() -> Result<(), HarvestError> {
        let mut source = three_chapter_chain().with(
            "/ch2",
            FetchResult::PermanentFailure {
                status: Some(503),
                reason: "HTTP 503".into(),
            },
        );
        let report = harvest(&mut source, &config(None)?, &HarvestOptions::default());
        assert_eq!(headings(&report), vec!["Chapter 1"]);
        assert!(report.document.contains("one"));
        assert!(report.document.ends_with("</html>\n"));
        match &report.stop {
            StopReason::FetchFailed(HarvestError::HttpStatus { status, url }) => {
                assert_eq!(*status, 503);
                assert!(url.ends_with("/ch2"));
            }
            other => panic!("expected HttpStatus stop, got {:?}", other),
        }
        assert!(report.stop.is_failure());
        Ok(())
    }

    #[test]
    fn not_found_and_transient_map_to_errors() -> Result<(), HarvestError> {
        let mut source = three_chapter_chain().with("/ch1", FetchResult::NotFound);
        let report = harvest(&mut source, &config(None)?, &HarvestOptions::default());
        assert!(matches!(
            report.stop,
            StopReason::FetchFailed(HarvestError::NotFound { .. })
        ));
        assert!(report.chapters.is_empty());
        assert!(report.document.contains("<body>"));

        let mut source = three_chapter_chain().with(
            "/ch3",
            FetchResult::TransientFailure {
                attempts: 4,
                reason: "timed out".into(),
            },
        );
        let report = harvest(&mut source, &config(None)?, &HarvestOptions::default());
        assert!(matches!(
            report.stop,
            StopReason::FetchFailed(HarvestError::Network { attempts: 4, .. })
        ));
        assert_eq!(report.chapters.len(), 2);
        Ok(())
    }

    #[test]
    fn cancellation_is_honored_between_chapters() -> Result<(), HarvestError> {
        let cancel = CancelToken::new();
        let mut source = three_chapter_chain();
        source.on_fetch = Some((2, cancel.clone()));
        let options = HarvestOptions {
            cancel,
            progress: None,
        };
        let report = harvest(&mut source, &config(None)?, &options);
        // The in-flight page completes; the loop stops before the next fetch.
        assert_eq!(headings(&report), vec!["Chapter 1", "Chapter 2"]);
        assert!(matches!(report.stop, StopReason::Cancelled));
        assert_eq!(source.requested.len(), 2);
        Ok(())
    }

    #[test]
    fn counter_tracks_explicit_numbers_as_high_water_mark() -> Result<(), HarvestError> {
        let mut source = MapSource::new(vec![
            ("/a", page("Chapter 5 - Arrival", Some("a"), Some("/b"))),
            ("/b", page("Interlude", Some("b"), Some("/c"))),
            ("/c", page("Chapter 2 - Flashback", Some("c"), Some("/d"))),
            ("/d", page("Epilogue", Some("d"), None)),
        ]);
        let config = HarvestConfig::builder(format!("{}/a", ORIGIN))
            .title_selector(Some("h3.title".to_string()))
            .build()?;
        let seen = RefCell::new(Vec::new());
        let progress = |s: &HarvestState| seen.borrow_mut().push(s.counter);
        let options = HarvestOptions {
            cancel: CancelToken::new(),
            progress: Some(&progress),
        };
        let report = harvest(&mut source, &config, &options);
        assert_eq!(
            headings(&report),
            vec![
                "Chapter 5 - Arrival",
                "Chapter 6",
                "Chapter 2 - Flashback",
                "Chapter 7"
            ]
        );
        let counters = seen.into_inner();
        assert_eq!(counters, vec![5, 6, 6, 7]);
        assert!(counters.windows(2).all(|w| w[0] <= w[1]));
        Ok(())
    }

    #[test]
    fn no_title_selector_numbers_sequentially() -> Result<(), HarvestError> {
        let mut source = MapSource::new(vec![
            ("/ch1", page("Chapter 40", Some("one"), Some("/ch2"))),
            ("/ch2", page("Chapter 41", Some("two"), None)),
        ]);
        let report = harvest(&mut source, &config(None)?, &HarvestOptions::default());
        assert_eq!(headings(&report), vec!["Chapter 1", "Chapter 2"]);
        assert_eq!(report.state.counter, 2);
        Ok(())
    }

    #[test]
    fn origin_is_fixed_despite_cross_host_redirect() -> Result<(), HarvestError> {
        let mut source = MapSource::new(vec![("/ch2", page("Chapter 2", Some("two"), None))]);
        source.pages.insert(
            format!("{}/ch1", ORIGIN),
            FetchResult::Success(PageBody {
                url: format!("{}/ch1", ORIGIN),
                final_url: "https://mirror.example/ch1".to_string(),
                text: page("Chapter 1", Some("one"), Some("/ch2")),
            }),
        );
        let report = harvest(&mut source, &config(None)?, &HarvestOptions::default());
        assert_eq!(report.chapters.len(), 2);
        assert_eq!(source.requested[1], format!("{}/ch2", ORIGIN));
        Ok(())
    }

    #[test]
    fn config_rejects_bad_input() {
        assert!(matches!(
            HarvestConfig::builder("not a url").build(),
            Err(HarvestError::InvalidUrl { .. })
        ));
        assert!(matches!(
            HarvestConfig::builder("ftp://example.com/x").build(),
            Err(HarvestError::InvalidUrl { .. })
        ));
        assert!(matches!(
            HarvestConfig::builder("https://example.com/x")
                .content_selector("div[")
                .build(),
            Err(HarvestError::InvalidSelector { role: "content", .. })
        ));
        assert!(matches!(
            HarvestConfig::builder("https://example.com/x")
                .chapter_limit(Some(0))
                .build(),
            Err(HarvestError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn base_origin_keeps_explicit_port_only() -> Result<(), HarvestError> {
        assert_eq!(
            base_origin("https://novelfull.com/god-of-slaughter/chapter-1.html")?,
            "https://novelfull.com"
        );
        assert_eq!(base_origin("http://127.0.0.1:8080/ch1")?, "http://127.0.0.1:8080");
        assert_eq!(base_origin("https://example.com:443/ch1")?, "https://example.com");
        Ok(())
    }

    #[test]
    fn phase_transitions() {
        assert!(Phase::Idle.can_transition(Phase::Fetching));
        assert!(Phase::Extracting.can_transition(Phase::ResolvingNext));
        assert!(Phase::Fetching.can_transition(Phase::Stopped));
        assert!(!Phase::Extracting.can_transition(Phase::Stopped));
        assert!(!Phase::Stopped.can_transition(Phase::Fetching));
        assert!(!Phase::Appending.can_transition(Phase::Fetching));
    }
}
