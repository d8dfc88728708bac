//! Output document assembly.
//!
//! The assembler holds the chapters in arrival order plus the fixed head section (title,
//! stylesheets, scripts). Attribute overrides target a fixed set of elements the assembler
//! itself emits and are applied when the document is rendered.

use crate::model::Chapter;
use serde::Deserialize;
use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Invalid attribute override '{input}': {reason}. Expected element:attribute=value, e.g. body:style=margin:0")]
    InvalidOverride { input: String, reason: String },
}

/// Elements of the assembled document that an override may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideTarget {
    Html,
    Head,
    Body,
    /// Every `<section class="chapter">`.
    Chapter,
    /// Every chapter `<h2>`.
    Heading,
}

impl FromStr for OverrideTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(OverrideTarget::Html),
            "head" => Ok(OverrideTarget::Head),
            "body" => Ok(OverrideTarget::Body),
            "chapter" | "section" => Ok(OverrideTarget::Chapter),
            "heading" | "h2" => Ok(OverrideTarget::Heading),
            other => Err(format!(
                "unknown element '{}' (use html, head, body, chapter, or heading)",
                other
            )),
        }
    }
}

/// Set `attribute` to `value` on every `element` of the rendered document.
///
/// Only constructed through [`HtmlAttributeOverride::new`], so the attribute name is always
/// safe to emit. Config files deserialize through the same check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "OverrideEntry")]
pub struct HtmlAttributeOverride {
    element: OverrideTarget,
    attribute: String,
    value: String,
}

/// Shape of an override as written in a config file.
#[derive(Deserialize)]
struct OverrideEntry {
    element: OverrideTarget,
    attribute: String,
    value: String,
}

impl TryFrom<OverrideEntry> for HtmlAttributeOverride {
    type Error = DocumentError;

    fn try_from(entry: OverrideEntry) -> Result<Self, Self::Error> {
        HtmlAttributeOverride::new(entry.element, entry.attribute, entry.value)
    }
}

impl HtmlAttributeOverride {
    pub fn new(
        element: OverrideTarget,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, DocumentError> {
        let attribute = attribute.into();
        if !is_valid_attribute_name(&attribute) {
            return Err(DocumentError::InvalidOverride {
                input: attribute.clone(),
                reason: format!("'{}' is not a valid attribute name", attribute),
            });
        }
        Ok(Self {
            element,
            attribute,
            value: value.into(),
        })
    }

    pub fn element(&self) -> OverrideTarget {
        self.element
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl FromStr for HtmlAttributeOverride {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| DocumentError::InvalidOverride {
            input: s.to_string(),
            reason,
        };
        let (element, rest) = s
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' after element".to_string()))?;
        let (attribute, value) = rest
            .split_once('=')
            .ok_or_else(|| invalid("missing '=' after attribute".to_string()))?;
        let element = element.parse::<OverrideTarget>().map_err(invalid)?;
        HtmlAttributeOverride::new(element, attribute.trim(), value).map_err(|e| match e {
            DocumentError::InvalidOverride { reason, .. } => invalid(reason),
        })
    }
}

fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Append-only builder for the output HTML document.
#[derive(Debug, Clone, Default)]
pub struct DocumentAssembler {
    title: String,
    styles: Vec<String>,
    scripts: Vec<String>,
    overrides: Vec<HtmlAttributeOverride>,
    chapters: Vec<Chapter>,
}

impl DocumentAssembler {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Add a stylesheet reference (`<link rel="stylesheet">` in the head).
    pub fn add_style(&mut self, href: impl Into<String>) {
        self.styles.push(href.into());
    }

    /// Add a script reference (`<script src>` at the end of the body).
    pub fn add_script(&mut self, src: impl Into<String>) {
        self.scripts.push(src.into());
    }

    pub fn add_override(&mut self, attr: HtmlAttributeOverride) {
        self.overrides.push(attr);
    }

    /// Append a chapter after every chapter already present. No reordering, no dedup.
    pub fn append_chapter(&mut self, chapter: Chapter) {
        self.chapters.push(chapter);
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn into_chapters(self) -> Vec<Chapter> {
        self.chapters
    }

    /// Render the document. Output depends only on what has been added, so repeated calls are byte-identical.
    pub fn finalize(&self) -> String {
        let mut out = String::new();
        let title = html_escape(&self.title);

        out.push_str("<!DOCTYPE html>\n");
        let _ = writeln!(out, "<html{}>", self.attrs(OverrideTarget::Html, &[("lang", "en")]));
        let _ = writeln!(out, "<head{}>", self.attrs(OverrideTarget::Head, &[]));
        out.push_str("  <meta charset=\"UTF-8\"/>\n");
        let _ = writeln!(out, "  <title>{}</title>", title);
        for href in &self.styles {
            let _ = writeln!(
                out,
                "  <link rel=\"stylesheet\" type=\"text/css\" href=\"{}\"/>",
                html_escape(href)
            );
        }
        out.push_str("</head>\n");
        let _ = writeln!(out, "<body{}>", self.attrs(OverrideTarget::Body, &[]));

        let section_attrs = self.attrs(OverrideTarget::Chapter, &[("class", "chapter")]);
        let heading_attrs = self.attrs(OverrideTarget::Heading, &[("class", "chapter")]);
        for ch in &self.chapters {
            let _ = writeln!(out, "  <section{}>", section_attrs);
            let _ = writeln!(
                out,
                "    <h2{}>{}</h2>",
                heading_attrs,
                html_escape(&ch.heading)
            );
            for fragment in &ch.fragments {
                out.push_str(fragment);
                out.push('\n');
            }
            out.push_str("  </section>\n");
        }

        for src in &self.scripts {
            let _ = writeln!(out, "  <script src=\"{}\"></script>", html_escape(src));
        }
        out.push_str("</body>\n");
        out.push_str("</html>\n");
        out
    }

    /// Attribute string for `target`: defaults first, overrides replace same-named defaults or append.
    fn attrs(&self, target: OverrideTarget, defaults: &[(&str, &str)]) -> String {
        let mut attrs: Vec<(String, String)> = defaults
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for o in self
            .overrides
            .iter()
            .filter(|o| o.element == target)
        {
            match attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&o.attribute)) {
                Some(existing) => existing.1 = o.value.clone(),
                None => attrs.push((o.attribute.clone(), o.value.clone())),
            }
        }
        attrs
            .iter()
            .map(|(k, v)| format!(" {}=\"{}\"", k, html_escape(v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(index: u32, heading: &str, body: &str) -> Chapter {
        Chapter {
            index,
            heading: heading.to_string(),
            fragments: vec![body.to_string()],
            source_url: format!("https://example.com/ch{}", index),
        }
    }

    #[test]
    fn chapters_render_in_append_order() {
        let mut doc = DocumentAssembler::new("Test Story");
        doc.append_chapter(chapter(1, "Chapter 1", "<p>one</p>"));
        doc.append_chapter(chapter(2, "Chapter 2", "<p>two</p>"));
        doc.append_chapter(chapter(3, "Chapter 3", "<p>three</p>"));
        let html = doc.finalize();
        let one = html.find("<p>one</p>").unwrap_or(usize::MAX);
        let two = html.find("<p>two</p>").unwrap_or(usize::MAX);
        let three = html.find("<p>three</p>").unwrap_or(usize::MAX);
        assert!(one < two && two < three);
        assert_eq!(html.matches("<section class=\"chapter\">").count(), 3);
        assert!(html.contains("<h2 class=\"chapter\">Chapter 2</h2>"));
    }

    #[test]
    fn duplicate_chapters_are_kept() {
        let mut doc = DocumentAssembler::new("Loop");
        doc.append_chapter(chapter(1, "Chapter 1", "<p>same</p>"));
        doc.append_chapter(chapter(2, "Chapter 1", "<p>same</p>"));
        assert_eq!(doc.chapters().len(), 2);
        assert_eq!(doc.finalize().matches("<p>same</p>").count(), 2);
    }

    #[test]
    fn finalize_is_repeatable() {
        let mut doc = DocumentAssembler::new("Repeat");
        doc.add_style("white-style.css");
        doc.append_chapter(chapter(1, "Chapter 1", "<p>x</p>"));
        assert_eq!(doc.finalize(), doc.finalize());
    }

    #[test]
    fn styles_in_head_scripts_at_end_of_body() {
        let mut doc = DocumentAssembler::new("Styled");
        doc.add_style("/abs/white-style.css");
        doc.add_script("scroll_tracker.js");
        doc.append_chapter(chapter(1, "Chapter 1", "<p>x</p>"));
        let html = doc.finalize();
        let head_end = html.find("</head>").unwrap_or(0);
        let link = html
            .find("<link rel=\"stylesheet\" type=\"text/css\" href=\"/abs/white-style.css\"/>")
            .unwrap_or(usize::MAX);
        assert!(link < head_end);
        let script = html
            .find("<script src=\"scroll_tracker.js\"></script>")
            .unwrap_or(0);
        let last_section = html.rfind("</section>").unwrap_or(usize::MAX);
        assert!(script > last_section);
        assert!(script < html.find("</body>").unwrap_or(0));
    }

    #[test]
    fn title_and_heading_are_escaped() {
        let mut doc = DocumentAssembler::new("Tom & Jerry <3");
        doc.append_chapter(chapter(1, "Chapter 1 - \"Cats\"", "<p>x</p>"));
        let html = doc.finalize();
        assert!(html.contains("<title>Tom &amp; Jerry &lt;3</title>"));
        assert!(html.contains("Chapter 1 - &quot;Cats&quot;"));
    }

    #[test]
    fn empty_document_is_well_formed() {
        let html = DocumentAssembler::new("Empty").finalize();
        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(html.contains("<body>\n</body>"));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn overrides_replace_or_append_attributes() -> Result<(), DocumentError> {
        let mut doc = DocumentAssembler::new("Over");
        doc.add_override("body:style=background: black".parse()?);
        doc.add_override("heading:class=title".parse()?);
        doc.add_override(HtmlAttributeOverride::new(OverrideTarget::Html, "lang", "fr")?);
        doc.append_chapter(chapter(1, "Chapter 1", "<p>x</p>"));
        let html = doc.finalize();
        assert!(html.contains("<html lang=\"fr\">"));
        assert!(html.contains("<body style=\"background: black\">"));
        assert!(html.contains("<h2 class=\"title\">Chapter 1</h2>"));
        assert!(html.contains("<section class=\"chapter\">"));
        Ok(())
    }

    #[test]
    fn override_parse_errors() {
        assert!("body".parse::<HtmlAttributeOverride>().is_err());
        assert!("body:style".parse::<HtmlAttributeOverride>().is_err());
        assert!("div:style=x".parse::<HtmlAttributeOverride>().is_err());
        assert!("body:on click=x".parse::<HtmlAttributeOverride>().is_err());
        assert!("body:=x".parse::<HtmlAttributeOverride>().is_err());
    }

    #[test]
    fn override_value_may_contain_colons_and_equals() -> Result<(), DocumentError> {
        let o: HtmlAttributeOverride = "chapter:data-x=a=b:c".parse()?;
        assert_eq!(o.element, OverrideTarget::Chapter);
        assert_eq!(o.attribute, "data-x");
        assert_eq!(o.value, "a=b:c");
        Ok(())
    }
}
