//! Built-in EPUB 3 writer. Reads the finalized HTML document back, one body-level `<section>` per chapter.

use super::{ConvertError, EbookConverter};
use crate::document::html_escape;
use scraper::{Html, Selector};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTAINER_XML: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n  <rootfiles>\n    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>\n  </rootfiles>\n</container>";

const MIMETYPE: &[u8] = b"application/epub+zip";
const OEBPS_PREFIX: &str = "OEBPS/";

/// Errors from the EPUB writer.
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Cannot write EPUB: title is empty.")]
    EmptyTitle,

    #[error("Cannot write EPUB: document has no chapters.")]
    NoChapters,

    #[error("Failed to create EPUB file: {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write EPUB archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl From<std::io::Error> for EpubError {
    fn from(e: std::io::Error) -> Self {
        EpubError::Zip(zip::result::ZipError::Io(e))
    }
}

/// One chapter as it goes into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpubChapter {
    pub heading: String,
    pub body: String,
}

/// Converter that writes EPUB 3 directly, no external program needed.
#[derive(Debug, Clone, Default)]
pub struct EpubConverter {
    identifier: Option<String>,
}

impl EpubConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `dc:identifier` for the package, usually the story's first URL.
    pub fn with_identifier(mut self, id: impl Into<String>) -> Self {
        self.identifier = Some(id.into());
        self
    }
}

impl EbookConverter for EpubConverter {
    fn extension(&self) -> &str {
        "epub"
    }

    fn convert(&self, document: &Path, title: &str, output: &Path) -> Result<(), ConvertError> {
        let html = std::fs::read_to_string(document).map_err(|e| ConvertError::ReadDocument {
            path: document.to_path_buf(),
            source: e,
        })?;
        let chapters = split_chapters(&html);
        let id = self.identifier.as_deref().unwrap_or("urn:storyscrape:story");
        info!(chapters = chapters.len(), output = %output.display(), "writing EPUB");
        write_epub(title, id, &chapters, output)?;
        Ok(())
    }
}

/// Split a finalized document into chapters: heading from the section's `h2`, body is its inner HTML.
///
/// Sections are matched structurally so attribute overrides on them do not hide chapters.
pub fn split_chapters(document: &str) -> Vec<EpubChapter> {
    let (Ok(section_sel), Ok(heading_sel)) =
        (Selector::parse("body > section"), Selector::parse("h2"))
    else {
        return Vec::new();
    };
    let doc = Html::parse_document(document);
    doc.select(&section_sel)
        .map(|section| {
            let heading = section
                .select(&heading_sel)
                .next()
                .map(|h| h.text().collect::<String>().trim().to_string())
                .unwrap_or_default();
            EpubChapter {
                heading,
                body: section.inner_html(),
            }
        })
        .collect()
}

/// Write an EPUB 3 archive: mimetype (stored, first), container, OPF, nav, one XHTML per chapter.
pub fn write_epub(
    title: &str,
    identifier: &str,
    chapters: &[EpubChapter],
    path: &Path,
) -> Result<(), EpubError> {
    if title.trim().is_empty() {
        return Err(EpubError::EmptyTitle);
    }
    if chapters.is_empty() {
        return Err(EpubError::NoChapters);
    }

    let file = std::fs::File::create(path).map_err(|e| EpubError::CreateFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);

    let options_stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let options_deflate = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    // Readers sniff the first entry, uncompressed.
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML)?;

    write_opf(title, identifier, chapters, &mut zip, options_deflate)?;
    write_nav(chapters, &mut zip, options_deflate)?;
    write_chapters(chapters, &mut zip, options_deflate)?;

    zip.finish()?;
    Ok(())
}

fn write_opf(
    title: &str,
    identifier: &str,
    chapters: &[EpubChapter],
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let mut manifest = String::from(
        r#"    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
"#,
    );
    let mut spine = String::new();
    for i in 1..=chapters.len() {
        manifest.push_str(&format!(
            r#"    <item id="chapter-{i}" href="chapter-{i}.xhtml" media-type="application/xhtml+xml"/>
"#
        ));
        spine.push_str(&format!("    <itemref idref=\"chapter-{i}\"/>\n"));
    }

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{id}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine>
{spine}  </spine>
</package>
"#,
        id = xml_escape(identifier),
        title = xml_escape(title),
        manifest = manifest,
        spine = spine,
    );

    zip.start_file(format!("{}content.opf", OEBPS_PREFIX), options)?;
    zip.write_all(opf.as_bytes())?;
    Ok(())
}

fn write_nav(
    chapters: &[EpubChapter],
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let mut links = String::new();
    for (i, ch) in chapters.iter().enumerate() {
        links.push_str(&format!(
            "      <li><a href=\"chapter-{}.xhtml\">{}</a></li>\n",
            i + 1,
            html_escape(&ch.heading)
        ));
    }
    let nav = format!(
        r#"<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
  <meta charset="UTF-8"/>
  <title>Table of Contents</title>
</head>
<body>
  <nav epub:type="toc">
    <h1>Contents</h1>
    <ol>
{}    </ol>
  </nav>
</body>
</html>
"#,
        links
    );
    zip.start_file(format!("{}nav.xhtml", OEBPS_PREFIX), options)?;
    zip.write_all(nav.as_bytes())?;
    Ok(())
}

fn write_chapters(
    chapters: &[EpubChapter],
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    for (i, ch) in chapters.iter().enumerate() {
        let html = format!(
            r#"<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <meta charset="UTF-8"/>
  <title>{}</title>
</head>
<body>
{}
</body>
</html>
"#,
            html_escape(&ch.heading),
            ch.body
        );
        zip.start_file(format!("{}chapter-{}.xhtml", OEBPS_PREFIX, i + 1), options)?;
        zip.write_all(html.as_bytes())?;
    }
    Ok(())
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
