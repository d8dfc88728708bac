//! Output writers: the assembled HTML document, a JSON chapter dump, and Markdown.

use crate::model::Story;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output format selector for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Html,
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "md",
        }
    }
}

/// Errors from the format writers.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Cannot write: story title is empty.")]
    EmptyTitle,

    #[error("Failed to write output: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn create(path: &Path) -> Result<BufWriter<File>, FormatError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| FormatError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Write the finalized HTML document as-is.
pub fn write_html(document: &str, path: &Path) -> Result<(), FormatError> {
    let mut f = create(path)?;
    f.write_all(document.as_bytes())?;
    f.flush()?;
    Ok(())
}

/// Write the story's chapters as pretty-printed JSON.
pub fn write_json(story: &Story, path: &Path) -> Result<(), FormatError> {
    if story.title.trim().is_empty() {
        return Err(FormatError::EmptyTitle);
    }
    let mut f = create(path)?;
    serde_json::to_writer_pretty(&mut f, story)?;
    writeln!(f)?;
    f.flush()?;
    Ok(())
}

/// Write a Markdown file: `# title`, then `## heading` and the converted body per chapter.
pub fn write_markdown(story: &Story, path: &Path) -> Result<(), FormatError> {
    if story.title.trim().is_empty() {
        return Err(FormatError::EmptyTitle);
    }
    let mut f = create(path)?;

    writeln!(f, "# {}", story.title)?;
    writeln!(f)?;
    writeln!(f, "Source: <{}>", story.source_url)?;
    writeln!(f)?;
    writeln!(f, "---")?;
    writeln!(f)?;

    for ch in &story.chapters {
        writeln!(f, "## {}", ch.heading)?;
        writeln!(f)?;
        let md = html2md::parse_html(&ch.body());
        writeln!(f, "{}", md.trim())?;
        writeln!(f)?;
    }
    f.flush()?;
    Ok(())
}
