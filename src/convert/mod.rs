//! Ebook conversion of the finalized HTML document.

mod epub;

pub use epub::{split_chapters, write_epub, EpubChapter, EpubConverter, EpubError};

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_CONVERT_PROGRAM: &str = "ebook-convert";

/// Errors from a converter. Maps to CLI exit code 3.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Could not run {program}: {source}. Is it installed and on PATH?")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    ExitStatus {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Cannot read document {path}: {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Epub(#[from] EpubError),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "a signal".to_string(),
    }
}

/// Turns the document at `document` into an ebook at `output`.
pub trait EbookConverter {
    /// File extension of the produced artifact.
    fn extension(&self) -> &str;

    fn convert(&self, document: &Path, title: &str, output: &Path) -> Result<(), ConvertError>;
}

/// Which converter the CLI builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterKind {
    EbookConvert,
    Epub,
}

impl std::str::FromStr for ConverterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ebook-convert" | "calibre" | "mobi" => Ok(ConverterKind::EbookConvert),
            "epub" | "builtin" => Ok(ConverterKind::Epub),
            _ => Err(format!(
                "Invalid converter: '{}'. Use ebook-convert or epub.",
                s
            )),
        }
    }
}

/// Runs an external program: `<program> <document> <output> --title <title> --linearize-tables`.
#[derive(Debug, Clone)]
pub struct ExternalConverter {
    program: String,
    extension: String,
}

impl Default for ExternalConverter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERT_PROGRAM)
    }
}

impl ExternalConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extension: "mobi".to_string(),
        }
    }

    /// Output extension; the program infers the target format from it.
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = ext.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl EbookConverter for ExternalConverter {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn convert(&self, document: &Path, title: &str, output: &Path) -> Result<(), ConvertError> {
        info!(program = %self.program, output = %output.display(), "converting");
        let out = Command::new(&self.program)
            .arg(document)
            .arg(output)
            .arg("--title")
            .arg(title)
            .arg("--linearize-tables")
            .output()
            .map_err(|e| ConvertError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;
        debug!(stdout = %String::from_utf8_lossy(&out.stdout).trim(), "converter output");
        if out.status.success() {
            Ok(())
        } else {
            Err(ConvertError::ExitStatus {
                program: self.program.clone(),
                code: out.status.code(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            })
        }
    }
}
