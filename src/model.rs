//! Canonical data model for a harvested story.
//!
//! The assembler, the output writers and the JSON dump all consume these shapes.

use serde::{Deserialize, Serialize};

/// One harvested story: the document title, where the chain started, and its chapters in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    #[serde(rename = "sourceUrl")]
    pub source_url: String,
    pub chapters: Vec<Chapter>,
}

/// One chapter as appended to the document.
///
/// `fragments` are the outer HTML of every content-selector match, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// 1-based arrival position in the document.
    pub index: u32,
    pub heading: String,
    pub fragments: Vec<String>,
    #[serde(rename = "sourceUrl")]
    pub source_url: String,
}

impl Chapter {
    /// Fragments joined in order, one per line.
    pub fn body(&self) -> String {
        self.fragments.join("\n")
    }
}
