//! Citation record model representing one entry of the reference document.

use serde::{Deserialize, Serialize};

use crate::utils::extract::ExtractedFields;

/// One bibliographic or URL reference
///
/// Every field except `raw` is best-effort: entries that cannot be structured
/// still keep their full original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    /// Authors or organizations, in the order written
    pub authors: Vec<String>,

    /// Publication year
    pub year: Option<i32>,

    /// Title (empty when it could not be located)
    pub title: String,

    /// Journal, series or publisher
    pub venue: Option<String>,

    /// Volume / issue / page information (e.g. "v. 46, no. 4, p. 779-806")
    pub pages: Option<String>,

    /// First URL found in the entry
    pub url: Option<String>,

    /// Original entry text, verbatim
    pub raw: String,

    /// 1-based line of the document where the entry starts
    pub line: usize,
}

impl CitationRecord {
    /// Create a record with only its raw text populated
    pub fn unstructured(raw: impl Into<String>, line: usize) -> Self {
        Self {
            authors: Vec::new(),
            year: None,
            title: String::new(),
            venue: None,
            pages: None,
            url: None,
            raw: raw.into(),
            line,
        }
    }

    /// Parse a record from its raw entry text.
    ///
    /// Deterministic: scanning the `raw` of a parsed record again yields an
    /// equal record.
    pub fn from_raw(raw: impl Into<String>, line: usize) -> Self {
        let raw = raw.into();
        let fields = ExtractedFields::scan(&raw);
        Self {
            authors: fields.authors,
            year: fields.year,
            title: fields.title,
            venue: fields.venue,
            pages: fields.pages,
            url: fields.url,
            raw,
            line,
        }
    }

    /// True when nothing beyond the raw text could be extracted
    pub fn is_unstructured(&self) -> bool {
        self.year.is_none() && self.url.is_none() && self.title.is_empty()
    }

    /// Authors joined for display ("Metz, M.C.; Robinson, L.C.")
    pub fn author_display(&self) -> String {
        self.authors.join("; ")
    }

    /// Year for display, "n.d." when absent
    pub fn year_display(&self) -> String {
        self.year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "n.d.".to_string())
    }

    /// Title for display, falling back to the raw text
    pub fn title_display(&self) -> &str {
        if self.title.is_empty() {
            &self.raw
        } else {
            &self.title
        }
    }

    /// Case-insensitive substring match against the raw text
    pub fn mentions(&self, keyword_lower: &str) -> bool {
        self.raw.to_lowercase().contains(keyword_lower)
    }
}
