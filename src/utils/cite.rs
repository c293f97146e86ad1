//! Citation formatting in various styles.
//!
//! Supports the line-delimited registry format, an APA-like author-date
//! rendering, and BibTeX `@misc` entries.

use crate::models::CitationRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Citation style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationStyle {
    /// `author(s) | year | title | url`
    Line,
    /// Author-date prose
    Apa,
    /// BibTeX
    Bibtex,
}

/// Format a record in the specified style
pub fn format_citation(record: &CitationRecord, style: CitationStyle) -> String {
    match style {
        CitationStyle::Line => format_line(record),
        CitationStyle::Apa => format_apa(record),
        CitationStyle::Bibtex => format_bibtex(record),
    }
}

/// One record per line: `author(s) | year | title | url`.
///
/// Unstructured records print their raw text in the title column.
fn format_line(record: &CitationRecord) -> String {
    let year = record.year.map(|y| y.to_string()).unwrap_or_default();
    format!(
        "{} | {} | {} | {}",
        record.author_display(),
        year,
        record.title_display(),
        record.url.as_deref().unwrap_or("")
    )
}

/// Format authors as "A, B, & C"
fn format_authors_apa(authors: &[String]) -> String {
    match authors {
        [] => "Anonymous".to_string(),
        [single] => single.clone(),
        [first, second] => format!("{} & {}", first, second),
        [rest @ .., last] => format!("{}, & {}", rest.join(", "), last),
    }
}

/// Format: Authors (Year). Title. Venue, pages. URL
fn format_apa(record: &CitationRecord) -> String {
    if record.is_unstructured() {
        return record.raw.clone();
    }

    let mut out = format!(
        "{} ({}). {}.",
        format_authors_apa(&record.authors),
        record.year_display(),
        record.title_display().trim_end_matches('.')
    );
    match (&record.venue, &record.pages) {
        (Some(venue), Some(pages)) => out.push_str(&format!(" {}, {}.", venue, pages)),
        (Some(venue), None) => out.push_str(&format!(" {}.", venue)),
        (None, Some(pages)) => out.push_str(&format!(" {}.", pages)),
        (None, None) => {}
    }
    if let Some(url) = &record.url {
        out.push(' ');
        out.push_str(url);
    }
    out
}

/// Generate a citation key: FirstAuthorSurnameYearFirstTitleWords
pub fn citation_key(record: &CitationRecord) -> String {
    let surname: String = record
        .authors
        .first()
        .and_then(|a| a.split(',').next())
        .and_then(|a| a.split_whitespace().last())
        .unwrap_or("anon")
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    let year = record.year.map(|y| y.to_string()).unwrap_or_default();
    let title_key: String = record
        .title_display()
        .split_whitespace()
        .take(2)
        .flat_map(|w| w.chars().filter(|c| c.is_alphanumeric()))
        .collect();

    format!("{}{}{}", surname, year, title_key)
}

/// Generate a BibTeX entry
/// Format: @misc{key,
///   author = {A and B},
///   title = {Title},
///   ...
/// }
fn format_bibtex(record: &CitationRecord) -> String {
    let mut fields: Vec<(&str, String)> = Vec::new();
    if !record.authors.is_empty() {
        let authors: Vec<&str> = record
            .authors
            .iter()
            .map(String::as_str)
            .filter(|a| *a != "et al.")
            .collect();
        let mut joined = authors.join(" and ");
        if authors.len() < record.authors.len() {
            joined.push_str(" and others");
        }
        fields.push(("author", joined));
    }
    fields.push(("title", record.title_display().to_string()));
    if let Some(venue) = &record.venue {
        fields.push(("howpublished", venue.clone()));
    }
    if let Some(year) = record.year {
        fields.push(("year", year.to_string()));
    }
    if let Some(pages) = &record.pages {
        fields.push(("note", pages.clone()));
    }
    if let Some(url) = &record.url {
        fields.push(("url", url.clone()));
    }

    let body = fields
        .iter()
        .map(|(name, value)| format!("  {} = {{{}}}", name, value))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("@misc{{{},\n{}\n}}", citation_key(record), body)
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CitationStyle::Line => write!(f, "Line"),
            CitationStyle::Apa => write!(f, "APA"),
            CitationStyle::Bibtex => write!(f, "BibTeX"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn castor() -> CitationRecord {
        CitationRecord::from_raw(
            "Castor, S.B., 2008, The Mountain Pass rare-earth carbonatite and associated ultrapotassic rocks, California: The Canadian Mineralogist, v. 46, no. 4, p. 779-806.",
            1,
        )
    }

    #[test]
    fn test_line_format() {
        let record = CitationRecord::from_raw("USGS MRDS: https://mrdata.usgs.gov/mrds/", 1);
        assert_eq!(
            format_citation(&record, CitationStyle::Line),
            " |  | USGS MRDS | https://mrdata.usgs.gov/mrds/"
        );
    }

    #[test]
    fn test_apa_format() {
        let formatted = format_citation(&castor(), CitationStyle::Apa);
        assert!(formatted.starts_with("Castor, S.B. (2008). The Mountain Pass"));
        assert!(formatted.ends_with("The Canadian Mineralogist, v. 46, no. 4, p. 779-806."));
    }

    #[test]
    fn test_apa_authors() {
        let authors = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(format_authors_apa(&authors), "A, B, & C");
        assert_eq!(format_authors_apa(&[]), "Anonymous");
    }

    #[test]
    fn test_bibtex_entry() {
        let bibtex = format_citation(&castor(), CitationStyle::Bibtex);
        assert!(bibtex.starts_with("@misc{Castor2008TheMountain,"));
        assert!(bibtex.contains("  author = {Castor, S.B.}"));
        assert!(bibtex.contains("  year = {2008}"));
        assert!(bibtex.ends_with("\n}"));
    }

    #[test]
    fn test_bibtex_et_al() {
        let record = CitationRecord::from_raw("Box, S.E., et al., 2005, Sediments: USGS.", 1);
        let bibtex = format_citation(&record, CitationStyle::Bibtex);
        assert!(bibtex.contains("author = {Box, S.E. and others}"));
    }

    #[test]
    fn test_unstructured_apa_is_raw() {
        let record = CitationRecord::from_raw("notes pending", 1);
        assert_eq!(format_citation(&record, CitationStyle::Apa), "notes pending");
    }
}
