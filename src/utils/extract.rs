//! Best-effort field extraction from raw citation text.
//!
//! Citations in the reference document follow the USGS-style layout
//! `Authors, Year, Title: Venue, v. N, no. N, p. N-M, URL` only loosely.
//! Extraction never fails; fields it cannot locate are left empty.

use regex::Regex;
use std::sync::OnceLock;

/// Fields located in one raw entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub title: String,
    pub venue: Option<String>,
    pub pages: Option<String>,
    pub url: Option<String>,
}

fn markdown_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[([^\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+[^)]*)?\)").expect("valid link regex")
    })
}

fn autolink_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<((?:https?|ftp)://[^>\s]+)>").expect("valid autolink regex"))
}

fn bare_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:\b(?:https?|ftp)://|\bwww\.)[^\s<>"\]\)]+"#).expect("valid url regex")
    })
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(1[6-9]\d{2}|20\d{2})[a-z]?\b").expect("valid year regex"))
}

fn pages_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:v\.|vol\.|no\.|pp?\.)\s*[0-9A-Za-z]+(?:\s*[-–]\s*[0-9A-Za-z]+)?|\b\d+\s*p\.",
        )
        .expect("valid pages regex")
    })
}

fn and_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+(?:and|&)\s+").expect("valid conjunction regex"))
}

fn initials_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?:[A-Z][a-z]?\.\s*-?\s*)+|(?:Jr|Sr)\.?|I{2,3})$").expect("valid initials regex")
    })
}

const ABBREVIATIONS: &[&str] = &[
    "v", "vol", "no", "p", "pp", "co", "inc", "corp", "jr", "sr", "st", "mt", "ft", "al", "ed",
    "eds", "dept", "univ", "fig",
];

impl ExtractedFields {
    /// Scan a raw entry for its fields
    pub fn scan(raw: &str) -> Self {
        let raw = raw.trim();
        let (url, plain) = match find_url(raw) {
            Some((url, plain)) => (Some(url), plain),
            None => (None, raw.to_string()),
        };
        let plain = clean_markup(&plain);

        let Some((year, start, end)) = find_year(&plain) else {
            // Only a URL: the surrounding text is its label
            let title = url
                .as_ref()
                .map(|_| trim_label(&plain).to_string())
                .unwrap_or_default();
            return Self {
                url,
                title,
                ..Default::default()
            };
        };

        let authors = split_authors(plain[..start].trim_end_matches(|c: char| c == '(' || c == ',' || c.is_whitespace()));
        let rest = plain[end..].trim_start_matches(|c: char| matches!(c, ')' | ',' | '.' | ':' | ';') || c.is_whitespace());

        let (title, remainder) = match title_end(rest) {
            Some((title_end, remainder_start)) => (&rest[..title_end], &rest[remainder_start..]),
            None => (rest, ""),
        };
        let (venue, pages) = split_venue(remainder);

        Self {
            authors,
            year: Some(year),
            title: clean_title(title),
            venue,
            pages,
            url,
        }
    }
}

/// Locate the first URL, returning it with the entry text minus the URL.
///
/// Markdown links keep their label in the returned text.
pub fn find_url(text: &str) -> Option<(String, String)> {
    if let Some(caps) = markdown_link_re().captures(text) {
        if let (Some(whole), Some(url)) = (caps.get(0), caps.get(2)) {
            if looks_like_url(url.as_str()) {
                let label = caps.get(1).map_or("", |m| m.as_str());
                let plain = format!("{}{}{}", &text[..whole.start()], label, &text[whole.end()..]);
                return Some((trim_url(url.as_str()).to_string(), plain));
            }
        }
    }

    if let Some(caps) = autolink_re().captures(text) {
        if let (Some(whole), Some(url)) = (caps.get(0), caps.get(1)) {
            let plain = format!("{}{}", &text[..whole.start()], &text[whole.end()..]);
            return Some((trim_url(url.as_str()).to_string(), plain));
        }
    }

    let m = bare_url_re().find(text)?;
    let url = trim_url(m.as_str());
    let plain = format!("{}{}", &text[..m.start()], &text[m.start() + url.len()..]);
    Some((url.to_string(), plain))
}

/// Locate the publication year: the first year token followed by a
/// delimiter, else the first year token at all.
///
/// Returns the year and the byte range of the token.
pub fn find_year(text: &str) -> Option<(i32, usize, usize)> {
    let mut fallback = None;
    for caps in year_re().captures_iter(text) {
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(year) = digits.as_str().parse::<i32>() else {
            continue;
        };
        let next = text[whole.end()..].chars().next();
        if matches!(next, None | Some(',' | '.' | ')' | ';' | ':')) {
            return Some((year, whole.start(), whole.end()));
        }
        fallback.get_or_insert((year, whole.start(), whole.end()));
    }
    fallback
}

fn looks_like_url(candidate: &str) -> bool {
    let lower = candidate.to_ascii_lowercase();
    ["http://", "https://", "ftp://", "www."]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

fn trim_url(url: &str) -> &str {
    url.trim_end_matches(['.', ',', ';', ':', '!', '?'])
}

fn clean_markup(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !matches!(c, '*' | '`')).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trim_label(text: &str) -> &str {
    text.trim()
        .trim_end_matches(|c: char| {
            matches!(c, ':' | ';' | '.' | '-' | '–' | '—' | ',' | '(' | '[') || c.is_whitespace()
        })
        .trim()
}

fn clean_title(title: &str) -> String {
    title
        .trim()
        .trim_matches(|c: char| matches!(c, '_' | '"' | '“' | '”'))
        .trim_end_matches('.')
        .trim()
        .to_string()
}

fn is_initials(piece: &str) -> bool {
    initials_re().is_match(piece)
}

/// Split the author segment into individual names, re-joining initials
/// with their surname ("Box, S.E.").
fn split_authors(segment: &str) -> Vec<String> {
    let mut authors: Vec<String> = Vec::new();

    for piece in segment.split([',', ';']) {
        let mut piece = piece.trim();
        for prefix in ["and ", "& "] {
            if let Some(stripped) = piece.strip_prefix(prefix) {
                piece = stripped.trim();
            }
        }
        if piece.is_empty() {
            continue;
        }

        // "J. and Jones": initials of the previous author, then a new one
        if let Some(m) = and_re().find(piece) {
            let (left, right) = (&piece[..m.start()], &piece[m.end()..]);
            if is_initials(left) {
                attach_or_push(&mut authors, left);
                if !right.trim().is_empty() {
                    authors.push(right.trim().to_string());
                }
                continue;
            }
        }

        attach_or_push(&mut authors, piece);
    }

    authors
}

fn attach_or_push(authors: &mut Vec<String>, piece: &str) {
    match authors.last_mut() {
        Some(last) if is_initials(piece) => {
            last.push_str(", ");
            last.push_str(piece);
        }
        _ => authors.push(piece.to_string()),
    }
}

/// Find where the title ends: the first `": "` or sentence-ending period
/// that is not part of an abbreviation or initial.
///
/// Returns (end of title, start of remainder).
fn title_end(text: &str) -> Option<(usize, usize)> {
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let next_is_break = chars.peek().map_or(true, |(_, n)| n.is_whitespace());
        if !next_is_break {
            continue;
        }
        match c {
            ':' => return Some((i, i + 1)),
            '?' | '!' => return Some((i + 1, i + 1)),
            '.' if !ends_with_abbreviation(&text[..i]) => return Some((i, i + 1)),
            _ => {}
        }
    }
    None
}

fn ends_with_abbreviation(prefix: &str) -> bool {
    let last_word = prefix
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(['(', '['])
        .trim_start_matches(['"', '“']);

    if last_word.is_empty() {
        return false;
    }
    if last_word.contains('.') {
        // U.S, e.g
        return true;
    }
    let mut chars = last_word.chars();
    if let (Some(first), None) = (chars.next(), chars.next()) {
        if first.is_uppercase() {
            return true;
        }
    }
    ABBREVIATIONS.contains(&last_word.to_lowercase().as_str())
}

/// Separate volume/page tokens from the venue text
fn split_venue(remainder: &str) -> (Option<String>, Option<String>) {
    let remainder = remainder.trim();
    if remainder.is_empty() {
        return (None, None);
    }

    let pages: Vec<String> = pages_re()
        .find_iter(remainder)
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();

    let without_pages = pages_re().replace_all(remainder, "");
    let venue = without_pages
        .split(',')
        .map(|part| part.trim().trim_matches(|c: char| c == '.' || c.is_whitespace()))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let venue = (!venue.is_empty()).then_some(venue);
    let pages = (!pages.is_empty()).then(|| pages.join(", "));
    (venue, pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_authors_with_initials() {
        let fields = ExtractedFields::scan(
            "Metz, M.C., and Robinson, L.C., 1980, Tungsten resources of the Coeur d'Alene region, Idaho: U.S. Geological Survey Open-File Report 80-411, 24 p.",
        );

        assert_eq!(fields.authors, vec!["Metz, M.C.", "Robinson, L.C."]);
        assert_eq!(fields.year, Some(1980));
        assert_eq!(
            fields.title,
            "Tungsten resources of the Coeur d'Alene region, Idaho"
        );
        assert_eq!(
            fields.venue.as_deref(),
            Some("U.S. Geological Survey Open-File Report 80-411")
        );
        assert_eq!(fields.pages.as_deref(), Some("24 p."));
    }

    #[test]
    fn test_et_al_kept_as_written() {
        let fields = ExtractedFields::scan("Box, S.E., et al., 2005, Mining-impacted sediments: USGS.");
        assert_eq!(fields.authors, vec!["Box, S.E.", "et al."]);
        assert_eq!(fields.year, Some(2005));
        assert_eq!(fields.title, "Mining-impacted sediments");
        assert_eq!(fields.venue.as_deref(), Some("USGS"));
    }

    #[test]
    fn test_two_authors_without_comma_before_and() {
        let fields = ExtractedFields::scan("Seredin, V.V. and Dai, S., 2012, Coal deposits.");
        assert_eq!(fields.authors, vec!["Seredin, V.V.", "Dai, S."]);
    }

    #[test]
    fn test_organization_author_not_split() {
        let fields = ExtractedFields::scan(
            "U.S. Fish and Wildlife Service, 2019, Site assessment report.",
        );
        assert_eq!(fields.authors, vec!["U.S. Fish and Wildlife Service"]);
        assert_eq!(fields.title, "Site assessment report");
    }

    #[test]
    fn test_bare_url_with_label() {
        let fields =
            ExtractedFields::scan("USGS Mineral Resources Data System (MRDS): https://mrdata.usgs.gov/mrds/.");
        assert_eq!(fields.url.as_deref(), Some("https://mrdata.usgs.gov/mrds/"));
        assert_eq!(fields.title, "USGS Mineral Resources Data System (MRDS)");
        assert_eq!(fields.year, None);
        assert!(fields.authors.is_empty());
    }

    #[test]
    fn test_markdown_link() {
        let (url, plain) = find_url("See [EPA Superfund](https://www.epa.gov/superfund) listing").unwrap();
        assert_eq!(url, "https://www.epa.gov/superfund");
        assert_eq!(plain, "See EPA Superfund listing");
    }

    #[test]
    fn test_autolink() {
        let (url, plain) = find_url("NETL REE database <https://edx.netl.doe.gov/ree/>").unwrap();
        assert_eq!(url, "https://edx.netl.doe.gov/ree/");
        assert_eq!(plain.trim(), "NETL REE database");
    }

    #[test]
    fn test_year_prefers_delimited_token() {
        let (year, _, _) = find_year("Smith, J., Report on the 1990s survey, 2001, Title").unwrap();
        assert_eq!(year, 2001);

        let (year, _, _) = find_year("Jones (2014) Rare earth review").unwrap();
        assert_eq!(year, 2014);
    }

    #[test]
    fn test_year_ignores_identifiers() {
        assert!(find_year("EPA ID0980633712").is_none());
    }

    #[test]
    fn test_parenthesised_year() {
        let fields = ExtractedFields::scan("Castor, S.B. (2008). Mountain Pass. Canadian Mineralogist.");
        assert_eq!(fields.authors, vec!["Castor, S.B."]);
        assert_eq!(fields.year, Some(2008));
        assert_eq!(fields.title, "Mountain Pass");
        assert_eq!(fields.venue.as_deref(), Some("Canadian Mineralogist"));
    }

    #[test]
    fn test_nothing_recognisable() {
        let fields = ExtractedFields::scan("additional deposit notes pending review");
        assert_eq!(fields, ExtractedFields::default());
    }

    #[test]
    fn test_scan_is_deterministic() {
        let raw = "Bennett, E.H., 1980, Granitic rocks of Tertiary age in the Idaho batholith: Economic Geology, v. 75, p. 278-288, https://doi.org/10.2113/gsecongeo.75.2.278";
        assert_eq!(ExtractedFields::scan(raw), ExtractedFields::scan(raw));
    }
}
