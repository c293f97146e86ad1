//! Duplicate detection for records cited under more than one topic.

use std::collections::HashSet;
use strsim::jaro_winkler;

use crate::models::CitationRecord;

/// Default Jaro-Winkler threshold for treating two titles as the same work
pub const DEFAULT_TITLE_THRESHOLD: f64 = 0.95;

/// Find records that cite the same work.
///
/// Returns groups of indices into `records`; each group has at least two
/// members and keeps the input order.
pub fn find_duplicate_groups(records: &[&CitationRecord], threshold: f64) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut processed: HashSet<usize> = HashSet::new();

    for i in 0..records.len() {
        if processed.contains(&i) {
            continue;
        }

        let mut group = vec![i];
        for (j, other) in records.iter().enumerate().skip(i + 1) {
            if processed.contains(&j) {
                continue;
            }
            if are_duplicates(records[i], other, threshold) {
                group.push(j);
                processed.insert(j);
            }
        }

        if group.len() > 1 {
            groups.push(group);
        }
        processed.insert(i);
    }

    groups
}

/// Check if two records likely cite the same work
fn are_duplicates(a: &CitationRecord, b: &CitationRecord, threshold: f64) -> bool {
    if a.line == b.line {
        return false;
    }

    // Same URL (strongest signal)
    if let (Some(url_a), Some(url_b)) = (&a.url, &b.url) {
        if normalize_url(url_a) == normalize_url(url_b) {
            return true;
        }
    }

    if normalize_text(&a.raw) == normalize_text(&b.raw) {
        return true;
    }

    if a.title.is_empty() || b.title.is_empty() || a.year != b.year {
        return false;
    }

    let title_a = normalize_text(&a.title);
    let title_b = normalize_text(&b.title);
    jaro_winkler(&title_a, &title_b) >= threshold && authors_match(a, b)
}

/// Check if at least one author surname matches
fn authors_match(a: &CitationRecord, b: &CitationRecord) -> bool {
    let surnames = |r: &CitationRecord| -> HashSet<String> {
        r.authors
            .iter()
            .filter_map(|name| name.split(',').next())
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty() && s != "et al.")
            .collect()
    };
    let authors_a = surnames(a);
    let authors_b = surnames(b);

    // Missing author info can't contradict
    if authors_a.is_empty() || authors_b.is_empty() {
        return true;
    }
    authors_a.intersection(&authors_b).count() > 0
}

fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_lowercase()
}

/// Lowercase, strip punctuation and collapse whitespace
fn normalize_text(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Coal  Ash: REE, v. 2!"), "coal ash ree v 2");
    }

    #[test]
    fn test_same_url_is_duplicate() {
        let a = CitationRecord::from_raw("MRDS: https://mrdata.usgs.gov/mrds/", 1);
        let b = CitationRecord::from_raw("USGS MRDS database https://mrdata.usgs.gov/mrds", 9);

        let groups = find_duplicate_groups(&[&a, &b], DEFAULT_TITLE_THRESHOLD);
        assert_eq!(groups, vec![vec![0, 1]]);
    }

    #[test]
    fn test_similar_titles_same_year() {
        let a = CitationRecord::from_raw(
            "Castor, S.B., 2008, The Mountain Pass rare-earth carbonatite: Canadian Mineralogist.",
            3,
        );
        let b = CitationRecord::from_raw(
            "Castor, S.B., 2008, The Mountain Pass rare earth carbonatite: The Canadian Mineralogist, v. 46.",
            30,
        );

        let groups = find_duplicate_groups(&[&a, &b], DEFAULT_TITLE_THRESHOLD);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_different_years_not_duplicate() {
        let a = CitationRecord::from_raw("Bennett, E.H., 1980, Granitic rocks: Economic Geology.", 1);
        let b = CitationRecord::from_raw("Bennett, E.H., 1981, Granitic rocks: Economic Geology.", 2);

        assert!(find_duplicate_groups(&[&a, &b], DEFAULT_TITLE_THRESHOLD).is_empty());
    }

    #[test]
    fn test_no_common_authors() {
        let a = CitationRecord::from_raw("Smith, J., 2010, Tungsten skarns: Journal A.", 1);
        let b = CitationRecord::from_raw("Jones, K., 2010, Tungsten skarns: Journal B.", 2);

        assert!(find_duplicate_groups(&[&a, &b], DEFAULT_TITLE_THRESHOLD).is_empty());
    }

    #[test]
    fn test_empty_list() {
        assert!(find_duplicate_groups(&[], DEFAULT_TITLE_THRESHOLD).is_empty());
    }
}
