//! The citation registry: load a reference document once, query it many times.
//!
//! [`Registry::load`] turns document text into an owned [`Topic`] tree and
//! builds document-ordered indices over its records. The registry is
//! immutable afterwards and can be shared across threads for read-only
//! access.
//!
//! ```rust
//! use citation_registry::Registry;
//!
//! let text = "\
//! # References
//! ## Tungsten
//! - Bennett, E.H., 1980, Granitic rocks: Economic Geology, v. 75, p. 278-288.
//! ## Contamination Sites
//! ### Bunker Hill, ID (EPA ID: ID0980633712)
//! - Box, S.E., et al., 2005, Mining-impacted sediments: USGS.
//! ";
//!
//! let registry = Registry::load(text).unwrap();
//! assert_eq!(registry.topics(), vec!["Tungsten", "Contamination Sites", "Bunker Hill, ID"]);
//! assert_eq!(registry.find_by_year(1980).len(), 1);
//! assert_eq!(registry.site_by_id("ID0980633712").unwrap().name(), "Bunker Hill, ID");
//! ```

mod error;
mod parser;

pub use error::RegistryError;

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::models::{CitationRecord, Site, Topic};
use crate::utils::elements::{self, Element, ELEMENTS};
use crate::utils::find_duplicate_groups;

/// Position of a record in the tree: child indices from the root, then
/// the slot in that topic's citation list
#[derive(Debug, Clone)]
struct RecordAddr {
    topic: Vec<usize>,
    slot: usize,
}

/// Summary counts over the loaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub topics: usize,
    pub sites: usize,
    pub records: usize,
    pub with_year: usize,
    pub with_url: usize,
    pub unstructured: usize,
}

/// Read-only index over a parsed reference document
#[derive(Debug, Clone)]
pub struct Registry {
    root: Topic,
    /// Every record, document order
    order: Vec<RecordAddr>,
    /// Year -> positions in `order`
    by_year: BTreeMap<i32, Vec<usize>>,
    /// External id -> topic address
    sites: HashMap<String, Vec<usize>>,
}

impl Registry {
    /// Parse document text into a registry.
    ///
    /// Fails with [`RegistryError::Parse`] only when the text is empty or
    /// contains no headings; entries that cannot be structured are kept as
    /// raw text.
    pub fn load(text: &str) -> Result<Self, RegistryError> {
        let root = parser::parse_document(text)?;
        let registry = Self::index(root);

        let stats = registry.stats();
        tracing::info!(
            topics = stats.topics,
            sites = stats.sites,
            records = stats.records,
            unstructured = stats.unstructured,
            "Loaded citation registry"
        );
        Ok(registry)
    }

    /// Read a document from disk and load it
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        tracing::debug!("Reading reference document {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(&text)
    }

    fn index(root: Topic) -> Self {
        let mut order = Vec::new();
        let mut sites = HashMap::new();
        let mut lines = Vec::new();
        collect(&root, &mut Vec::new(), &mut order, &mut lines, &mut sites);

        // Implicit sub-topics can interleave with their parent's entries
        let mut keyed: Vec<(usize, RecordAddr)> = lines.into_iter().zip(order).collect();
        keyed.sort_by_key(|(line, _)| *line);
        let order: Vec<RecordAddr> = keyed.into_iter().map(|(_, addr)| addr).collect();

        let mut registry = Self {
            root,
            order,
            by_year: BTreeMap::new(),
            sites,
        };

        let mut by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (pos, record) in registry.records().enumerate() {
            if let Some(year) = record.year {
                by_year.entry(year).or_default().push(pos);
            }
        }
        registry.by_year = by_year;
        registry
    }

    fn resolve(&self, path: &[usize]) -> Option<&Topic> {
        path.iter()
            .try_fold(&self.root, |topic, &idx| topic.children.get(idx))
    }

    fn record_at(&self, pos: usize) -> Option<&CitationRecord> {
        let addr = self.order.get(pos)?;
        self.resolve(&addr.topic)?.citations.get(addr.slot)
    }

    /// The document root; its name is the document title, if any
    pub fn root(&self) -> &Topic {
        &self.root
    }

    /// Document title, when the document has one
    pub fn title(&self) -> Option<&str> {
        (!self.root.name.is_empty()).then_some(self.root.name.as_str())
    }

    /// All records, document order
    pub fn records(&self) -> impl Iterator<Item = &CitationRecord> + '_ {
        (0..self.order.len()).filter_map(move |pos| self.record_at(pos))
    }

    /// All topic names, document order (the root is not included)
    pub fn topics(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for child in &self.root.children {
            child.walk(&mut |t| names.push(t.name.as_str()));
        }
        names
    }

    /// Resolve a topic path of names descending from the root
    pub fn topic<S: AsRef<str>>(&self, path: &[S]) -> Result<&Topic, RegistryError> {
        if path.is_empty() {
            return Err(RegistryError::NotFound("empty topic path".to_string()));
        }

        let mut current = &self.root;
        for (depth, segment) in path.iter().enumerate() {
            let segment = segment.as_ref();
            current = current.child(segment).ok_or_else(|| {
                let parent = path[..depth]
                    .iter()
                    .map(|s| s.as_ref())
                    .collect::<Vec<_>>()
                    .join(" > ");
                if parent.is_empty() {
                    RegistryError::NotFound(format!("topic '{}'", segment))
                } else {
                    RegistryError::NotFound(format!("topic '{}' under '{}'", segment, parent))
                }
            })?;
        }
        Ok(current)
    }

    /// Records listed directly under the topic at `path`
    pub fn citations_for<S: AsRef<str>>(
        &self,
        path: &[S],
    ) -> Result<&[CitationRecord], RegistryError> {
        Ok(&self.topic(path)?.citations)
    }

    /// Records under the topic at `path` and all of its sub-topics
    pub fn citations_under<S: AsRef<str>>(
        &self,
        path: &[S],
    ) -> Result<Vec<&CitationRecord>, RegistryError> {
        Ok(self.topic(path)?.all_citations())
    }

    /// Records published in `year`, document order
    pub fn find_by_year(&self, year: i32) -> Vec<&CitationRecord> {
        self.by_year
            .get(&year)
            .map(|positions| {
                positions
                    .iter()
                    .filter_map(|&pos| self.record_at(pos))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Records whose raw text contains `keyword`, ignoring case.
    ///
    /// The empty keyword matches every record.
    pub fn find_by_keyword(&self, keyword: &str) -> Vec<&CitationRecord> {
        let keyword = keyword.to_lowercase();
        self.records().filter(|r| r.mentions(&keyword)).collect()
    }

    /// Exact, case-sensitive lookup of a site by its external identifier
    pub fn site_by_id(&self, external_id: &str) -> Result<Site<'_>, RegistryError> {
        self.sites
            .get(external_id)
            .and_then(|path| self.resolve(path))
            .and_then(Site::from_topic)
            .ok_or_else(|| RegistryError::NotFound(format!("site with id '{}'", external_id)))
    }

    /// All sites, document order
    pub fn sites(&self) -> Vec<Site<'_>> {
        let mut sites = Vec::new();
        self.root
            .walk(&mut |t| sites.extend(Site::from_topic(t)));
        sites
    }

    /// Records filed under topics about an element (symbol or name)
    pub fn find_by_element(&self, query: &str) -> Result<Vec<&CitationRecord>, RegistryError> {
        let element = elements::lookup(query)
            .ok_or_else(|| RegistryError::NotFound(format!("element '{}'", query)))?;

        let mut seen = HashSet::new();
        let mut records: Vec<&CitationRecord> = Vec::new();
        for child in &self.root.children {
            child.walk(&mut |t| {
                if element.matches_topic(&t.name) {
                    for record in t.all_citations() {
                        if seen.insert(record.line) {
                            records.push(record);
                        }
                    }
                }
            });
        }
        records.sort_by_key(|r| r.line);
        Ok(records)
    }

    /// Elements that at least one topic refers to, in table order
    pub fn elements(&self) -> Vec<&'static Element> {
        let mut names = Vec::new();
        for child in &self.root.children {
            child.walk(&mut |t| names.push(t.name.as_str()));
        }
        ELEMENTS
            .iter()
            .filter(|e| names.iter().any(|name| e.matches_topic(name)))
            .collect()
    }

    /// Groups of records that cite the same work, document order
    pub fn duplicates(&self, title_threshold: f64) -> Vec<Vec<&CitationRecord>> {
        let records: Vec<&CitationRecord> = self.records().collect();
        find_duplicate_groups(&records, title_threshold)
            .into_iter()
            .map(|group| group.into_iter().map(|idx| records[idx]).collect())
            .collect()
    }

    /// Summary counts
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            topics: self.root.descendant_count(),
            sites: self.sites().len(),
            records: 0,
            with_year: 0,
            with_url: 0,
            unstructured: 0,
        };
        for record in self.records() {
            stats.records += 1;
            stats.with_year += usize::from(record.year.is_some());
            stats.with_url += usize::from(record.url.is_some());
            stats.unstructured += usize::from(record.is_unstructured());
        }
        stats
    }
}

/// Preorder walk collecting record addresses, their lines, and site ids
fn collect(
    topic: &Topic,
    path: &mut Vec<usize>,
    order: &mut Vec<RecordAddr>,
    lines: &mut Vec<usize>,
    sites: &mut HashMap<String, Vec<usize>>,
) {
    if let Some(id) = topic.external_id() {
        if sites.contains_key(id) {
            tracing::warn!(id, topic = %topic.name, "Duplicate site id, keeping the first");
        } else {
            sites.insert(id.to_string(), path.clone());
        }
    }

    for (slot, record) in topic.citations.iter().enumerate() {
        order.push(RecordAddr {
            topic: path.clone(),
            slot,
        });
        lines.push(record.line);
    }

    for (idx, child) in topic.children.iter().enumerate() {
        path.push(idx);
        collect(child, path, order, lines, sites);
        path.pop();
    }
}
