//! Topic tree nodes and the Site view.

use serde::{Deserialize, Serialize};

use super::CitationRecord;

/// What a topic node represents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum TopicKind {
    /// Plain grouping (element, commodity, data-source section, ...)
    Group,
    /// A site carrying an external identifier such as an EPA site ID
    Site { external_id: String },
}

/// A named grouping node in the document's heading hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Heading text (site annotation stripped)
    pub name: String,

    /// Tree depth; the document root is 0
    pub depth: usize,

    /// Group or Site
    #[serde(flatten)]
    pub kind: TopicKind,

    /// False when the topic came from a list label rather than a heading
    pub explicit: bool,

    /// Paragraph lines written under the heading
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,

    /// Citations directly under this topic, document order
    pub citations: Vec<CitationRecord>,

    /// Sub-topics, document order
    pub children: Vec<Topic>,
}

impl Topic {
    /// Create an empty group topic
    pub fn new(name: impl Into<String>, depth: usize) -> Self {
        Self {
            name: name.into(),
            depth,
            kind: TopicKind::Group,
            explicit: true,
            notes: Vec::new(),
            citations: Vec::new(),
            children: Vec::new(),
        }
    }

    /// External identifier when this topic is a site
    pub fn external_id(&self) -> Option<&str> {
        match &self.kind {
            TopicKind::Site { external_id } => Some(external_id),
            TopicKind::Group => None,
        }
    }

    /// Check if this topic is a site
    pub fn is_site(&self) -> bool {
        matches!(self.kind, TopicKind::Site { .. })
    }

    /// Find a direct child by exact name
    pub fn child(&self, name: &str) -> Option<&Topic> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Visit this topic and all descendants in preorder
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Topic)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// This topic's records plus every descendant's, sorted by document line
    pub fn all_citations(&self) -> Vec<&CitationRecord> {
        let mut records = Vec::new();
        self.walk(&mut |t| records.extend(t.citations.iter()));
        records.sort_by_key(|r| r.line);
        records
    }

    /// Number of topics in this subtree, excluding self
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }
}

/// A topic specialized with an external identifier
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Site<'a> {
    /// Regulatory identifier (e.g. "ID0980633712")
    pub external_id: &'a str,

    /// The topic carrying the identifier
    pub topic: &'a Topic,
}

impl<'a> Site<'a> {
    /// Build a site view over a topic, if it carries an identifier
    pub fn from_topic(topic: &'a Topic) -> Option<Self> {
        topic.external_id().map(|external_id| Self { external_id, topic })
    }

    /// Site name
    pub fn name(&self) -> &'a str {
        &self.topic.name
    }

    /// Citations listed for this site
    pub fn citations(&self) -> &'a [CitationRecord] {
        &self.topic.citations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_topic() -> Topic {
        let mut topic = Topic::new("Bunker Hill, ID", 2);
        topic.kind = TopicKind::Site {
            external_id: "ID0980633712".to_string(),
        };
        topic
            .citations
            .push(CitationRecord::unstructured("Box et al. 2005", 40));
        topic
    }

    #[test]
    fn test_site_view() {
        let topic = site_topic();
        let site = Site::from_topic(&topic).unwrap();

        assert_eq!(site.external_id, "ID0980633712");
        assert_eq!(site.name(), "Bunker Hill, ID");
        assert_eq!(site.citations().len(), 1);
    }

    #[test]
    fn test_group_is_not_site() {
        let topic = Topic::new("Tungsten", 1);
        assert!(!topic.is_site());
        assert!(Site::from_topic(&topic).is_none());
    }

    #[test]
    fn test_all_citations_in_line_order() {
        let mut parent = Topic::new("Rare Earth Elements (REE)", 1);
        let mut child = Topic::new("Mountain Pass, CA", 2);
        child.citations.push(CitationRecord::unstructured("b", 5));
        parent.citations.push(CitationRecord::unstructured("c", 9));
        parent.citations.push(CitationRecord::unstructured("a", 2));
        parent.children.push(child);

        let raws: Vec<&str> = parent
            .all_citations()
            .iter()
            .map(|r| r.raw.as_str())
            .collect();
        assert_eq!(raws, vec!["a", "b", "c"]);
        assert_eq!(parent.descendant_count(), 1);
    }
}
