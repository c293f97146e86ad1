//! Markdown-style document parser producing the owned topic tree.
//!
//! Headings open topics, list items become citation records. The
//! reference document is informal, so the parser is tolerant: skipped
//! heading levels, wrapped entries, labelled sub-bullet groups and stray
//! paragraphs are all accepted, and entry text is never dropped.

use regex::Regex;
use std::sync::OnceLock;

use super::RegistryError;
use crate::models::{CitationRecord, Topic, TopicKind};
use crate::utils::extract::{find_url, find_year};

/// Spaces a tab counts for when measuring list indentation
const TAB_WIDTH: usize = 4;

/// Indentation that makes a line a continuation even after a blank line
const CONTINUATION_INDENT: usize = 2;

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}(#{1,6})\s+(.*?)(?:\s+#+)?\s*$").expect("valid heading regex"))
}

/// Ordered markers stop at three digits so a wrapped `1980.` line stays
/// part of the entry above it.
fn item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*)(?:[-*+]|\d{1,3}[.)])(?:\s+(.*))?$").expect("valid list item regex"))
}

fn rule_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:(?:-\s*){3,}|(?:\*\s*){3,}|(?:_\s*){3,})$").expect("valid rule regex")
    })
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:```|~~~)").expect("valid fence regex"))
}

fn site_annotation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\s*[\(\[]\s*(?:(?i:epa|site|superfund)\s+)*ID(?:\s*[:#]\s*|\s+)([A-Za-z0-9][A-Za-z0-9\-]*)\s*[\)\]]\s*$",
        )
        .expect("valid site annotation regex")
    })
}

fn site_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?i:epa|site|superfund)\s+)*ID\s*[:#]\s*([A-Za-z0-9][A-Za-z0-9\-]*)\s*\.?$")
            .expect("valid site line regex")
    })
}

/// Structural role of one document line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind<'a> {
    Blank,
    Fence,
    Heading { level: usize, text: &'a str },
    Item { indent: usize, text: &'a str },
    Text { indent: usize, text: &'a str },
}

#[derive(Debug)]
struct Line<'a> {
    /// 1-based line number
    number: usize,
    raw: &'a str,
    kind: LineKind<'a>,
}

fn indent_width(prefix: &str) -> usize {
    prefix
        .chars()
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

fn classify(raw: &str) -> LineKind<'_> {
    if raw.trim().is_empty() || rule_re().is_match(raw) {
        return LineKind::Blank;
    }
    if fence_re().is_match(raw) {
        return LineKind::Fence;
    }
    if let Some(caps) = heading_re().captures(raw) {
        let level = caps.get(1).map_or(1, |m| m.as_str().len());
        let text = caps.get(2).map_or("", |m| m.as_str());
        return LineKind::Heading { level, text };
    }
    if let Some(caps) = item_re().captures(raw) {
        let indent = caps.get(1).map_or(0, |m| indent_width(m.as_str()));
        let text = caps.get(2).map_or("", |m| m.as_str().trim());
        return LineKind::Item { indent, text };
    }
    let trimmed = raw.trim_start();
    LineKind::Text {
        indent: indent_width(&raw[..raw.len() - trimmed.len()]),
        text: trimmed.trim_end(),
    }
}

/// Strip emphasis and code markers from heading or label text
fn clean_label(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !matches!(c, '*' | '`')).collect();
    stripped.trim().to_string()
}

/// Split a heading into its name and optional site identifier
pub(crate) fn split_site_annotation(text: &str) -> (String, Option<String>) {
    let text = clean_label(text);
    match site_annotation_re().captures(&text) {
        Some(caps) => {
            let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
                return (text.clone(), None);
            };
            let name = text[..whole.start()].trim().to_string();
            (name, Some(id.as_str().to_string()))
        }
        None => (text, None),
    }
}

/// Identifier from an `EPA ID: X` style list item
fn site_id_line(text: &str) -> Option<String> {
    let text = clean_label(text);
    site_line_re()
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// A list item that names a group rather than citing something
fn is_group_label(text: &str) -> bool {
    let text = clean_label(text);
    text.len() > 1 && text.ends_with(':') && find_url(&text).is_none() && find_year(&text).is_none()
}

fn topic_from_label(label: &str, depth: usize) -> Topic {
    let (name, site_id) = split_site_annotation(label);
    let mut topic = Topic::new(name, depth);
    if let Some(external_id) = site_id {
        topic.kind = TopicKind::Site { external_id };
    }
    topic
}

/// The first heading is the document title when it is the only heading at
/// the shallowest level, other headings follow, and no list item sits
/// directly under it.
fn title_heading(lines: &[Line<'_>]) -> Option<usize> {
    let headings: Vec<(usize, usize)> = lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| match line.kind {
            LineKind::Heading { level, .. } => Some((idx, level)),
            _ => None,
        })
        .collect();

    let (first_idx, first_level) = *headings.first()?;
    if headings.len() < 2 {
        return None;
    }
    let min_level = headings.iter().map(|(_, level)| *level).min()?;
    let at_min = headings.iter().filter(|(_, level)| *level == min_level).count();
    if first_level != min_level || at_min != 1 {
        return None;
    }

    let owns_items = lines[first_idx + 1..]
        .iter()
        .take_while(|line| !matches!(line.kind, LineKind::Heading { .. }))
        .any(|line| matches!(line.kind, LineKind::Item { .. }));
    (!owns_items).then_some(first_idx)
}

#[derive(Debug)]
struct OpenTopic {
    topic: Topic,
    /// Normalized heading level; 0 for the root and implicit topics
    heading_level: usize,
    /// Indentation of the list label for implicit topics
    list_indent: Option<usize>,
}

#[derive(Debug)]
struct PendingItem {
    text: String,
    line: usize,
}

/// Stack-based builder: the stack holds the open path from the root
struct TreeBuilder {
    stack: Vec<OpenTopic>,
    pending: Option<PendingItem>,
    after_blank: bool,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![OpenTopic {
                topic: Topic::new("", 0),
                heading_level: 0,
                list_indent: None,
            }],
            pending: None,
            after_blank: false,
        }
    }

    fn current(&mut self) -> &mut Topic {
        let last = self.stack.len() - 1;
        &mut self.stack[last].topic
    }

    fn current_depth(&self) -> usize {
        self.stack.last().map_or(0, |open| open.topic.depth)
    }

    fn current_level(&self) -> usize {
        self.stack.last().map_or(0, |open| open.heading_level)
    }

    fn flush(&mut self) {
        if let Some(item) = self.pending.take() {
            let record = CitationRecord::from_raw(item.text, item.line);
            if record.is_unstructured() {
                tracing::debug!(line = record.line, "Entry kept as raw text only");
            }
            self.current().citations.push(record);
        }
    }

    /// Close the innermost topic and attach it to its parent
    fn close_top(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        if let Some(open) = self.stack.pop() {
            self.current().children.push(open.topic);
        }
    }

    fn close_implicit(&mut self, min_indent: Option<usize>) {
        while let Some(open) = self.stack.last() {
            match (open.list_indent, min_indent) {
                (Some(_), None) => self.close_top(),
                (Some(label_indent), Some(indent)) if label_indent >= indent => self.close_top(),
                _ => break,
            }
        }
    }

    fn open_heading(&mut self, level: usize, text: &str, line: usize) {
        self.flush();
        self.close_implicit(None);
        while self.stack.len() > 1 && self.current_level() >= level {
            self.close_top();
        }
        let parent_level = self.current_level();
        if level > parent_level + 1 {
            tracing::debug!(line, level, parent_level, "Heading skips a level, nesting under nearest parent");
        }
        let topic = topic_from_label(text, self.current_depth() + 1);
        self.stack.push(OpenTopic {
            topic,
            heading_level: level,
            list_indent: None,
        });
    }

    fn open_label(&mut self, label: &str, indent: usize) {
        let label = label.trim_end().trim_end_matches(':');
        let mut topic = topic_from_label(label, self.current_depth() + 1);
        topic.explicit = false;
        self.stack.push(OpenTopic {
            topic,
            heading_level: 0,
            list_indent: Some(indent),
        });
    }

    fn mark_site(&mut self, id: String, line: usize) {
        let topic = self.current();
        match topic.external_id().map(str::to_string) {
            Some(existing) if existing != id => {
                tracing::warn!(line, topic = %topic.name, %existing, ignored = %id, "Topic already carries a site id");
            }
            _ => topic.kind = TopicKind::Site { external_id: id },
        }
    }

    fn finish(mut self) -> Topic {
        self.flush();
        while self.stack.len() > 1 {
            self.close_top();
        }
        self.stack
            .pop()
            .map(|open| open.topic)
            .unwrap_or_else(|| Topic::new("", 0))
    }
}

/// Parse document text into the root topic.
///
/// Fails only when the text is empty or has no headings.
pub(crate) fn parse_document(text: &str) -> Result<Topic, RegistryError> {
    if text.trim().is_empty() {
        return Err(RegistryError::Parse("document is empty".to_string()));
    }

    let lines: Vec<Line<'_>> = text
        .lines()
        .enumerate()
        .map(|(idx, raw)| Line {
            number: idx + 1,
            raw,
            kind: classify(raw),
        })
        .collect();

    if !lines.iter().any(|l| matches!(l.kind, LineKind::Heading { .. })) {
        return Err(RegistryError::Parse(
            "document contains no headings".to_string(),
        ));
    }

    let title = title_heading(&lines);
    let base_level = lines
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != title)
        .filter_map(|(_, line)| match line.kind {
            LineKind::Heading { level, .. } => Some(level),
            _ => None,
        })
        .min()
        .unwrap_or(1);

    let mut builder = TreeBuilder::new();
    let mut in_fence = false;

    for (idx, line) in lines.iter().enumerate() {
        if in_fence {
            if line.kind == LineKind::Fence {
                in_fence = false;
            }
            builder.current().notes.push(line.raw.to_string());
            continue;
        }

        match line.kind {
            LineKind::Blank => {
                builder.after_blank = true;
                continue;
            }
            LineKind::Fence => {
                builder.flush();
                in_fence = true;
                builder.current().notes.push(line.raw.to_string());
            }
            LineKind::Heading { level, text } => {
                if Some(idx) == title {
                    builder.flush();
                    builder.current().name = clean_label(text);
                } else {
                    let level = level.saturating_sub(base_level) + 1;
                    builder.open_heading(level, text, line.number);
                }
            }
            LineKind::Item { indent, text } => {
                builder.flush();
                builder.close_implicit(Some(indent));

                if text.is_empty() {
                    tracing::debug!(line = line.number, "Skipping empty list item");
                } else if is_group_label(text) && next_item_is_nested(&lines[idx + 1..], indent) {
                    builder.open_label(text, indent);
                } else {
                    if let Some(id) = site_id_line(text) {
                        builder.mark_site(id, line.number);
                    }
                    builder.pending = Some(PendingItem {
                        text: text.to_string(),
                        line: line.number,
                    });
                }
            }
            LineKind::Text { indent, text } => {
                let continues = builder.pending.is_some()
                    && (!builder.after_blank || indent >= CONTINUATION_INDENT);
                match builder.pending.as_mut() {
                    Some(item) if continues => {
                        item.text.push(' ');
                        item.text.push_str(text);
                    }
                    _ => {
                        builder.flush();
                        builder.current().notes.push(text.to_string());
                    }
                }
            }
        }
        builder.after_blank = false;
    }

    if in_fence {
        tracing::warn!("Unterminated code fence at end of document");
    }

    Ok(builder.finish())
}

fn next_item_is_nested(rest: &[Line<'_>], indent: usize) -> bool {
    rest.iter()
        .find(|l| l.kind != LineKind::Blank)
        .is_some_and(|l| matches!(l.kind, LineKind::Item { indent: next, .. } if next > indent))
}
