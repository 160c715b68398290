//! Per-render mutable state.
//!
//! One [`ParseSession`] is created for every render call and handed to each
//! extension hook and to the writer. Nothing in here outlives the render, so
//! two documents never see each other's footnotes, slugs or tasks.

use std::collections::HashMap;

use crate::extensions::toc::Slugger;

/// One footnote block entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteEntry {
    /// 1-based position in the footnote block.
    pub index: usize,
    /// Definition label for `[^label]` notes, link title for citations.
    pub label: String,
    /// Target for cited links; `None` for explicit definitions.
    pub url: Option<String>,
    /// Rendered inline HTML of the note body.
    pub content: String,
    /// How many `[^label]` references point at this note.
    pub references: usize,
}

/// Ordered footnote registry.
///
/// Explicit definitions are registered by the walk before anything is
/// rendered, so they take the first indices in definition order. Cited links
/// are appended while rendering, deduplicated by URL.
#[derive(Debug, Clone, Default)]
pub struct Footnotes {
    entries: Vec<FootnoteEntry>,
    labels: HashMap<String, usize>,
    urls: HashMap<String, usize>,
}

impl Footnotes {
    /// Register a `[^label]: …` definition. A repeated label keeps the
    /// first registration.
    pub fn define(&mut self, label: &str) -> usize {
        if let Some(&index) = self.labels.get(label) {
            return index;
        }
        let index = self.entries.len() + 1;
        self.entries.push(FootnoteEntry {
            index,
            label: label.to_string(),
            url: None,
            content: String::new(),
            references: 0,
        });
        self.labels.insert(label.to_string(), index);
        index
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.get(label).copied()
    }

    /// Count a reference to `label`, returning the note index and the
    /// 1-based number of this reference among all references to it.
    pub fn reference(&mut self, label: &str) -> Option<(usize, usize)> {
        let index = self.index_of(label)?;
        let entry = self.entries.get_mut(index - 1)?;
        entry.references += 1;
        Some((index, entry.references))
    }

    /// Store the rendered body for a definition. Only the first body for a
    /// label is kept.
    pub fn set_content(&mut self, label: &str, html: String) {
        let Some(&index) = self.labels.get(label) else {
            return;
        };
        if let Some(entry) = self.entries.get_mut(index - 1) {
            if entry.content.is_empty() {
                entry.content = html;
            }
        }
    }

    /// Register a cited link, returning its index.
    pub fn cite(&mut self, url: &str, title: &str) -> usize {
        if let Some(&index) = self.urls.get(url) {
            return index;
        }
        let index = self.entries.len() + 1;
        self.entries.push(FootnoteEntry {
            index,
            label: title.to_string(),
            url: Some(url.to_string()),
            content: String::new(),
            references: 0,
        });
        self.urls.insert(url.to_string(), index);
        index
    }

    pub fn entries(&self) -> &[FootnoteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.labels.clear();
        self.urls.clear();
    }
}

/// A heading collected for the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingEntry {
    pub text: String,
    pub depth: u8,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    Math { display: bool },
    Diagram { lang: String },
}

/// Work left behind by a synchronous render.
///
/// `placeholder` is the exact HTML emitted in its place; resolving the task
/// means swapping that string for the final markup with
/// [`RenderOutput::patch`](crate::RenderOutput::patch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTask {
    pub id: String,
    pub kind: TaskKind,
    pub source: String,
    pub placeholder: String,
    /// Wrapper markup kept around the resolved content.
    pub open: String,
    pub close: String,
}

impl PendingTask {
    /// Final markup for resolved `html`, in the placeholder's wrapper.
    pub fn fill(&self, html: &str) -> String {
        format!("{}{html}{}", self.open, self.close)
    }
}

#[derive(Debug, Default)]
pub struct ParseSession {
    pub footnotes: Footnotes,
    pub headings: Vec<HeadingEntry>,
    pub slugger: Slugger,
    pub pending: Vec<PendingTask>,
    /// Whether cited links become footnotes for this render.
    pub cite_links: bool,
}

impl ParseSession {
    pub fn new(cite_links: bool) -> Self {
        Self {
            cite_links,
            ..Default::default()
        }
    }

    /// Allocate the next task id, unique within this render.
    pub fn next_task_id(&self) -> String {
        format!("mpress-task-{}", self.pending.len() + 1)
    }

    pub fn push_task(&mut self, task: PendingTask) {
        tracing::debug!(id = %task.id, kind = ?task.kind, "deferred render task");
        self.pending.push(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_come_before_citations() {
        let mut notes = Footnotes::default();
        assert_eq!(notes.define("a"), 1);
        assert_eq!(notes.define("b"), 2);
        assert_eq!(notes.cite("https://example.com", "Example"), 3);
        assert_eq!(notes.cite("https://example.com", "Again"), 3);
        assert_eq!(notes.define("a"), 1);
        assert_eq!(notes.len(), 3);
        assert_eq!(notes.index_of("b"), Some(2));
        assert_eq!(notes.index_of("zzz"), None);
    }

    #[test]
    fn references_are_numbered_per_note() {
        let mut notes = Footnotes::default();
        notes.define("a");
        notes.define("b");
        assert_eq!(notes.reference("a"), Some((1, 1)));
        assert_eq!(notes.reference("b"), Some((2, 1)));
        assert_eq!(notes.reference("a"), Some((1, 2)));
        assert_eq!(notes.reference("missing"), None);
        assert_eq!(notes.entries()[0].references, 2);
    }

    #[test]
    fn first_content_wins() {
        let mut notes = Footnotes::default();
        notes.define("a");
        notes.set_content("a", "one".into());
        notes.set_content("a", "two".into());
        notes.set_content("missing", "x".into());
        assert_eq!(notes.entries()[0].content, "one");
    }
}
