//! Owned token tree built from the markdown-weaver event stream.
//!
//! The parser emits a flat start/end event stream; renderers and extensions
//! want a tree they can pattern match exhaustively, so events are folded
//! into [`Block`]/[`Inline`] values here. Each container owns its children.

use markdown_weaver::{Alignment, CodeBlockKind, Event, Parser, Tag};

use crate::extensions::alert::AlertKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        id: Option<String>,
        children: Vec<Inline>,
    },
    Paragraph(Vec<Inline>),
    /// Tight list item text, rendered without a paragraph wrapper.
    Plain(Vec<Inline>),
    BlockQuote(Vec<Block>),
    Code {
        lang: Option<String>,
        source: String,
    },
    List {
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    Table {
        alignments: Vec<Alignment>,
        head: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    Rule,
    Html(String),
    FootnoteDefinition {
        label: String,
        children: Vec<Block>,
    },
    /// `[TOC]` placeholder.
    Toc,
    Alert {
        kind: AlertKind,
        title: Option<Vec<Inline>>,
        /// `Some(open)` for collapsible callouts.
        fold: Option<bool>,
        children: Vec<Block>,
    },
    MathBlock(String),
    Diagram {
        lang: String,
        source: String,
    },
    Slider(Vec<SliderImage>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListItem {
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderImage {
    pub url: String,
    pub title: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Code(String),
    SoftBreak,
    HardBreak,
    Html(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Superscript(Vec<Inline>),
    Subscript(Vec<Inline>),
    Link {
        url: String,
        title: String,
        children: Vec<Inline>,
    },
    Image {
        url: String,
        title: String,
        alt: Vec<Inline>,
    },
    FootnoteReference(String),
    Math {
        source: String,
        display: bool,
    },
    TaskMarker(bool),
}

impl Inline {
    pub fn children(&self) -> Option<&[Inline]> {
        match self {
            Inline::Emphasis(c)
            | Inline::Strong(c)
            | Inline::Strikethrough(c)
            | Inline::Superscript(c)
            | Inline::Subscript(c)
            | Inline::Link { children: c, .. }
            | Inline::Image { alt: c, .. } => Some(c),
            Inline::Text(_)
            | Inline::Code(_)
            | Inline::SoftBreak
            | Inline::HardBreak
            | Inline::Html(_)
            | Inline::FootnoteReference(_)
            | Inline::Math { .. }
            | Inline::TaskMarker(_) => None,
        }
    }
}

/// Concatenated text content of `inlines`, without markup.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_plain_text(inlines, &mut out);
    out
}

fn push_plain_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) => out.push_str(t),
            Inline::Math { source, .. } => out.push_str(source),
            Inline::SoftBreak | Inline::HardBreak => out.push(' '),
            Inline::Html(_) | Inline::FootnoteReference(_) | Inline::TaskMarker(_) => {}
            other => {
                if let Some(children) = other.children() {
                    push_plain_text(children, out);
                }
            }
        }
    }
}

/// Parser extensions. Front matter is split off before parsing, so metadata
/// blocks stay off: a leading `---` is a rule or a setext underline here.
pub fn default_md_options() -> markdown_weaver::Options {
    markdown_weaver::Options::ENABLE_WIKILINKS
        | markdown_weaver::Options::ENABLE_FOOTNOTES
        | markdown_weaver::Options::ENABLE_TABLES
        | markdown_weaver::Options::ENABLE_STRIKETHROUGH
        | markdown_weaver::Options::ENABLE_TASKLISTS
        | markdown_weaver::Options::ENABLE_MATH
        | markdown_weaver::Options::ENABLE_HEADING_ATTRIBUTES
}

/// Parse `markdown` into a block tree.
pub fn tokenize(markdown: &str) -> Vec<Block> {
    let parser = Parser::new_ext(markdown, default_md_options());
    let mut builder = TreeBuilder::new();
    for event in parser {
        builder.push_event(event);
    }
    builder.finish()
}

/// Open container while folding events.
enum Frame {
    Root(Vec<Block>),
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        id: Option<String>,
        children: Vec<Inline>,
    },
    BlockQuote(Vec<Block>),
    Code {
        lang: Option<String>,
        source: String,
    },
    List {
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    Item {
        blocks: Vec<Block>,
        pending: Vec<Inline>,
    },
    Table {
        alignments: Vec<Alignment>,
        head: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    TableHead(Vec<Vec<Inline>>),
    TableRow(Vec<Vec<Inline>>),
    TableCell(Vec<Inline>),
    FootnoteDefinition {
        label: String,
        blocks: Vec<Block>,
    },
    HtmlBlock(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Superscript(Vec<Inline>),
    Subscript(Vec<Inline>),
    Link {
        url: String,
        title: String,
        children: Vec<Inline>,
    },
    Image {
        url: String,
        title: String,
        alt: Vec<Inline>,
    },
    /// Anything else: children are spliced into the parent.
    Transparent(Vec<Inline>),
}

struct TreeBuilder {
    stack: Vec<Frame>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::Root(Vec::new())],
        }
    }

    fn push_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push_inline(Inline::Code(code.to_string())),
            Event::InlineMath(src) => self.push_inline(Inline::Math {
                source: src.to_string(),
                display: false,
            }),
            Event::DisplayMath(src) => self.push_inline(Inline::Math {
                source: src.to_string(),
                display: true,
            }),
            Event::Html(html) => self.html(&html),
            Event::InlineHtml(html) => self.push_inline(Inline::Html(html.to_string())),
            Event::FootnoteReference(label) => {
                self.push_inline(Inline::FootnoteReference(label.to_string()))
            }
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => self.push_block(Block::Rule),
            Event::TaskListMarker(checked) => self.push_inline(Inline::TaskMarker(checked)),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph { .. } => Frame::Paragraph(Vec::new()),
            Tag::Heading { level, id, .. } => Frame::Heading {
                level: level as u8,
                id: id.map(|id| id.to_string()),
                children: Vec::new(),
            },
            Tag::BlockQuote(_) => Frame::BlockQuote(Vec::new()),
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                Frame::Code {
                    lang,
                    source: String::new(),
                }
            }
            Tag::List(start) => Frame::List {
                start,
                items: Vec::new(),
            },
            Tag::Item => Frame::Item {
                blocks: Vec::new(),
                pending: Vec::new(),
            },
            Tag::Table(alignments) => Frame::Table {
                alignments,
                head: Vec::new(),
                rows: Vec::new(),
            },
            Tag::TableHead => Frame::TableHead(Vec::new()),
            Tag::TableRow => Frame::TableRow(Vec::new()),
            Tag::TableCell => Frame::TableCell(Vec::new()),
            Tag::FootnoteDefinition(label) => Frame::FootnoteDefinition {
                label: label.to_string(),
                blocks: Vec::new(),
            },
            Tag::HtmlBlock => Frame::HtmlBlock(String::new()),
            Tag::Emphasis => Frame::Emphasis(Vec::new()),
            Tag::Strong => Frame::Strong(Vec::new()),
            Tag::Strikethrough => Frame::Strikethrough(Vec::new()),
            Tag::Superscript => Frame::Superscript(Vec::new()),
            Tag::Subscript => Frame::Subscript(Vec::new()),
            Tag::Link {
                dest_url, title, ..
            } => Frame::Link {
                url: dest_url.to_string(),
                title: title.to_string(),
                children: Vec::new(),
            },
            Tag::Image {
                dest_url, title, ..
            } => Frame::Image {
                url: dest_url.to_string(),
                title: title.to_string(),
                alt: Vec::new(),
            },
            _ => Frame::Transparent(Vec::new()),
        };
        self.stack.push(frame);
    }

    fn end(&mut self) {
        // never pop the root; a stray end event is ignored
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Root(_) => {}
            Frame::Paragraph(children) => self.push_block(Block::Paragraph(children)),
            Frame::Heading {
                level,
                id,
                children,
            } => self.push_block(Block::Heading {
                level,
                id,
                children,
            }),
            Frame::BlockQuote(children) => self.push_block(Block::BlockQuote(children)),
            Frame::Code { lang, source } => self.push_block(Block::Code { lang, source }),
            Frame::List { start, items } => self.push_block(Block::List { start, items }),
            Frame::Item {
                mut blocks,
                pending,
            } => {
                if !pending.is_empty() {
                    blocks.push(Block::Plain(pending));
                }
                if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                    items.push(ListItem { children: blocks });
                } else {
                    for block in blocks {
                        self.push_block(block);
                    }
                }
            }
            Frame::Table {
                alignments,
                head,
                rows,
            } => self.push_block(Block::Table {
                alignments,
                head,
                rows,
            }),
            Frame::TableHead(cells) => {
                if let Some(Frame::Table { head, .. }) = self.stack.last_mut() {
                    *head = cells;
                }
            }
            Frame::TableRow(cells) => {
                if let Some(Frame::Table { rows, .. }) = self.stack.last_mut() {
                    rows.push(cells);
                }
            }
            Frame::TableCell(children) => match self.stack.last_mut() {
                Some(Frame::TableHead(cells)) | Some(Frame::TableRow(cells)) => {
                    cells.push(children)
                }
                _ => self.push_inlines(children),
            },
            Frame::FootnoteDefinition { label, blocks } => {
                self.push_block(Block::FootnoteDefinition {
                    label,
                    children: blocks,
                })
            }
            Frame::HtmlBlock(html) => {
                if !html.trim().is_empty() {
                    self.push_block(Block::Html(html))
                }
            }
            Frame::Emphasis(c) => self.push_inline(Inline::Emphasis(c)),
            Frame::Strong(c) => self.push_inline(Inline::Strong(c)),
            Frame::Strikethrough(c) => self.push_inline(Inline::Strikethrough(c)),
            Frame::Superscript(c) => self.push_inline(Inline::Superscript(c)),
            Frame::Subscript(c) => self.push_inline(Inline::Subscript(c)),
            Frame::Link {
                url,
                title,
                children,
            } => self.push_inline(Inline::Link {
                url,
                title,
                children,
            }),
            Frame::Image { url, title, alt } => self.push_inline(Inline::Image { url, title, alt }),
            Frame::Transparent(children) => self.push_inlines(children),
        }
    }

    fn text(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(Frame::Code { source, .. }) => source.push_str(text),
            Some(Frame::HtmlBlock(html)) => html.push_str(text),
            _ => self.push_inline(Inline::Text(text.to_string())),
        }
    }

    fn html(&mut self, html: &str) {
        match self.stack.last_mut() {
            Some(Frame::HtmlBlock(buf)) => buf.push_str(html),
            _ => self.push_inline(Inline::Html(html.to_string())),
        }
    }

    fn push_inlines(&mut self, inlines: Vec<Inline>) {
        for inline in inlines {
            self.push_inline(inline);
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        let target = match self.stack.last_mut() {
            Some(
                Frame::Paragraph(c)
                | Frame::Heading { children: c, .. }
                | Frame::TableCell(c)
                | Frame::Emphasis(c)
                | Frame::Strong(c)
                | Frame::Strikethrough(c)
                | Frame::Superscript(c)
                | Frame::Subscript(c)
                | Frame::Link { children: c, .. }
                | Frame::Image { alt: c, .. }
                | Frame::Transparent(c),
            ) => c,
            Some(Frame::Item { pending, .. }) => pending,
            Some(Frame::Code { source, .. }) => {
                if let Inline::Text(t) = &inline {
                    source.push_str(t);
                }
                return;
            }
            // inline content directly under a block container gets its own paragraph
            _ => {
                self.push_block(Block::Paragraph(vec![inline]));
                return;
            }
        };
        // adjacent text runs are merged so extensions see whole lines
        if let (Inline::Text(new), Some(Inline::Text(prev))) = (&inline, target.last_mut()) {
            prev.push_str(new);
            return;
        }
        target.push(inline);
    }

    fn push_block(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(
                Frame::Root(blocks)
                | Frame::BlockQuote(blocks)
                | Frame::FootnoteDefinition { blocks, .. },
            ) => blocks.push(block),
            Some(Frame::Item { blocks, pending }) => {
                if !pending.is_empty() {
                    blocks.push(Block::Plain(std::mem::take(pending)));
                }
                blocks.push(block);
            }
            _ => {
                // a block inside an inline container: close the gap by
                // degrading it to its text
                tracing::debug!("block token inside inline container, flattening");
                if let Block::Paragraph(children) | Block::Plain(children) = block {
                    self.push_inlines(children);
                }
            }
        }
    }

    fn finish(mut self) -> Vec<Block> {
        while self.stack.len() > 1 {
            self.end();
        }
        match self.stack.pop() {
            Some(Frame::Root(blocks)) => blocks,
            _ => Vec::new(),
        }
    }
}
