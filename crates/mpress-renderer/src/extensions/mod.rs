//! Markdown extensions layered over the core token tree.
//!
//! Each extension gets three chances to act on a document:
//!
//! * [`Extension::tokenize`] claims a parsed block and replaces it with an
//!   extension block (`[TOC]`, alerts, sliders, display math, diagrams).
//!   Extensions are tried in priority order; the first to claim wins and a
//!   block nobody claims stays as it is.
//! * [`Extension::prepare`] resets per-document state before the walk.
//! * [`Extension::walk`] visits every block in document order before
//!   rendering, which is how footnote indices and TOC headings are known
//!   ahead of the blocks that reference them.

use crate::session::ParseSession;
use crate::token::{Block, ListItem};

pub mod alert;
pub mod diagram;
pub mod footnote;
pub mod math;
pub mod slider;
pub mod toc;

/// Outcome of offering a block to an extension.
#[derive(Debug)]
pub enum Claim {
    Claimed(Block),
    Pass(Block),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Footnotes,
    Math,
    Toc,
    Alert,
    Slider,
    Diagram,
}

impl Extension {
    /// Every extension, in claim priority order.
    pub const ALL: &'static [Extension] = &[
        Extension::Toc,
        Extension::Slider,
        Extension::Math,
        Extension::Diagram,
        Extension::Alert,
        Extension::Footnotes,
    ];

    pub fn tokenize(self, block: Block) -> Claim {
        match self {
            Extension::Footnotes => Claim::Pass(block),
            Extension::Math => math::tokenize(block),
            Extension::Toc => toc::tokenize(block),
            Extension::Alert => alert::tokenize(block),
            Extension::Slider => slider::tokenize(block),
            Extension::Diagram => diagram::tokenize(block),
        }
    }

    pub fn prepare(self, session: &mut ParseSession) {
        match self {
            Extension::Footnotes => session.footnotes.clear(),
            Extension::Toc => {
                session.headings.clear();
                session.slugger = toc::Slugger::default();
            }
            Extension::Math | Extension::Alert | Extension::Slider | Extension::Diagram => {}
        }
    }

    pub fn walk(self, block: &mut Block, session: &mut ParseSession) {
        match self {
            Extension::Footnotes => footnote::walk(block, session),
            Extension::Toc => toc::walk(block, session),
            Extension::Math | Extension::Alert | Extension::Slider | Extension::Diagram => {}
        }
    }
}

/// The enabled extensions, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: Vec<Extension>,
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self::all()
    }
}

impl ExtensionSet {
    pub fn all() -> Self {
        Self {
            extensions: Extension::ALL.to_vec(),
        }
    }

    pub fn none() -> Self {
        Self {
            extensions: Vec::new(),
        }
    }

    /// Only the given extensions; the priority order is kept regardless of
    /// the order they are passed in.
    pub fn only(enabled: &[Extension]) -> Self {
        Self {
            extensions: Extension::ALL
                .iter()
                .copied()
                .filter(|e| enabled.contains(e))
                .collect(),
        }
    }

    pub fn contains(&self, extension: Extension) -> bool {
        self.extensions.contains(&extension)
    }

    pub fn iter(&self) -> impl Iterator<Item = Extension> + '_ {
        self.extensions.iter().copied()
    }

    /// Offer every block (children first) to the extensions.
    pub fn claim(&self, blocks: Vec<Block>) -> Vec<Block> {
        blocks.into_iter().map(|b| self.claim_block(b)).collect()
    }

    fn claim_block(&self, block: Block) -> Block {
        let mut block = match block {
            Block::BlockQuote(children) => Block::BlockQuote(self.claim(children)),
            Block::List { start, items } => Block::List {
                start,
                items: items
                    .into_iter()
                    .map(|item| ListItem {
                        children: self.claim(item.children),
                    })
                    .collect(),
            },
            Block::FootnoteDefinition { label, children } => Block::FootnoteDefinition {
                label,
                children: self.claim(children),
            },
            Block::Alert {
                kind,
                title,
                fold,
                children,
            } => Block::Alert {
                kind,
                title,
                fold,
                children: self.claim(children),
            },
            other => other,
        };
        for extension in self.iter() {
            match extension.tokenize(block) {
                Claim::Claimed(claimed) => return claimed,
                Claim::Pass(passed) => block = passed,
            }
        }
        block
    }

    pub fn prepare(&self, session: &mut ParseSession) {
        for extension in self.iter() {
            extension.prepare(session);
        }
    }

    /// Visit every block in document order, parents before children.
    pub fn walk(&self, blocks: &mut [Block], session: &mut ParseSession) {
        for block in blocks {
            for extension in self.iter() {
                extension.walk(block, session);
            }
            match block {
                Block::BlockQuote(children)
                | Block::FootnoteDefinition { children, .. }
                | Block::Alert { children, .. } => self.walk(children, session),
                Block::List { items, .. } => {
                    for item in items {
                        self.walk(&mut item.children, session);
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize;

    #[test]
    fn claims_nested_blocks() {
        let set = ExtensionSet::all();
        let blocks = set.claim(tokenize("> [TOC]\n\n- ```mermaid\n  a-->b\n  ```"));
        assert_eq!(blocks[0], Block::BlockQuote(vec![Block::Toc]));
        let Block::List { items, .. } = &blocks[1] else {
            panic!("expected list, got {:?}", blocks[1]);
        };
        assert!(matches!(&items[0].children[0], Block::Diagram { lang, .. } if lang == "mermaid"));
    }

    #[test]
    fn disabled_extensions_do_not_claim() {
        let set = ExtensionSet::only(&[Extension::Diagram]);
        let blocks = set.claim(tokenize("[TOC]"));
        assert!(matches!(blocks[0], Block::Paragraph(_)));
        assert!(set.contains(Extension::Diagram));
        assert!(!set.contains(Extension::Toc));
    }
}
