//! Word count and reading time.

use unicode_segmentation::UnicodeSegmentation;

use crate::token::{Block, Inline};

pub const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadingStats {
    pub words: usize,
    pub minutes: usize,
}

impl ReadingStats {
    pub fn from_words(words: usize) -> Self {
        Self {
            words,
            minutes: words.div_ceil(WORDS_PER_MINUTE).max(1),
        }
    }

    /// Count prose in `blocks`. Code, math, diagrams and raw HTML are not
    /// read, so they do not count.
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut counter = WordCounter::default();
        counter.blocks(blocks);
        Self::from_words(counter.words)
    }
}

/// Words in `text`. Each CJK ideograph counts as a word of its own.
pub fn count_words(text: &str) -> usize {
    text.unicode_words()
        .map(|word| {
            let ideographs = word.chars().filter(|c| is_cjk(*c)).count();
            if ideographs > 0 {
                let rest = word.chars().any(|c| !is_cjk(c) && c.is_alphanumeric());
                ideographs + usize::from(rest)
            } else {
                1
            }
        })
        .sum()
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30ff}'   // kana
        | '\u{3400}'..='\u{4dbf}' // extension A
        | '\u{4e00}'..='\u{9fff}' // unified ideographs
        | '\u{ac00}'..='\u{d7af}' // hangul
        | '\u{f900}'..='\u{faff}'
        | '\u{20000}'..='\u{2ffff}')
}

#[derive(Default)]
struct WordCounter {
    words: usize,
}

impl WordCounter {
    fn blocks(&mut self, blocks: &[Block]) {
        for block in blocks {
            self.block(block);
        }
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Heading { children, .. }
            | Block::Paragraph(children)
            | Block::Plain(children) => self.inlines(children),
            Block::BlockQuote(children) | Block::FootnoteDefinition { children, .. } => {
                self.blocks(children)
            }
            Block::Alert {
                title, children, ..
            } => {
                if let Some(title) = title {
                    self.inlines(title);
                }
                self.blocks(children);
            }
            Block::List { items, .. } => {
                for item in items {
                    self.blocks(&item.children);
                }
            }
            Block::Table { head, rows, .. } => {
                for cell in head.iter().chain(rows.iter().flatten()) {
                    self.inlines(cell);
                }
            }
            Block::Code { .. }
            | Block::Rule
            | Block::Html(_)
            | Block::Toc
            | Block::MathBlock(_)
            | Block::Diagram { .. }
            | Block::Slider(_) => {}
        }
    }

    fn inlines(&mut self, inlines: &[Inline]) {
        let mut text = String::new();
        self.collect(inlines, &mut text);
        self.words += count_words(&text);
    }

    fn collect(&self, inlines: &[Inline], text: &mut String) {
        for inline in inlines {
            match inline {
                Inline::Text(t) => text.push_str(t),
                Inline::SoftBreak | Inline::HardBreak => text.push(' '),
                Inline::Code(_)
                | Inline::Math { .. }
                | Inline::Html(_)
                | Inline::Image { .. }
                | Inline::FootnoteReference(_)
                | Inline::TaskMarker(_) => text.push(' '),
                Inline::Emphasis(c)
                | Inline::Strong(c)
                | Inline::Strikethrough(c)
                | Inline::Superscript(c)
                | Inline::Subscript(c)
                | Inline::Link { children: c, .. } => self.collect(c, text),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize;

    #[test]
    fn minutes_round_up_with_a_floor() {
        assert_eq!(ReadingStats::from_words(1).minutes, 1);
        assert_eq!(ReadingStats::from_words(200).minutes, 1);
        assert_eq!(ReadingStats::from_words(201).minutes, 2);
    }

    #[test]
    fn counts_latin_and_cjk() {
        assert_eq!(count_words("Hello, brave new world."), 4);
        assert_eq!(count_words("你好世界"), 4);
        assert_eq!(count_words("Rust 语言"), 3);
    }

    #[test]
    fn code_and_math_are_skipped() {
        let blocks = tokenize("# Two words\n\nOne `skipped code` $x+y$ more.\n\n```\nnot counted at all\n```");
        assert_eq!(ReadingStats::from_blocks(&blocks).words, 4);
    }
}
