//! GitHub alerts and Obsidian callouts: `> [!NOTE] Optional title`.

use std::str::FromStr;

use super::Claim;
use crate::style::BlockTag;
use crate::token::{Block, Inline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AlertKind {
    pub fn tag(self) -> BlockTag {
        match self {
            AlertKind::Note => BlockTag::AlertNote,
            AlertKind::Tip => BlockTag::AlertTip,
            AlertKind::Important => BlockTag::AlertImportant,
            AlertKind::Warning => BlockTag::AlertWarning,
            AlertKind::Caution => BlockTag::AlertCaution,
        }
    }

    /// Default title when the marker line carries none.
    pub fn label(self) -> &'static str {
        match self {
            AlertKind::Note => "Note",
            AlertKind::Tip => "Tip",
            AlertKind::Important => "Important",
            AlertKind::Warning => "Warning",
            AlertKind::Caution => "Caution",
        }
    }
}

impl FromStr for AlertKind {
    type Err = ();

    /// Case-insensitive, with the Obsidian callout names folded onto the
    /// five GitHub kinds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "note" | "info" | "todo" | "abstract" | "summary" | "tldr" | "example" | "quote"
            | "cite" => AlertKind::Note,
            "tip" | "hint" | "success" | "check" | "done" => AlertKind::Tip,
            "important" | "question" | "help" | "faq" => AlertKind::Important,
            "warning" | "attention" => AlertKind::Warning,
            "caution" | "danger" | "error" | "bug" | "failure" | "fail" | "missing" => {
                AlertKind::Caution
            }
            _ => return Err(()),
        };
        Ok(kind)
    }
}

/// `(kind, fold, rest of the line)` for a `[!TYPE]` marker.
fn parse_marker(text: &str) -> Option<(AlertKind, Option<bool>, &str)> {
    let rest = text.trim_start().strip_prefix("[!")?;
    let close = rest.find(']')?;
    let kind = AlertKind::from_str(&rest[..close]).ok()?;
    let after = &rest[close + 1..];
    let (fold, after) = match after.chars().next() {
        Some('-') => (Some(false), &after[1..]),
        Some('+') => (Some(true), &after[1..]),
        _ => (None, after),
    };
    Some((kind, fold, after))
}

pub fn tokenize(block: Block) -> Claim {
    let Block::BlockQuote(mut children) = block else {
        return Claim::Pass(block);
    };
    let marker = match children.first() {
        Some(Block::Paragraph(inlines)) => match inlines.first() {
            Some(Inline::Text(text)) => parse_marker(text),
            _ => None,
        },
        _ => None,
    };
    let Some((kind, fold, rest)) = marker else {
        return Claim::Pass(Block::BlockQuote(children));
    };
    let rest = rest.trim_start().to_string();

    let Block::Paragraph(mut inlines) = children.remove(0) else {
        return Claim::Pass(Block::BlockQuote(children));
    };
    inlines.remove(0);

    // the title runs to the end of the marker line
    let split = inlines
        .iter()
        .position(|i| matches!(i, Inline::SoftBreak | Inline::HardBreak))
        .unwrap_or(inlines.len());
    let mut body: Vec<Inline> = inlines.split_off(split);
    if !body.is_empty() {
        body.remove(0);
    }
    let mut title = inlines;
    if !rest.is_empty() {
        title.insert(0, Inline::Text(rest));
    }
    if let Some(Inline::Text(last)) = title.last_mut() {
        let trimmed = last.trim_end().len();
        last.truncate(trimmed);
    }
    let title = if title.is_empty() { None } else { Some(title) };

    if !body.is_empty() {
        children.insert(0, Block::Paragraph(body));
    }
    Claim::Claimed(Block::Alert {
        kind,
        title,
        fold,
        children,
    })
}
