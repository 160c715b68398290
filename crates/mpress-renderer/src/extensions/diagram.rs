//! Diagram code blocks (mermaid, plantuml, graphviz, d2).
//!
//! Diagrams need an external renderer, so the synchronous pass only emits a
//! placeholder holding the escaped source and records a pending task.

use markdown_weaver_escape::{escape_html, escape_html_body_text};

use super::Claim;
use crate::session::{ParseSession, PendingTask, TaskKind};
use crate::style::{BlockTag, StyleMapping};
use crate::token::Block;

/// Canonical diagram language for a fence info string.
pub fn diagram_lang(lang: &str) -> Option<&'static str> {
    match lang.to_ascii_lowercase().as_str() {
        "mermaid" => Some("mermaid"),
        "plantuml" | "puml" => Some("plantuml"),
        "graphviz" | "dot" => Some("graphviz"),
        "d2" => Some("d2"),
        _ => None,
    }
}

pub fn tokenize(block: Block) -> Claim {
    match block {
        Block::Code {
            lang: Some(lang),
            source,
        } => match diagram_lang(&lang) {
            Some(canonical) => Claim::Claimed(Block::Diagram {
                lang: canonical.to_string(),
                source,
            }),
            None => Claim::Pass(Block::Code {
                lang: Some(lang),
                source,
            }),
        },
        other => Claim::Pass(other),
    }
}

pub fn render(lang: &str, source: &str, mapping: &StyleMapping, session: &mut ParseSession) -> String {
    let id = session.next_task_id();
    let mut open = format!(
        "<section{} data-task=\"{id}\" data-lang=\"",
        mapping.attr(&BlockTag::Diagram)
    );
    let _ = escape_html(&mut open, lang);
    open.push_str("\">");
    let close = "</section>".to_string();

    let mut placeholder = open.clone();
    placeholder.push_str("<pre style=\"white-space: pre-wrap; margin: 0\">");
    let _ = escape_html_body_text(&mut placeholder, source);
    placeholder.push_str("</pre>");
    placeholder.push_str(&close);

    session.push_task(PendingTask {
        id,
        kind: TaskKind::Diagram {
            lang: lang.to_string(),
        },
        source: source.to_string(),
        placeholder: placeholder.clone(),
        open,
        close,
    });
    placeholder
}
