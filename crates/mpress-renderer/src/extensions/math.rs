//! `$…$` / `$$…$$` math and fenced `math` blocks.

use markdown_weaver_escape::escape_html;

use super::Claim;
use crate::math::{MathRenderer, error_html};
use crate::session::{ParseSession, PendingTask, TaskKind};
use crate::style::{BlockTag, InlineTag, StyleMapping};
use crate::token::{Block, Inline};

/// Label shown in a placeholder until the task resolves.
pub const LOADING_LABEL: &str = "loading";

pub fn tokenize(block: Block) -> Claim {
    match block {
        Block::Paragraph(inlines) => match sole_display_math(&inlines) {
            Some(source) => Claim::Claimed(Block::MathBlock(source)),
            None => Claim::Pass(Block::Paragraph(inlines)),
        },
        Block::Code {
            lang: Some(lang),
            source,
        } if matches!(lang.to_ascii_lowercase().as_str(), "math" | "latex" | "katex") => {
            Claim::Claimed(Block::MathBlock(source.trim_end().to_string()))
        }
        other => Claim::Pass(other),
    }
}

/// A paragraph holding nothing but one `$$…$$` becomes a block.
fn sole_display_math(inlines: &[Inline]) -> Option<String> {
    let mut found = None;
    for inline in inlines {
        match inline {
            Inline::Math {
                source,
                display: true,
            } if found.is_none() => found = Some(source.clone()),
            Inline::SoftBreak | Inline::HardBreak => {}
            Inline::Text(t) if t.trim().is_empty() => {}
            _ => return None,
        }
    }
    found
}

/// Typeset `source`, or leave a placeholder and a pending task when no
/// renderer is configured.
pub fn render(
    source: &str,
    display: bool,
    renderer: Option<&dyn MathRenderer>,
    mapping: &StyleMapping,
    session: &mut ParseSession,
) -> String {
    let (element, style) = if display {
        ("section", mapping.attr(&BlockTag::MathBlock))
    } else {
        ("span", mapping.attr(&InlineTag::MathInline))
    };

    let Some(renderer) = renderer else {
        let id = session.next_task_id();
        let mut open = format!("<{element}{style} data-task=\"{id}\" data-math=\"");
        let _ = escape_html(&mut open, source);
        open.push_str("\">");
        let close = format!("</{element}>");
        let placeholder = format!("{open}{LOADING_LABEL}{close}");
        session.push_task(PendingTask {
            id,
            kind: TaskKind::Math { display },
            source: source.to_string(),
            placeholder: placeholder.clone(),
            open,
            close,
        });
        return placeholder;
    };

    let body = match renderer.render(source, display) {
        Ok(markup) => markup,
        Err(e) => {
            tracing::debug!(error = %e, "math did not typeset, showing source");
            error_html(source, &e.to_string(), display)
        }
    };
    format!("<{element}{style}>{body}</{element}>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::MathMlRenderer;
    use crate::token::tokenize as parse;

    #[test]
    fn display_math_paragraph_becomes_block() {
        let block = parse("$$\nE = mc^2\n$$").remove(0);
        let Claim::Claimed(Block::MathBlock(src)) = tokenize(block) else {
            panic!("expected math block");
        };
        assert_eq!(src.trim(), "E = mc^2");
    }

    #[test]
    fn mixed_paragraph_is_left_alone() {
        let block = parse("Energy $$E$$ here").remove(0);
        assert!(matches!(tokenize(block), Claim::Pass(Block::Paragraph(_))));
    }

    #[test]
    fn missing_renderer_leaves_placeholder() {
        let mut session = ParseSession::default();
        let html = render("a<b", false, None, &StyleMapping::default(), &mut session);
        assert_eq!(
            html,
            "<span data-task=\"mpress-task-1\" data-math=\"a&lt;b\">loading</span>"
        );
        assert_eq!(session.pending.len(), 1);
        assert_eq!(session.pending[0].source, "a<b");
        assert_eq!(session.pending[0].placeholder, html);
    }

    #[test]
    fn renderer_errors_show_source() {
        let mut session = ParseSession::default();
        let html = render(
            r"\frac{a",
            true,
            Some(&MathMlRenderer),
            &StyleMapping::default(),
            &mut session,
        );
        assert!(html.starts_with("<section>"));
        assert!(html.contains("<code>\\frac{a</code>"));
        assert!(session.pending.is_empty());
    }
}
