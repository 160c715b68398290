//! Footnote references, definitions and cited links.

use markdown_weaver_escape::escape_html_body_text;

use crate::session::{FootnoteEntry, Footnotes, ParseSession};
use crate::style::{BlockTag, InlineTag, StyleMapping};
use crate::token::Block;

/// Heading shown above the footnote block.
pub const FOOTNOTES_TITLE: &str = "引用链接";

const INDEX_STYLE: &str = "font-size: 90%; opacity: 0.6;";
const URL_STYLE: &str = "word-break: break-all";

/// Register definitions in document order so references can resolve to
/// their index no matter where they appear.
pub fn walk(block: &mut Block, session: &mut ParseSession) {
    if let Block::FootnoteDefinition { label, .. } = block {
        session.footnotes.define(label);
    }
}

/// `<sup>` link for the `nth` reference to note `index`. Each reference
/// gets its own anchor so the note can link back to all of them.
pub fn render_reference(index: usize, nth: usize, mapping: &StyleMapping) -> String {
    format!(
        "<sup{style}><a href=\"#fn-{index}\" id=\"fnref-{index}-{nth}\">[{index}]</a></sup>",
        style = mapping.attr(&InlineTag::FootnoteRef),
    )
}

/// Superscript marker appended to a cited link's text.
pub fn render_citation_marker(index: usize, mapping: &StyleMapping) -> String {
    format!(
        "<sup{style}>[{index}]</sup>",
        style = mapping.attr(&InlineTag::FootnoteRef)
    )
}

fn render_entry(entry: &FootnoteEntry) -> String {
    let mut out = format!(
        "<code style=\"{INDEX_STYLE}\" id=\"fn-{}\">[{}]</code> ",
        entry.index, entry.index
    );
    match &entry.url {
        Some(url) => {
            if url == &entry.label || entry.label.is_empty() {
                out.push_str(&format!("<i style=\"{URL_STYLE}\">"));
                let _ = escape_html_body_text(&mut out, url);
                out.push_str("</i>");
            } else {
                let _ = escape_html_body_text(&mut out, &entry.label);
                out.push_str(&format!(": <i style=\"{URL_STYLE}\">"));
                let _ = escape_html_body_text(&mut out, url);
                out.push_str("</i>");
            }
        }
        None => {
            out.push_str(&entry.content);
            for nth in 1..=entry.references {
                out.push_str(&format!(" <a href=\"#fnref-{}-{nth}\">↩</a>", entry.index));
            }
        }
    }
    out.push_str("<br/>");
    out
}

/// The trailing footnote block, or `None` when the document has no notes.
///
/// All entries share one paragraph: the first entry opens it and the entry
/// whose index equals the total closes it. Entries are always emitted in
/// index order.
pub fn render_block(footnotes: &Footnotes, mapping: &StyleMapping) -> Option<String> {
    if footnotes.is_empty() {
        return None;
    }
    let total = footnotes.len();
    let mut lines = Vec::with_capacity(total);
    for entry in footnotes.entries() {
        let mut line = String::new();
        if entry.index == 1 {
            line.push_str(&format!("<p{}>", mapping.attr(&BlockTag::Footnotes)));
        }
        line.push_str(&render_entry(entry));
        if entry.index == total {
            line.push_str("</p>");
        }
        lines.push(line);
    }
    Some(format!(
        "<h4{}>{FOOTNOTES_TITLE}</h4>{}",
        mapping.attr(&BlockTag::FootnotesTitle),
        lines.join("\n")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_wraps_all_entries_in_one_paragraph() {
        let mut notes = Footnotes::default();
        notes.define("a");
        notes.set_content("a", "first".into());
        notes.reference("a");
        notes.cite("https://example.com/x", "Example");
        let html = render_block(&notes, &StyleMapping::default()).unwrap();
        insta::assert_snapshot!(html, @r##"
        <h4>引用链接</h4><p><code style="font-size: 90%; opacity: 0.6;" id="fn-1">[1]</code> first <a href="#fnref-1-1">↩</a><br/>
        <code style="font-size: 90%; opacity: 0.6;" id="fn-2">[2]</code> Example: <i style="word-break: break-all">https://example.com/x</i><br/></p>
        "##);
        assert_eq!(html.matches("<p").count(), 1);
        assert_eq!(html.matches("</p>").count(), 1);
    }

    #[test]
    fn empty_registry_renders_nothing() {
        assert!(render_block(&Footnotes::default(), &StyleMapping::default()).is_none());
    }

    #[test]
    fn reference_links_to_definition() {
        let html = render_reference(2, 1, &StyleMapping::default());
        assert_eq!(html, "<sup><a href=\"#fn-2\" id=\"fnref-2-1\">[2]</a></sup>");
    }

    #[test]
    fn note_links_back_to_every_reference() {
        let mut notes = Footnotes::default();
        notes.define("a");
        notes.set_content("a", "twice".into());
        notes.reference("a");
        notes.reference("a");
        let html = render_block(&notes, &StyleMapping::default()).unwrap();
        assert!(html.contains(
            "twice <a href=\"#fnref-1-1\">↩</a> <a href=\"#fnref-1-2\">↩</a><br/>"
        ));
    }

    #[test]
    fn unreferenced_note_has_no_back_link() {
        let mut notes = Footnotes::default();
        notes.define("a");
        notes.set_content("a", "alone".into());
        let html = render_block(&notes, &StyleMapping::default()).unwrap();
        assert!(html.contains("alone<br/>"));
        assert!(!html.contains("fnref"));
    }
}
