//! Final assembly of the preview document.

use markdown_weaver_escape::escape_html;

use crate::extensions::footnote;
use crate::reading::ReadingStats;
use crate::session::Footnotes;
use crate::style::{BlockTag, StyleMapping, get_style_string};

/// `reading? + body + footnotes?` inside the styled container.
///
/// The container's inline style starts with the theme variables, so every
/// `var(--…)` reference in the body resolves in a live preview and the
/// inliner can substitute them for the export path.
pub fn assemble(
    body: &str,
    reading: Option<&ReadingStats>,
    footnotes: &Footnotes,
    mapping: &StyleMapping,
) -> String {
    let mut html = String::with_capacity(body.len() + 256);
    html.push_str("<section");
    let style = container_style(mapping);
    if !style.is_empty() {
        html.push_str(" style=\"");
        let _ = escape_html(&mut html, &style);
        html.push('"');
    }
    html.push('>');

    if let Some(stats) = reading.filter(|s| s.words > 0) {
        html.push_str(&reading_block(stats, mapping));
    }
    html.push_str(body);
    if let Some(notes) = footnote::render_block(footnotes, mapping) {
        html.push_str(&notes);
    }
    html.push_str("</section>");
    html
}

pub fn container_style(mapping: &StyleMapping) -> String {
    let decls = mapping.variables().merged(mapping.get(&BlockTag::Container));
    get_style_string(&decls)
}

pub fn reading_block(stats: &ReadingStats, mapping: &StyleMapping) -> String {
    format!(
        "<blockquote{}><p>字数 {}，阅读大约需 {} 分钟</p></blockquote>",
        mapping.attr(&BlockTag::Reading),
        stats.words,
        stats.minutes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{StyleOverrides, build_theme};
    use crate::theme::BuiltinTheme;

    #[test]
    fn container_carries_variables() {
        let mapping = build_theme(
            &BuiltinTheme::Default.theme(),
            &StyleOverrides {
                primary_color: Some("#abcdef".into()),
                ..Default::default()
            },
        );
        let html = assemble("<p>x</p>", None, &Footnotes::default(), &mapping);
        assert!(html.starts_with("<section style=\"--md-primary-color: #abcdef"));
        assert!(html.ends_with("<p>x</p></section>"));
    }

    #[test]
    fn reading_block_only_with_words() {
        let mapping = StyleMapping::default();
        let empty = assemble("", Some(&ReadingStats::from_words(0)), &Footnotes::default(), &mapping);
        assert_eq!(empty, "<section></section>");
        let html = assemble("", Some(&ReadingStats::from_words(450)), &Footnotes::default(), &mapping);
        assert!(html.contains("字数 450，阅读大约需 3 分钟"));
    }

    #[test]
    fn footnotes_follow_body() {
        let mut notes = Footnotes::default();
        notes.define("1");
        notes.set_content("1", "note text".into());
        let html = assemble("<p>body</p>", None, &notes, &StyleMapping::default());
        let body = html.find("<p>body</p>").unwrap();
        let note = html.find("note text").unwrap();
        assert!(body < note);
        assert!(html.ends_with("</p></section>"));
    }
}
