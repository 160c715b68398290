//! Code highlighting with inline colors.
//!
//! Class-based highlighting needs a stylesheet, which the target editors
//! strip, so every token span carries its own `style`.

#[cfg(feature = "syntax-highlighting")]
use std::sync::LazyLock;

use markdown_weaver_escape::escape_html_body_text;
#[cfg(feature = "syntax-highlighting")]
use syntect::{
    easy::HighlightLines,
    highlighting::{FontStyle, Style, ThemeSet},
    parsing::SyntaxSet,
    util::LinesWithEndings,
};

#[cfg(feature = "syntax-highlighting")]
static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
#[cfg(feature = "syntax-highlighting")]
static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Names of the bundled highlight themes.
#[cfg(feature = "syntax-highlighting")]
pub fn theme_names() -> impl Iterator<Item = &'static str> {
    THEMES.themes.keys().map(String::as_str)
}

/// Highlight `source` as `lang` with the named syntect theme. Without a
/// known `lang` the syntax is inferred from the first line (shebangs,
/// `<?xml`, editor mode lines).
///
/// Returns `None` when no syntax fits, the theme is unknown, or highlighting
/// fails; callers fall back to plain escaped code.
#[cfg(feature = "syntax-highlighting")]
pub fn highlight(lang: Option<&str>, source: &str, theme: &str) -> Option<String> {
    let syntax = lang
        .and_then(|lang| SYNTAXES.find_syntax_by_token(lang))
        .or_else(|| SYNTAXES.find_syntax_by_first_line(source))?;
    let lang = syntax.name.as_str();
    let Some(theme) = THEMES.themes.get(theme) else {
        tracing::warn!(theme, "unknown code theme, rendering code unhighlighted");
        return None;
    };
    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut out = String::with_capacity(source.len() * 4);
    for line in LinesWithEndings::from(source) {
        let ranges = match highlighter.highlight_line(line, &SYNTAXES) {
            Ok(ranges) => ranges,
            Err(e) => {
                tracing::debug!(lang, error = %e, "highlighting failed");
                return None;
            }
        };
        for (style, text) in ranges {
            let text = text.trim_end_matches(['\r', '\n']);
            if text.is_empty() {
                continue;
            }
            out.push_str("<span style=\"");
            push_token_style(&mut out, style);
            out.push_str("\">");
            push_code_text(&mut out, text);
            out.push_str("</span>");
        }
        if line.ends_with('\n') {
            out.push_str("<br/>");
        }
    }
    Some(trim_trailing_break(out))
}

#[cfg(not(feature = "syntax-highlighting"))]
pub fn theme_names() -> impl Iterator<Item = &'static str> {
    std::iter::empty()
}

#[cfg(not(feature = "syntax-highlighting"))]
pub fn highlight(_lang: Option<&str>, _source: &str, _theme: &str) -> Option<String> {
    None
}

#[cfg(feature = "syntax-highlighting")]
fn push_token_style(out: &mut String, style: Style) {
    let c = style.foreground;
    out.push_str(&format!("color: #{:02x}{:02x}{:02x}", c.r, c.g, c.b));
    if style.font_style.contains(FontStyle::BOLD) {
        out.push_str("; font-weight: bold");
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        out.push_str("; font-style: italic");
    }
}

/// Escape code text so whitespace survives editors that collapse it.
pub fn push_code_text(out: &mut String, text: &str) {
    let mut escaped = String::with_capacity(text.len());
    let _ = escape_html_body_text(&mut escaped, text);
    for c in escaped.chars() {
        match c {
            ' ' => out.push_str("&nbsp;"),
            '\t' => out.push_str("&nbsp;&nbsp;&nbsp;&nbsp;"),
            c => out.push(c),
        }
    }
}

/// Plain code with preserved whitespace and `<br/>` line breaks.
pub fn plain(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for (i, line) in source.trim_end_matches(['\r', '\n']).split('\n').enumerate() {
        if i > 0 {
            out.push_str("<br/>");
        }
        push_code_text(&mut out, line.trim_end_matches('\r'));
    }
    out
}

#[cfg(feature = "syntax-highlighting")]
fn trim_trailing_break(mut html: String) -> String {
    if html.ends_with("<br/>") {
        html.truncate(html.len() - "<br/>".len());
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "syntax-highlighting")]
    #[test]
    fn highlights_known_language() {
        let html = highlight(Some("rust"), "fn main() {}\n", "InspiredGitHub").unwrap();
        assert!(html.contains("<span style=\"color: #"));
        assert!(html.contains("main"));
        assert!(!html.ends_with("<br/>"));
    }

    #[cfg(feature = "syntax-highlighting")]
    #[test]
    fn unknown_language_or_theme_is_none() {
        assert!(highlight(Some("no-such-language"), "x", "InspiredGitHub").is_none());
        assert!(highlight(Some("rust"), "x", "no-such-theme").is_none());
        assert!(highlight(None, "just text\n", "InspiredGitHub").is_none());
    }

    #[cfg(feature = "syntax-highlighting")]
    #[test]
    fn language_inferred_from_first_line() {
        let html = highlight(None, "#!/bin/bash\necho hi\n", "InspiredGitHub").unwrap();
        assert!(html.contains("<span style=\"color: #"));
        assert!(html.contains("echo"));
    }

    #[test]
    fn whitespace_is_preserved() {
        let mut out = String::new();
        push_code_text(&mut out, "  a<b");
        assert_eq!(out, "&nbsp;&nbsp;a&lt;b");
        assert_eq!(plain("a\n\tb\n"), "a<br/>&nbsp;&nbsp;&nbsp;&nbsp;b");
    }
}
