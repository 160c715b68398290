//! Style model: ordered CSS declaration sets and the merged, render-ready
//! mapping from semantic element tags to declarations.

use indexmap::IndexMap;
use markdown_weaver_escape::escape_html;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;

use crate::theme::Theme;

/// Custom property every theme may reference for its accent color.
pub const PRIMARY_COLOR_VAR: &str = "--md-primary-color";

/// Ordered mapping of CSS property name to value.
///
/// Insertion order is kept when a key is overwritten, so merging a set of
/// overrides into defaults keeps the defaults' ordering while the later
/// value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleDeclarations(IndexMap<SmolStr, String>);

impl StyleDeclarations {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    pub fn insert(&mut self, property: impl Into<SmolStr>, value: impl Into<String>) {
        self.0.insert(property.into(), value.into());
    }

    pub fn contains(&self, property: &str) -> bool {
        self.0.contains_key(property)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `other` into `self`; keys from `other` win.
    pub fn merge(&mut self, other: &StyleDeclarations) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// `self` as defaults, `overrides` on top.
    pub fn merged(&self, overrides: &StyleDeclarations) -> StyleDeclarations {
        let mut out = self.clone();
        out.merge(overrides);
        out
    }

    /// Custom properties (`--name`) only.
    pub fn custom_properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| k.starts_with("--"))
    }
}

impl<K: Into<SmolStr>, V: Into<String>> FromIterator<(K, V)> for StyleDeclarations {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for StyleDeclarations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&get_style_string(self))
    }
}

/// Render a declaration set as `prop: value; prop: value` in insertion order.
pub fn get_style_string(decls: &StyleDeclarations) -> String {
    let mut out = String::new();
    for (i, (k, v)) in decls.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        out.push_str(k);
        out.push_str(": ");
        out.push_str(v);
    }
    out
}

/// Parse an inline `style` attribute back into declarations.
///
/// Semicolons inside parentheses or quotes do not split declarations, so
/// `url(data:image/png;base64,...)` and quoted font names survive.
pub fn parse_declarations(style: &str) -> StyleDeclarations {
    let mut decls = StyleDeclarations::new();
    for chunk in split_top_level(style, ';') {
        let Some((prop, value)) = chunk.split_once(':') else {
            continue;
        };
        let prop = prop.trim();
        let value = value.trim();
        if prop.is_empty() || value.is_empty() {
            continue;
        }
        // custom properties are case sensitive, everything else is not
        if prop.starts_with("--") {
            decls.insert(prop, value);
        } else {
            decls.insert(prop.to_ascii_lowercase(), value);
        }
    }
    decls
}

/// Split on `sep` outside of parentheses and quoted strings.
pub(crate) fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

macro_rules! style_tags {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $s:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $s,)*
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownTag;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($name::$variant),)*
                    _ => Err(UnknownTag(s.into())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl StyleTag for $name {
            fn name(&self) -> &str {
                self.as_str()
            }
        }
    };
}

/// Anything the mapping can be looked up by.
pub trait StyleTag {
    fn name(&self) -> &str;
}

impl StyleTag for str {
    fn name(&self) -> &str {
        self
    }
}

impl StyleTag for &str {
    fn name(&self) -> &str {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown style tag `{0}`")]
pub struct UnknownTag(pub SmolStr);

style_tags! {
    /// Block-level element tags.
    pub enum BlockTag {
        Container => "container",
        H1 => "h1",
        H2 => "h2",
        H3 => "h3",
        H4 => "h4",
        H5 => "h5",
        H6 => "h6",
        Paragraph => "p",
        Blockquote => "blockquote",
        BlockquoteParagraph => "blockquote_p",
        AlertNote => "alert_note",
        AlertTip => "alert_tip",
        AlertImportant => "alert_important",
        AlertWarning => "alert_warning",
        AlertCaution => "alert_caution",
        AlertTitle => "alert_title",
        CodePre => "code_pre",
        Code => "code",
        CodeHeader => "code_header",
        UnorderedList => "ul",
        OrderedList => "ol",
        ListItem => "li",
        Figure => "figure",
        Image => "image",
        Rule => "hr",
        Table => "table",
        TableHead => "thead",
        TableHeader => "th",
        TableCell => "td",
        Footnotes => "footnotes",
        FootnotesTitle => "footnotes_title",
        Toc => "toc",
        TocList => "toc_list",
        TocItem => "toc_item",
        MathBlock => "math_block",
        Diagram => "diagram",
        Slider => "slider",
        Reading => "reading",
    }
}

style_tags! {
    /// Inline element tags.
    pub enum InlineTag {
        ListMarker => "listitem_marker",
        Codespan => "codespan",
        Link => "link",
        WxLink => "wx_link",
        Strong => "strong",
        Emphasis => "em",
        Strikethrough => "del",
        Superscript => "sup",
        Subscript => "sub",
        FootnoteRef => "footnote_ref",
        Figcaption => "figcaption",
        MathInline => "math_inline",
        TaskMarker => "task_marker",
    }
}

impl BlockTag {
    /// CSS selector for the markup the writer emits for this tag, or `None`
    /// when the element is shared with other tags and only the inline style
    /// tells them apart.
    pub const fn selector(self) -> Option<&'static str> {
        match self {
            BlockTag::H1 => Some("h1"),
            BlockTag::H2 => Some("h2"),
            BlockTag::H3 => Some("h3"),
            BlockTag::H4 => Some("h4"),
            BlockTag::H5 => Some("h5"),
            BlockTag::H6 => Some("h6"),
            BlockTag::Paragraph => Some("p"),
            BlockTag::Blockquote => Some("blockquote"),
            BlockTag::BlockquoteParagraph => Some("blockquote p"),
            BlockTag::CodePre => Some("pre"),
            BlockTag::Code => Some("pre > code"),
            BlockTag::CodeHeader => Some("pre > span"),
            BlockTag::UnorderedList => Some("ul"),
            BlockTag::OrderedList => Some("ol"),
            BlockTag::ListItem => Some("li"),
            BlockTag::Figure => Some("figure"),
            BlockTag::Image => Some("img"),
            BlockTag::Rule => Some("hr"),
            BlockTag::Table => Some("table"),
            BlockTag::TableHead => Some("thead"),
            BlockTag::TableHeader => Some("th"),
            BlockTag::TableCell => Some("td"),
            BlockTag::Container
            | BlockTag::AlertNote
            | BlockTag::AlertTip
            | BlockTag::AlertImportant
            | BlockTag::AlertWarning
            | BlockTag::AlertCaution
            | BlockTag::AlertTitle
            | BlockTag::Footnotes
            | BlockTag::FootnotesTitle
            | BlockTag::Toc
            | BlockTag::TocList
            | BlockTag::TocItem
            | BlockTag::MathBlock
            | BlockTag::Diagram
            | BlockTag::Slider
            | BlockTag::Reading => None,
        }
    }

    pub fn heading(level: u8) -> Self {
        match level {
            1 => BlockTag::H1,
            2 => BlockTag::H2,
            3 => BlockTag::H3,
            4 => BlockTag::H4,
            5 => BlockTag::H5,
            _ => BlockTag::H6,
        }
    }
}

impl InlineTag {
    /// See [`BlockTag::selector`].
    pub const fn selector(self) -> Option<&'static str> {
        match self {
            InlineTag::Codespan => Some("code"),
            InlineTag::Link => Some("a"),
            InlineTag::Strong => Some("strong"),
            InlineTag::Emphasis => Some("em"),
            InlineTag::Strikethrough => Some("del"),
            InlineTag::Superscript => Some("sup"),
            InlineTag::Subscript => Some("sub"),
            InlineTag::Figcaption => Some("figcaption"),
            InlineTag::ListMarker
            | InlineTag::WxLink
            | InlineTag::FootnoteRef
            | InlineTag::MathInline
            | InlineTag::TaskMarker => None,
        }
    }
}

fn tag_selector(tag: &str) -> Option<&'static str> {
    match BlockTag::from_str(tag) {
        Ok(block) => block.selector(),
        Err(_) => InlineTag::from_str(tag).ok().and_then(InlineTag::selector),
    }
}

/// The subset of render options that feed the style build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleOverrides {
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub primary_color: Option<String>,
    pub use_indent: bool,
    pub use_justify: bool,
}

/// Fully merged, render-ready form of a theme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMapping {
    name: SmolStr,
    variables: StyleDeclarations,
    entries: IndexMap<SmolStr, StyleDeclarations>,
    empty: StyleDeclarations,
}

impl StyleMapping {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declarations for `tag`; unknown tags yield an empty set.
    pub fn get<T: StyleTag + ?Sized>(&self, tag: &T) -> &StyleDeclarations {
        match self.entries.get(tag.name()) {
            Some(decls) => decls,
            None => {
                tracing::trace!(tag = tag.name(), "no style entry, rendering unstyled");
                &self.empty
            }
        }
    }

    /// Style string for `tag`, possibly empty.
    pub fn style<T: StyleTag + ?Sized>(&self, tag: &T) -> String {
        get_style_string(self.get(tag))
    }

    /// ` style="…"` attribute for `tag`, or nothing when it has no
    /// declarations.
    pub fn attr<T: StyleTag + ?Sized>(&self, tag: &T) -> String {
        let decls = self.get(tag);
        if decls.is_empty() {
            return String::new();
        }
        let mut out = String::from(" style=\"");
        let _ = escape_html(&mut out, &get_style_string(decls));
        out.push('"');
        out
    }

    pub fn variables(&self) -> &StyleDeclarations {
        &self.variables
    }

    pub fn primary_color(&self) -> Option<&str> {
        self.variables.get(PRIMARY_COLOR_VAR)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(SmolStr::as_str)
    }

    /// The `:root` block with the theme variables, empty without variables.
    pub fn root_rule(&self) -> String {
        if self.variables.is_empty() {
            return String::new();
        }
        format!(":root {{ {} }}\n", get_style_string(&self.variables))
    }

    /// Combined stylesheet for environments that want a separate `<style>`
    /// rather than inline attributes: the `:root` block plus one element
    /// rule per tag that has its own selector.
    pub fn stylesheet(&self) -> String {
        let mut css = self.root_rule();
        for (tag, decls) in &self.entries {
            if decls.is_empty() {
                continue;
            }
            let Some(selector) = tag_selector(tag) else {
                tracing::trace!(%tag, "tag has no selector, left out of stylesheet");
                continue;
            };
            css.push_str(selector);
            css.push_str(" { ");
            css.push_str(&get_style_string(decls));
            css.push_str(" }\n");
        }
        css
    }
}

/// Build the render-ready mapping for `theme` under `overrides`.
///
/// Merge order: theme base < per-tag declarations < option overrides. The
/// theme is copied; the returned mapping shares nothing with it.
pub fn build_theme(theme: &Theme, overrides: &StyleOverrides) -> StyleMapping {
    let mut base = theme.base.clone();
    if let Some(family) = &overrides.font_family {
        base.insert("font-family", family.clone());
    }
    if let Some(size) = &overrides.font_size {
        base.insert("font-size", size.clone());
    }

    let mut entries: IndexMap<SmolStr, StyleDeclarations> = IndexMap::new();
    for (tag, decls) in theme.block.iter().chain(theme.inline.iter()) {
        if BlockTag::from_str(tag).is_err() && InlineTag::from_str(tag).is_err() {
            tracing::debug!(theme = %theme.name, %tag, "theme styles a tag no renderer uses");
        }
        let merged = base.merged(decls);
        match entries.get_mut(tag) {
            Some(existing) => existing.merge(decls),
            None => {
                entries.insert(tag.clone(), merged);
            }
        }
    }

    let container = entries
        .entry(SmolStr::new(BlockTag::Container.as_str()))
        .or_insert_with(|| base.clone());
    // an explicit font override must also reach the wrapper
    if let Some(family) = &overrides.font_family {
        container.insert("font-family", family.clone());
    }
    if let Some(size) = &overrides.font_size {
        container.insert("font-size", size.clone());
    }

    if overrides.use_indent || overrides.use_justify {
        let p = entries
            .entry(SmolStr::new(BlockTag::Paragraph.as_str()))
            .or_insert_with(|| base.clone());
        if overrides.use_indent {
            p.insert("text-indent", "2em");
        }
        if overrides.use_justify {
            p.insert("text-align", "justify");
        }
    }

    let mut variables = theme.variables.clone();
    if let Some(color) = &overrides.primary_color {
        variables.insert(PRIMARY_COLOR_VAR, color.clone());
    }

    StyleMapping {
        name: theme.name.clone(),
        variables,
        entries,
        empty: StyleDeclarations::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::BuiltinTheme;

    fn decls(pairs: &[(&str, &str)]) -> StyleDeclarations {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn style_string_keeps_insertion_order() {
        let d = decls(&[("color", "red"), ("margin", "0"), ("font-size", "1em")]);
        insta::assert_snapshot!(get_style_string(&d), @"color: red; margin: 0; font-size: 1em");
    }

    #[test]
    fn merge_overrides_value_but_keeps_position() {
        let base = decls(&[("font-size", "16px"), ("color", "#333")]);
        let over = decls(&[("margin", "0"), ("font-size", "1.2em")]);
        let merged = base.merged(&over);
        assert_eq!(
            get_style_string(&merged),
            "font-size: 1.2em; color: #333; margin: 0"
        );
        // source untouched
        assert_eq!(base.get("font-size"), Some("16px"));
    }

    #[test]
    fn parse_declarations_respects_parens_and_quotes() {
        let d = parse_declarations(
            "background: url(data:image/png;base64,AAAA); font-family: 'A;B', serif;; COLOR: red",
        );
        assert_eq!(d.get("background"), Some("url(data:image/png;base64,AAAA)"));
        assert_eq!(d.get("font-family"), Some("'A;B', serif"));
        assert_eq!(d.get("color"), Some("red"));
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn unknown_tag_lookup_is_empty() {
        let theme = BuiltinTheme::Default.theme();
        let mapping = build_theme(&theme, &StyleOverrides::default());
        assert!(mapping.get("definitely-not-a-tag").is_empty());
        assert_eq!(mapping.style(""), "");
    }

    #[test]
    fn build_is_deterministic_for_every_tag() {
        let theme = BuiltinTheme::Default.theme();
        let overrides = StyleOverrides {
            font_size: Some("15px".into()),
            primary_color: Some("#ff0000".into()),
            use_indent: true,
            use_justify: true,
            ..Default::default()
        };
        let a = build_theme(&theme, &overrides);
        let b = build_theme(&theme, &overrides);
        for tag in BlockTag::ALL
            .iter()
            .map(|t| t.as_str())
            .chain(InlineTag::ALL.iter().map(|t| t.as_str()))
        {
            assert_eq!(a.style(tag), b.style(tag));
        }
    }

    #[test]
    fn options_override_theme() {
        let theme = BuiltinTheme::Default.theme();
        let overrides = StyleOverrides {
            font_family: Some("serif".into()),
            font_size: Some("18px".into()),
            primary_color: Some("#123456".into()),
            use_indent: true,
            use_justify: true,
        };
        let mapping = build_theme(&theme, &overrides);
        let p = mapping.get(&BlockTag::Paragraph);
        assert_eq!(p.get("text-indent"), Some("2em"));
        assert_eq!(p.get("text-align"), Some("justify"));
        assert_eq!(p.get("font-size"), Some("18px"));
        assert_eq!(p.get("font-family"), Some("serif"));
        // indent only touches paragraphs
        assert!(mapping.get(&BlockTag::H1).get("text-indent").is_none());
        assert_eq!(mapping.primary_color(), Some("#123456"));
        // primary color stays a variable reference in the declarations
        assert!(mapping.style(&InlineTag::Strong).contains("var(--md-primary-color)"));
    }

    #[test]
    fn mapping_shares_nothing_with_theme() {
        let mut theme = BuiltinTheme::Default.theme();
        let mapping = build_theme(&theme, &StyleOverrides::default());
        let before = mapping.style(&BlockTag::H1);
        if let Some(h1) = theme.block.get_mut("h1") {
            h1.insert("color", "hotpink");
        }
        theme.base.insert("font-size", "99px");
        assert_eq!(mapping.style(&BlockTag::H1), before);
        assert!(!before.contains("hotpink"));
    }

    #[test]
    fn stylesheet_uses_element_selectors() {
        let theme = BuiltinTheme::Default.theme();
        let mapping = build_theme(&theme, &StyleOverrides::default());
        let css = mapping.stylesheet();
        assert!(css.starts_with(":root { --md-primary-color: #0F4C81 }\n"));
        assert!(css.contains(&format!("\nh1 {{ {} }}\n", mapping.style(&BlockTag::H1))));
        assert!(css.contains("\nblockquote p { "));
        assert!(!css.contains("data-tag"));
        // shared elements stay inline-only
        assert!(!css.contains(BlockTag::AlertNote.as_str()));
    }

    #[test]
    fn tag_names_round_trip() {
        for tag in BlockTag::ALL {
            assert_eq!(BlockTag::from_str(tag.as_str()), Ok(*tag));
        }
        assert!(InlineTag::from_str("nope").is_err());
    }
}
