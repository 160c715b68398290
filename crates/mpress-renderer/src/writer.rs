//! Styled HTML writer over the token tree.
//!
//! Every element gets its declarations from the [`StyleMapping`] as an
//! inline `style` attribute. Block elements are never emitted inside `<p>`:
//! images and display math split a paragraph into runs instead.

use std::fmt::{self, Write as _};

use markdown_weaver::Alignment;
use markdown_weaver_escape::{escape_href, escape_html, escape_html_body_text};

use crate::engine::EngineConfig;
use crate::extensions::{diagram, footnote, math, slider, toc};
use crate::session::ParseSession;
use crate::style::{BlockTag, InlineTag, StyleDeclarations, StyleMapping, StyleTag, get_style_string};
use crate::token::{Block, Inline, ListItem, plain_text};

const WECHAT_ARTICLE_PREFIXES: &[&str] = &["https://mp.weixin.qq.com", "http://mp.weixin.qq.com"];

struct ListLevel {
    ordered: bool,
    next: u64,
}

pub(crate) struct StyledWriter<'a> {
    out: String,
    mapping: &'a StyleMapping,
    config: &'a EngineConfig,
    session: &'a mut ParseSession,
    lists: Vec<ListLevel>,
    quote_depth: usize,
}

impl<'a> StyledWriter<'a> {
    pub(crate) fn new(
        mapping: &'a StyleMapping,
        config: &'a EngineConfig,
        session: &'a mut ParseSession,
    ) -> Self {
        Self {
            out: String::new(),
            mapping,
            config,
            session,
            lists: Vec::new(),
            quote_depth: 0,
        }
    }

    pub(crate) fn run(mut self, blocks: &[Block]) -> Result<String, fmt::Error> {
        self.write_blocks(blocks)?;
        Ok(self.out)
    }

    #[inline]
    fn write(&mut self, s: &str) -> fmt::Result {
        self.out.push_str(s);
        Ok(())
    }

    fn attr<T: StyleTag + ?Sized>(&self, tag: &T) -> String {
        self.mapping.attr(tag)
    }

    fn open<T: StyleTag + ?Sized>(&mut self, element: &str, tag: &T) -> fmt::Result {
        let attr = self.attr(tag);
        write!(self.out, "<{element}{attr}>")
    }

    /// Render into a scratch buffer, leaving the main output untouched.
    fn capture(&mut self, f: impl FnOnce(&mut Self) -> fmt::Result) -> Result<String, fmt::Error> {
        let saved = std::mem::take(&mut self.out);
        let result = f(self);
        let captured = std::mem::replace(&mut self.out, saved);
        result.map(|_| captured)
    }

    fn write_blocks(&mut self, blocks: &[Block]) -> fmt::Result {
        for block in blocks {
            self.write_block(block)?;
        }
        Ok(())
    }

    fn write_block(&mut self, block: &Block) -> fmt::Result {
        match block {
            Block::Heading {
                level,
                id,
                children,
            } => {
                let level = (*level).clamp(1, 6);
                self.write(&format!("<h{level}"))?;
                if let Some(id) = id {
                    self.write(" id=\"")?;
                    let _ = escape_html(&mut self.out, id);
                    self.write("\"")?;
                }
                let attr = self.attr(&BlockTag::heading(level));
                self.write(&attr)?;
                self.write(">")?;
                self.write_inlines(children)?;
                self.write(&format!("</h{level}>"))
            }
            Block::Paragraph(children) => {
                let tag = if self.quote_depth > 0 {
                    BlockTag::BlockquoteParagraph
                } else {
                    BlockTag::Paragraph
                };
                self.write_flow(children, Some(tag))
            }
            Block::Plain(children) => self.write_flow(children, None),
            Block::BlockQuote(children) => {
                self.open("blockquote", &BlockTag::Blockquote)?;
                self.quote_depth += 1;
                self.write_blocks(children)?;
                self.quote_depth -= 1;
                self.write("</blockquote>")
            }
            Block::Code { lang, source } => self.write_code(lang.as_deref(), source),
            Block::List { start, items } => self.write_list(*start, items),
            Block::Table {
                alignments,
                head,
                rows,
            } => self.write_table(alignments, head, rows),
            Block::Rule => {
                let attr = self.attr(&BlockTag::Rule);
                write!(self.out, "<hr{attr}/>")
            }
            Block::Html(html) => self.write(html),
            Block::FootnoteDefinition { label, children } => {
                let content = self.capture(|w| w.write_note_blocks(children))?;
                self.session.footnotes.set_content(label, content);
                Ok(())
            }
            Block::Toc => {
                let html = toc::render_toc(&self.session.headings, self.mapping);
                self.write(&html)
            }
            Block::Alert {
                kind,
                title,
                fold,
                children,
            } => {
                let (element, heading) = match fold {
                    Some(_) => ("details", "summary"),
                    None => ("section", "p"),
                };
                let attr = self.attr(&kind.tag());
                let open = if *fold == Some(true) { " open" } else { "" };
                write!(self.out, "<{element}{attr}{open}>")?;
                self.open(heading, &BlockTag::AlertTitle)?;
                match title {
                    Some(title) => self.write_inlines(title)?,
                    None => self.write(kind.label())?,
                }
                write!(self.out, "</{heading}>")?;
                self.quote_depth += 1;
                self.write_blocks(children)?;
                self.quote_depth -= 1;
                write!(self.out, "</{element}>")
            }
            Block::MathBlock(source) => {
                let html = math::render(
                    source,
                    true,
                    self.config.math.as_deref(),
                    self.mapping,
                    self.session,
                );
                self.write(&html)
            }
            Block::Diagram { lang, source } => {
                let html = diagram::render(lang, source, self.mapping, self.session);
                self.write(&html)
            }
            Block::Slider(images) => {
                let html = slider::render_slider(images, self.mapping);
                self.write(&html)
            }
        }
    }

    /// Footnote bodies end up inside the shared footnote paragraph, so
    /// their blocks are flattened to inline markup joined by `<br/>`.
    fn write_note_blocks(&mut self, blocks: &[Block]) -> fmt::Result {
        let mut first = true;
        for block in blocks {
            let before = self.out.len();
            if !first {
                self.write("<br/>")?;
            }
            let mark = self.out.len();
            self.write_note_block(block)?;
            if self.out.len() == mark {
                self.out.truncate(before);
            } else {
                first = false;
            }
        }
        Ok(())
    }

    fn write_note_block(&mut self, block: &Block) -> fmt::Result {
        match block {
            Block::Paragraph(inlines) | Block::Plain(inlines) => self.write_inlines(inlines),
            Block::Heading { children, .. } => self.write_inlines(children),
            Block::BlockQuote(children)
            | Block::Alert { children, .. }
            | Block::FootnoteDefinition { children, .. } => self.write_note_blocks(children),
            Block::List { start, items } => {
                let mut next = start.unwrap_or(1);
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.write("<br/>")?;
                    }
                    if start.is_some() {
                        write!(self.out, "{next}. ")?;
                        next += 1;
                    } else {
                        self.write("• ")?;
                    }
                    self.write_note_blocks(&item.children)?;
                }
                Ok(())
            }
            Block::Code { source, .. } | Block::Diagram { source, .. } => {
                self.open("code", &InlineTag::Codespan)?;
                let _ = escape_html_body_text(&mut self.out, source.trim_end());
                self.write("</code>")
            }
            Block::MathBlock(source) => {
                let html = math::render(
                    source,
                    false,
                    self.config.math.as_deref(),
                    self.mapping,
                    self.session,
                );
                self.write(&html)
            }
            Block::Table { head, rows, .. } => {
                let lines = std::iter::once(head.as_slice()).chain(rows.iter().map(Vec::as_slice));
                for (i, cells) in lines.filter(|cells| !cells.is_empty()).enumerate() {
                    if i > 0 {
                        self.write("<br/>")?;
                    }
                    for (j, cell) in cells.iter().enumerate() {
                        if j > 0 {
                            self.write(" | ")?;
                        }
                        self.write_inlines(cell)?;
                    }
                }
                Ok(())
            }
            Block::Rule | Block::Html(_) | Block::Toc | Block::Slider(_) => {
                tracing::debug!("dropping block markup inside a footnote");
                Ok(())
            }
        }
    }

    /// Inline content with images and display math lifted out as blocks.
    /// Text runs are wrapped in `wrap` when given.
    fn write_flow(&mut self, inlines: &[Inline], wrap: Option<BlockTag>) -> fmt::Result {
        let mut run_start = 0;
        for (i, inline) in inlines.iter().enumerate() {
            let lifted = matches!(
                inline,
                Inline::Image { .. } | Inline::Math { display: true, .. }
            );
            if !lifted {
                continue;
            }
            self.write_run(&inlines[run_start..i], wrap)?;
            match inline {
                Inline::Image { url, title, alt } => self.write_figure(url, title, alt)?,
                Inline::Math { source, .. } => {
                    let html = math::render(
                        source,
                        true,
                        self.config.math.as_deref(),
                        self.mapping,
                        self.session,
                    );
                    self.write(&html)?;
                }
                _ => {}
            }
            run_start = i + 1;
        }
        self.write_run(&inlines[run_start..], wrap)
    }

    fn write_run(&mut self, inlines: &[Inline], wrap: Option<BlockTag>) -> fmt::Result {
        let blank = inlines.iter().all(|i| match i {
            Inline::Text(t) => t.trim().is_empty(),
            Inline::SoftBreak | Inline::HardBreak => true,
            _ => false,
        });
        if blank {
            return Ok(());
        }
        match wrap {
            Some(tag) => {
                self.open("p", &tag)?;
                self.write_inlines(inlines)?;
                self.write("</p>")
            }
            None => self.write_inlines(inlines),
        }
    }

    fn write_figure(&mut self, url: &str, title: &str, alt: &[Inline]) -> fmt::Result {
        let alt_text = plain_text(alt);
        self.open("figure", &BlockTag::Figure)?;
        self.write_img(url, title, &alt_text)?;
        if let Some(caption) = self.config.legend.caption(&alt_text, title) {
            self.open("figcaption", &InlineTag::Figcaption)?;
            let _ = escape_html_body_text(&mut self.out, caption);
            self.write("</figcaption>")?;
        }
        self.write("</figure>")
    }

    fn write_img(&mut self, url: &str, title: &str, alt: &str) -> fmt::Result {
        self.write("<img src=\"")?;
        let _ = escape_href(&mut self.out, url);
        self.write("\" alt=\"")?;
        let _ = escape_html(&mut self.out, alt);
        self.write("\"")?;
        if !title.is_empty() {
            self.write(" title=\"")?;
            let _ = escape_html(&mut self.out, title);
            self.write("\"")?;
        }
        let attr = self.attr(&BlockTag::Image);
        write!(self.out, "{attr}/>")
    }

    fn write_code(&mut self, lang: Option<&str>, source: &str) -> fmt::Result {
        self.open("pre", &BlockTag::CodePre)?;
        if self.config.mac_code_block {
            self.write_mac_header()?;
        }
        self.open("code", &BlockTag::Code)?;
        match crate::highlight::highlight(lang, source, &self.config.code_theme) {
            Some(html) => self.write(&html)?,
            None => {
                let plain = crate::highlight::plain(source);
                self.write(&plain)?
            }
        }
        self.write("</code></pre>")
    }

    fn write_mac_header(&mut self) -> fmt::Result {
        self.open("span", &BlockTag::CodeHeader)?;
        for color in ["#ff5f56", "#ffbd2e", "#27c93f"] {
            write!(
                self.out,
                "<span style=\"display: inline-block; width: 12px; height: 12px; border-radius: 50%; margin-right: 6px; background: {color}\"></span>"
            )?;
        }
        self.write("</span>")
    }

    fn write_list(&mut self, start: Option<u64>, items: &[ListItem]) -> fmt::Result {
        let ordered = start.is_some();
        let (element, tag) = if ordered {
            ("ol", BlockTag::OrderedList)
        } else {
            ("ul", BlockTag::UnorderedList)
        };
        self.open(element, &tag)?;
        self.lists.push(ListLevel {
            ordered,
            next: start.unwrap_or(1),
        });
        for item in items {
            self.write_list_item(item)?;
        }
        self.lists.pop();
        write!(self.out, "</{element}>")
    }

    fn write_list_item(&mut self, item: &ListItem) -> fmt::Result {
        self.open("li", &BlockTag::ListItem)?;
        let is_task = matches!(
            item.children.first(),
            Some(Block::Plain(inlines) | Block::Paragraph(inlines))
                if matches!(inlines.first(), Some(Inline::TaskMarker(_)))
        );
        let marker = match self.lists.last_mut() {
            Some(level) if level.ordered => {
                let marker = format!("{}. ", level.next);
                level.next += 1;
                marker
            }
            _ => "• ".to_string(),
        };
        if !is_task {
            let attr = self.attr(&InlineTag::ListMarker);
            if attr.is_empty() {
                self.write(&marker)?;
            } else {
                write!(self.out, "<span{attr}>{marker}</span>")?;
            }
        }
        for (i, child) in item.children.iter().enumerate() {
            match child {
                // the first paragraph of a loose item stays on the marker line
                Block::Paragraph(inlines) if i == 0 => self.write_flow(inlines, None)?,
                other => self.write_block(other)?,
            }
        }
        self.write("</li>")
    }

    fn write_table(
        &mut self,
        alignments: &[Alignment],
        head: &[Vec<Inline>],
        rows: &[Vec<Vec<Inline>>],
    ) -> fmt::Result {
        self.write("<section style=\"max-width: 100%; overflow-x: auto\">")?;
        self.open("table", &BlockTag::Table)?;
        if !head.is_empty() {
            self.open("thead", &BlockTag::TableHead)?;
            self.write("<tr>")?;
            for (i, cell) in head.iter().enumerate() {
                self.write_cell("th", BlockTag::TableHeader, alignments.get(i), cell)?;
            }
            self.write("</tr></thead>")?;
        }
        self.write("<tbody>")?;
        for row in rows {
            self.write("<tr>")?;
            for (i, cell) in row.iter().enumerate() {
                self.write_cell("td", BlockTag::TableCell, alignments.get(i), cell)?;
            }
            self.write("</tr>")?;
        }
        self.write("</tbody></table></section>")
    }

    fn write_cell(
        &mut self,
        element: &str,
        tag: BlockTag,
        alignment: Option<&Alignment>,
        cell: &[Inline],
    ) -> fmt::Result {
        let mut decls: StyleDeclarations = self.mapping.get(&tag).clone();
        match alignment {
            Some(Alignment::Left) => decls.insert("text-align", "left"),
            Some(Alignment::Center) => decls.insert("text-align", "center"),
            Some(Alignment::Right) => decls.insert("text-align", "right"),
            _ => {}
        }
        write!(self.out, "<{element}")?;
        if !decls.is_empty() {
            self.write(" style=\"")?;
            let _ = escape_html(&mut self.out, &get_style_string(&decls));
            self.write("\"")?;
        }
        self.write(">")?;
        self.write_inlines(cell)?;
        write!(self.out, "</{element}>")
    }

    fn write_inlines(&mut self, inlines: &[Inline]) -> fmt::Result {
        for inline in inlines {
            self.write_inline(inline)?;
        }
        Ok(())
    }

    fn write_wrapped(&mut self, element: &str, tag: InlineTag, children: &[Inline]) -> fmt::Result {
        self.open(element, &tag)?;
        self.write_inlines(children)?;
        write!(self.out, "</{element}>")
    }

    fn write_inline(&mut self, inline: &Inline) -> fmt::Result {
        match inline {
            Inline::Text(text) => {
                let _ = escape_html_body_text(&mut self.out, text);
                Ok(())
            }
            Inline::Code(code) => {
                self.open("code", &InlineTag::Codespan)?;
                let _ = escape_html_body_text(&mut self.out, code);
                self.write("</code>")
            }
            Inline::SoftBreak => self.write("\n"),
            Inline::HardBreak => self.write("<br/>"),
            Inline::Html(html) => self.write(html),
            Inline::Emphasis(c) => self.write_wrapped("em", InlineTag::Emphasis, c),
            Inline::Strong(c) => self.write_wrapped("strong", InlineTag::Strong, c),
            Inline::Strikethrough(c) => self.write_wrapped("del", InlineTag::Strikethrough, c),
            Inline::Superscript(c) => self.write_wrapped("sup", InlineTag::Superscript, c),
            Inline::Subscript(c) => self.write_wrapped("sub", InlineTag::Subscript, c),
            Inline::Link {
                url,
                title,
                children,
            } => self.write_link(url, title, children),
            // nested images stay inline; top-level ones were lifted into figures
            Inline::Image { url, title, alt } => self.write_img(url, title, &plain_text(alt)),
            Inline::FootnoteReference(label) => match self.session.footnotes.reference(label) {
                Some((index, nth)) => {
                    let html = footnote::render_reference(index, nth, self.mapping);
                    self.write(&html)
                }
                None => {
                    tracing::debug!(%label, "reference to undefined footnote");
                    self.write("[^")?;
                    let _ = escape_html_body_text(&mut self.out, label);
                    self.write("]")
                }
            },
            Inline::Math { source, display } => {
                let html = math::render(
                    source,
                    *display,
                    self.config.math.as_deref(),
                    self.mapping,
                    self.session,
                );
                self.write(&html)
            }
            Inline::TaskMarker(checked) => {
                let mark = if *checked { "☑ " } else { "☐ " };
                let attr = self.attr(&InlineTag::TaskMarker);
                write!(self.out, "<span{attr}>{mark}</span>")
            }
        }
    }

    fn write_link(&mut self, url: &str, title: &str, children: &[Inline]) -> fmt::Result {
        let text = plain_text(children);
        if WECHAT_ARTICLE_PREFIXES.iter().any(|p| url.starts_with(p)) {
            return self.write_anchor(url, title, InlineTag::WxLink, children);
        }
        if text == url {
            return self.write_inlines(children);
        }
        let external = url.starts_with("http://") || url.starts_with("https://");
        if self.session.cite_links && external {
            let label = if title.is_empty() { &text } else { title };
            let index = self.session.footnotes.cite(url, label);
            self.write_wrapped("span", InlineTag::Link, children)?;
            let marker = footnote::render_citation_marker(index, self.mapping);
            return self.write(&marker);
        }
        self.write_anchor(url, title, InlineTag::Link, children)
    }

    fn write_anchor(
        &mut self,
        url: &str,
        title: &str,
        tag: InlineTag,
        children: &[Inline],
    ) -> fmt::Result {
        self.write("<a href=\"")?;
        let _ = escape_href(&mut self.out, url);
        self.write("\"")?;
        if !title.is_empty() {
            self.write(" title=\"")?;
            let _ = escape_html(&mut self.out, title);
            self.write("\"")?;
        }
        let attr = self.attr(&tag);
        write!(self.out, "{attr}>")?;
        self.write_inlines(children)?;
        self.write("</a>")
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{Engine, EngineConfig, RenderOutput};
    use crate::options::LegendMode;
    use crate::style::StyleMapping;
    use pretty_assertions::assert_eq;

    fn render_with(config: EngineConfig, markdown: &str) -> RenderOutput {
        Engine::build(StyleMapping::default(), config).render(markdown)
    }

    fn render(markdown: &str) -> String {
        render_with(EngineConfig::default(), markdown).html
    }

    #[test]
    fn ordered_counters_are_per_level() {
        let html = render("1. a\n   1. b\n   2. c\n2. d");
        insta::assert_snapshot!(html, @"<section><ol><li>1. a<ol><li>1. b</li><li>2. c</li></ol></li><li>2. d</li></ol></section>");
    }

    #[test]
    fn ordered_list_honors_start() {
        let html = render("3. x\n4. y\n- z");
        assert_eq!(
            html,
            "<section><ol><li>3. x</li><li>4. y</li></ol><ul><li>• z</li></ul></section>"
        );
    }

    #[test]
    fn task_items_replace_the_bullet() {
        let html = render("- [x] done\n- [ ] todo");
        assert_eq!(
            html,
            "<section><ul><li><span>☑ </span>done</li><li><span>☐ </span>todo</li></ul></section>"
        );
    }

    #[test]
    fn folded_alerts_use_details() {
        assert_eq!(
            render("> [!TIP]- Hidden\n> body"),
            "<section><details><summary>Hidden</summary><p>body</p></details></section>"
        );
        assert_eq!(
            render("> [!TIP]+\n> body"),
            "<section><details open><summary>Tip</summary><p>body</p></details></section>"
        );
        assert_eq!(
            render("> [!WARNING]\n> body"),
            "<section><section><p>Warning</p><p>body</p></section></section>"
        );
    }

    #[test]
    fn legend_mode_picks_the_caption() {
        let markdown = "![alt text](a.png \"Title text\")";
        let figure = |legend| {
            let config = EngineConfig {
                legend,
                ..EngineConfig::default()
            };
            render_with(config, markdown).html
        };
        let img = r#"<img src="a.png" alt="alt text" title="Title text"/>"#;
        assert_eq!(
            figure(LegendMode::Alt),
            format!("<section><figure>{img}<figcaption>alt text</figcaption></figure></section>")
        );
        assert_eq!(
            figure(LegendMode::TitleAlt),
            format!("<section><figure>{img}<figcaption>Title text</figcaption></figure></section>")
        );
        assert_eq!(
            figure(LegendMode::None),
            format!("<section><figure>{img}</figure></section>")
        );
    }

    #[test]
    fn images_are_lifted_out_of_paragraphs() {
        let html = render("before ![a](a.png) after");
        assert_eq!(
            html,
            "<section><p>before </p><figure><img src=\"a.png\" alt=\"a\"/><figcaption>a</figcaption></figure><p> after</p></section>"
        );
    }

    #[test]
    fn table_cells_carry_alignment() {
        let html = render("| a | b | c |\n|:--|--:|---|\n| 1 | 2 | 3 |");
        insta::assert_snapshot!(html, @r#"<section><section style="max-width: 100%; overflow-x: auto"><table><thead><tr><th style="text-align: left">a</th><th style="text-align: right">b</th><th>c</th></tr></thead><tbody><tr><td style="text-align: left">1</td><td style="text-align: right">2</td><td>3</td></tr></tbody></table></section></section>"#);
    }

    #[test]
    fn wechat_links_stay_anchors_when_citing() {
        let config = EngineConfig {
            cite_links: true,
            ..EngineConfig::default()
        };
        let out = render_with(config, "[post](https://mp.weixin.qq.com/s/abc)");
        assert_eq!(
            out.html,
            "<section><p><a href=\"https://mp.weixin.qq.com/s/abc\">post</a></p></section>"
        );
        assert!(out.footnotes.is_empty());
    }

    #[test]
    fn link_text_equal_to_url_is_plain() {
        assert_eq!(
            render("see [https://example.com](https://example.com)"),
            "<section><p>see https://example.com</p></section>"
        );
        assert_eq!(
            render("[docs](https://example.com)"),
            "<section><p><a href=\"https://example.com\">docs</a></p></section>"
        );
    }

    #[test]
    fn mac_header_precedes_code() {
        let plain = EngineConfig {
            mac_code_block: false,
            ..EngineConfig::default()
        };
        assert_eq!(
            render_with(plain, "```\nx\n```").html,
            "<section><pre><code>x</code></pre></section>"
        );

        let html = render("```\nx\n```");
        let header = html.find("<pre><span>").unwrap();
        let code = html.find("<code>x</code>").unwrap();
        assert!(header < code);
        for color in ["#ff5f56", "#ffbd2e", "#27c93f"] {
            assert!(html.contains(color), "{html}");
        }
    }

    #[test]
    fn repeated_references_get_distinct_anchors() {
        let html = render("[^a]: note\n\nOne [^a], two [^a].");
        assert!(html.contains("id=\"fnref-1-1\""));
        assert!(html.contains("id=\"fnref-1-2\""));
        assert!(html.contains("note <a href=\"#fnref-1-1\">↩</a> <a href=\"#fnref-1-2\">↩</a>"));
    }

    #[test]
    fn block_content_in_notes_is_flattened() {
        let html = render("[^a]: intro\n\n    - one\n    - two\n\n    ```\n    code\n    ```\n\nref [^a]");
        let start = html.find("id=\"fn-1\"").unwrap();
        let note = &html[start..];
        assert!(note.contains("intro<br/>• one<br/>• two<br/><code>code</code>"), "{note}");
        assert!(!note.contains("<ul"));
        assert!(!note.contains("<pre"));
    }
}
