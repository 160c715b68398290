//! `[TOC]` placeholder, heading slugs and the nested contents list.

use std::collections::{HashMap, HashSet};

use markdown_weaver_escape::{escape_href, escape_html_body_text};

use super::Claim;
use crate::session::{HeadingEntry, ParseSession};
use crate::style::{BlockTag, StyleMapping};
use crate::token::{Block, Inline, plain_text};

pub fn tokenize(block: Block) -> Claim {
    match block {
        Block::Paragraph(inlines) if is_toc_marker(&inlines) => Claim::Claimed(Block::Toc),
        other => Claim::Pass(other),
    }
}

fn is_toc_marker(inlines: &[Inline]) -> bool {
    inlines.iter().all(|i| matches!(i, Inline::Text(_)))
        && plain_text(inlines).trim().eq_ignore_ascii_case("[toc]")
}

/// Assign every heading a unique id and record it for the contents list.
pub fn walk(block: &mut Block, session: &mut ParseSession) {
    let Block::Heading {
        level,
        id,
        children,
    } = block
    else {
        return;
    };
    let text = plain_text(children).trim().to_string();
    let slug = match id.as_deref() {
        Some(explicit) if !explicit.is_empty() => session.slugger.unique(explicit.to_string()),
        _ => session.slugger.slug(&text),
    };
    *id = Some(slug.clone());
    session.headings.push(HeadingEntry {
        text,
        depth: *level,
        slug,
    });
}

/// Lowercased, URL-safe form of heading text. Letters and digits from any
/// script are kept, whitespace becomes `-`, punctuation is dropped.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            slug.push('-');
        }
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}

/// Per-document slug allocator.
///
/// Repeats get `-1`, `-2`, … suffixes, skipping any suffixed form that a
/// different heading already produced naturally.
#[derive(Debug, Clone, Default)]
pub struct Slugger {
    counts: HashMap<String, usize>,
    used: HashSet<String>,
}

impl Slugger {
    pub fn slug(&mut self, text: &str) -> String {
        self.unique(slugify(text))
    }

    pub fn unique(&mut self, base: String) -> String {
        let mut n = self.counts.get(&base).copied().unwrap_or(0);
        let mut candidate = if n == 0 {
            base.clone()
        } else {
            format!("{base}-{n}")
        };
        while self.used.contains(&candidate) {
            n += 1;
            candidate = format!("{base}-{n}");
        }
        self.counts.insert(base, n + 1);
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Render the collected headings as nested lists.
///
/// Depths are taken relative to the shallowest heading. A jump of more than
/// one level opens every level in between (each with an empty item to hang
/// the deeper list from), and climbing back closes them again, so the output
/// is always balanced.
pub fn render_toc(headings: &[HeadingEntry], mapping: &StyleMapping) -> String {
    let mut out = format!("<section{}>", mapping.attr(&BlockTag::Toc));
    let Some(min) = headings.iter().map(|h| h.depth).min() else {
        out.push_str("</section>");
        return out;
    };
    let list_open = format!("<ul{}>", mapping.attr(&BlockTag::TocList));
    let item_open = format!("<li{}>", mapping.attr(&BlockTag::TocItem));

    let mut depth = 0usize;
    for heading in headings {
        let level = usize::from(heading.depth - min) + 1;
        if level > depth {
            for d in depth + 1..=level {
                if d > depth + 1 {
                    out.push_str(&item_open);
                }
                out.push_str(&list_open);
            }
            depth = level;
        } else {
            out.push_str("</li>");
            while depth > level {
                out.push_str("</ul></li>");
                depth -= 1;
            }
        }
        out.push_str(&item_open);
        out.push_str("<a href=\"#");
        let _ = escape_href(&mut out, &heading.slug);
        out.push_str("\">");
        let _ = escape_html_body_text(&mut out, &heading.text);
        out.push_str("</a>");
    }
    if depth > 0 {
        out.push_str("</li>");
        while depth > 1 {
            out.push_str("</ul></li>");
            depth -= 1;
        }
        out.push_str("</ul>");
    }
    out.push_str("</section>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(text: &str, depth: u8) -> HeadingEntry {
        HeadingEntry {
            text: text.into(),
            depth,
            slug: slugify(text),
        }
    }

    #[test]
    fn repeated_headings_get_distinct_slugs() {
        let mut slugger = Slugger::default();
        let slugs: Vec<_> = ["Intro", "Intro", "Intro"]
            .iter()
            .map(|t| slugger.slug(t))
            .collect();
        assert_eq!(slugs, ["intro", "intro-1", "intro-2"]);
    }

    #[test]
    fn suffixes_skip_natural_collisions() {
        let mut slugger = Slugger::default();
        assert_eq!(slugger.slug("Intro 1"), "intro-1");
        assert_eq!(slugger.slug("Intro"), "intro");
        assert_eq!(slugger.slug("Intro"), "intro-2");
    }

    #[test]
    fn slugify_keeps_cjk_and_drops_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("第一章 简介"), "第一章-简介");
        assert_eq!(slugify("???"), "section");
    }

    #[test]
    fn deep_jump_opens_and_closes_levels() {
        let toc = render_toc(
            &[heading("A", 1), heading("C", 3), heading("B", 2)],
            &StyleMapping::default(),
        );
        insta::assert_snapshot!(toc, @r##"<section><ul><li><a href="#a">A</a><ul><li><ul><li><a href="#c">C</a></li></ul></li><li><a href="#b">B</a></li></ul></li></ul></section>"##);
        assert_eq!(toc.matches("<ul").count(), toc.matches("</ul>").count());
        assert_eq!(toc.matches("<li").count(), toc.matches("</li>").count());
    }

    #[test]
    fn shallowest_heading_is_top_level() {
        let toc = render_toc(
            &[heading("x", 3), heading("y", 2), heading("z", 4)],
            &StyleMapping::default(),
        );
        assert_eq!(toc.matches("<ul").count(), toc.matches("</ul>").count());
        assert_eq!(toc.matches("<li").count(), toc.matches("</li>").count());
        assert!(toc.starts_with("<section><ul><li><ul"));
    }

    #[test]
    fn empty_toc() {
        assert_eq!(render_toc(&[], &StyleMapping::default()), "<section></section>");
    }
}
