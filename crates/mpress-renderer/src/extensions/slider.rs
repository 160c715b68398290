//! Swipeable image strips: a paragraph written as `<![a](u1),![b](u2)>`.

use markdown_weaver_escape::{escape_href, escape_html, escape_html_body_text};

use super::Claim;
use crate::style::{BlockTag, StyleMapping};
use crate::token::{Block, Inline, SliderImage, plain_text};

pub fn tokenize(block: Block) -> Claim {
    match block {
        Block::Paragraph(inlines) => match parse_slider(&inlines) {
            Some(images) => Claim::Claimed(Block::Slider(images)),
            None => Claim::Pass(Block::Paragraph(inlines)),
        },
        other => Claim::Pass(other),
    }
}

fn parse_slider(inlines: &[Inline]) -> Option<Vec<SliderImage>> {
    let parts: Vec<&Inline> = inlines
        .iter()
        .filter(|i| match i {
            Inline::SoftBreak => false,
            Inline::Text(t) => !t.trim().is_empty(),
            _ => true,
        })
        .collect();
    let (first, rest) = parts.split_first()?;
    let (last, middle) = rest.split_last()?;
    if !is_text(first, "<") || !is_text(last, ">") || middle.is_empty() {
        return None;
    }

    let mut images = Vec::new();
    for (i, part) in middle.iter().enumerate() {
        if i % 2 == 1 {
            if !is_text(part, ",") {
                return None;
            }
            continue;
        }
        let Inline::Image { url, title, alt } = part else {
            return None;
        };
        images.push(SliderImage {
            url: url.clone(),
            title: title.clone(),
            alt: plain_text(alt),
        });
    }
    // a trailing comma leaves an odd separator at the end
    if middle.len() % 2 == 0 {
        return None;
    }
    Some(images)
}

fn is_text(inline: &Inline, expected: &str) -> bool {
    matches!(inline, Inline::Text(t) if t.trim() == expected)
}

const STRIP_STYLE: &str =
    "overflow-x: scroll; -webkit-overflow-scrolling: touch; white-space: nowrap; width: 100%; text-align: center";
const CELL_STYLE: &str =
    "display: inline-block; width: 100%; margin-right: 0; vertical-align: top";
const IMAGE_STYLE: &str = "width: 100%; height: auto; border-radius: 4px; vertical-align: top";
const CAPTION_STYLE: &str =
    "margin-top: 5px; font-size: 14px; color: #666; text-align: center; white-space: normal";
const HINT_STYLE: &str = "font-size: 14px; color: #999; text-align: center; margin-top: 5px";

pub fn render_slider(images: &[SliderImage], mapping: &StyleMapping) -> String {
    let mut out = format!(
        "<section{}><section style=\"{STRIP_STYLE}\">",
        mapping.attr(&BlockTag::Slider)
    );
    for image in images {
        out.push_str(&format!("<section style=\"{CELL_STYLE}\"><img src=\""));
        let _ = escape_href(&mut out, &image.url);
        out.push_str("\" alt=\"");
        let _ = escape_html(&mut out, &image.alt);
        if !image.title.is_empty() {
            out.push_str("\" title=\"");
            let _ = escape_html(&mut out, &image.title);
        }
        out.push_str(&format!("\" style=\"{IMAGE_STYLE}\"/>"));
        let caption = if image.title.is_empty() {
            &image.alt
        } else {
            &image.title
        };
        if !caption.is_empty() {
            out.push_str(&format!("<p style=\"{CAPTION_STYLE}\">"));
            let _ = escape_html_body_text(&mut out, caption);
            out.push_str("</p>");
        }
        out.push_str("</section>");
    }
    out.push_str(&format!(
        "</section><p style=\"{HINT_STYLE}\">&lt;&lt;&lt; 左右滑动见更多 &gt;&gt;&gt;</p></section>"
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize as parse;

    fn claim(md: &str) -> Block {
        match tokenize(parse(md).remove(0)) {
            Claim::Claimed(b) | Claim::Pass(b) => b,
        }
    }

    #[test]
    fn recognizes_image_strip() {
        let Block::Slider(images) = claim("<![one](a.png),![two](b.png \"Second\")>") else {
            panic!("expected slider");
        };
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].alt, "one");
        assert_eq!(images[1].url, "b.png");
        assert_eq!(images[1].title, "Second");
    }

    #[test]
    fn ordinary_paragraphs_pass() {
        assert!(matches!(claim("![one](a.png)"), Block::Paragraph(_)));
        assert!(matches!(claim("<![one](a.png),>"), Block::Paragraph(_)));
        assert!(matches!(claim("a < b > c"), Block::Paragraph(_)));
    }

    #[test]
    fn renders_each_image_with_caption() {
        let html = render_slider(
            &[SliderImage {
                url: "a.png".into(),
                title: String::new(),
                alt: "one".into(),
            }],
            &StyleMapping::default(),
        );
        assert!(html.contains("<img src=\"a.png\" alt=\"one\""));
        assert!(html.contains(">one</p>"));
        assert!(html.contains("左右滑动见更多"));
    }
}
