//! Export-path CSS inlining.
//!
//! Rewrites a rendered fragment so that it depends on nothing but `style`
//! attributes: stylesheet rules are folded into each element, custom
//! properties are substituted, image size attributes become styles and
//! nested lists are hoisted out of their list items.

use kuchikiki::traits::*;
use kuchikiki::{NodeRef, Selector, Selectors, Specificity};

use crate::css_vars::VariableScope;
use crate::style::{StyleDeclarations, get_style_string, parse_declarations, split_top_level};

/// Inline `stylesheet` into `html`.
///
/// Rules apply in order of specificity, then source order, beneath any
/// declarations already inline on the element. `:root` rules only seed the
/// custom properties. Running this on its own output with an empty
/// stylesheet returns the input unchanged.
pub fn inline_css(html: &str, stylesheet: &str) -> String {
    let sheet = Stylesheet::parse(stylesheet);
    let document = kuchikiki::parse_html().one(html);
    let Ok(body) = document.select_first("body") else {
        tracing::warn!("fragment did not parse into a body, leaving it as is");
        return html.to_string();
    };
    let body = body.as_node().clone();

    let root = VariableScope::from_declarations(&sheet.root);
    for child in body.children() {
        inline_node(&child, &sheet, &root);
    }
    hoist_nested_lists(&body);

    let mut out = String::with_capacity(html.len());
    for child in body.children() {
        out.push_str(&child.to_string());
    }
    out
}

struct Rule {
    selector: Selector,
    specificity: Specificity,
    order: usize,
    declarations: StyleDeclarations,
}

#[derive(Default)]
struct Stylesheet {
    root: StyleDeclarations,
    rules: Vec<Rule>,
}

impl Stylesheet {
    /// Plain style rules only; at-rules and anything unparseable are
    /// skipped.
    fn parse(css: &str) -> Self {
        let mut sheet = Stylesheet::default();
        let css = strip_comments(css);
        let mut rest = css.as_str();
        let mut order = 0;
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            if rest.starts_with('@') {
                rest = skip_at_rule(rest);
                continue;
            }
            let Some(open) = rest.find('{') else {
                break;
            };
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                break;
            };
            let prelude = rest[..open].trim();
            let declarations = parse_declarations(&rest[open + 1..close]);
            rest = &rest[close + 1..];

            for selector in split_top_level(prelude, ',') {
                let selector = selector.trim();
                if selector.is_empty() {
                    continue;
                }
                if selector == ":root" || selector == "html" {
                    sheet.root.merge(&declarations);
                    continue;
                }
                match Selectors::compile(selector) {
                    Ok(compiled) => {
                        for selector in compiled.0 {
                            sheet.rules.push(Rule {
                                specificity: selector.specificity(),
                                selector,
                                order,
                                declarations: declarations.clone(),
                            });
                            order += 1;
                        }
                    }
                    Err(()) => tracing::debug!(selector, "unsupported selector, skipping rule"),
                }
            }
        }
        sheet
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Skip `@import …;` or a whole `@media … { … }` block.
fn skip_at_rule(css: &str) -> &str {
    let semi = css.find(';');
    let brace = css.find('{');
    match (semi, brace) {
        (Some(s), Some(b)) if s < b => &css[s + 1..],
        (Some(s), None) => &css[s + 1..],
        (_, Some(b)) => {
            let mut depth = 0usize;
            for (i, c) in css[b..].char_indices() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return &css[b + i + 1..];
                        }
                    }
                    _ => {}
                }
            }
            ""
        }
        (None, None) => "",
    }
}

fn inline_node(node: &NodeRef, sheet: &Stylesheet, inherited: &VariableScope) {
    let Some(element) = node.clone().into_element_ref() else {
        return;
    };

    let mut matched: Vec<&Rule> = sheet
        .rules
        .iter()
        .filter(|rule| rule.selector.matches(&element))
        .collect();
    matched.sort_by_key(|rule| (rule.specificity, rule.order));
    let mut decls = StyleDeclarations::new();
    for rule in matched {
        decls.merge(&rule.declarations);
    }

    let existing = element
        .attributes
        .borrow()
        .get("style")
        .map(parse_declarations);
    if let Some(inline) = &existing {
        decls.merge(inline);
    }

    let scope = inherited.child(&decls);
    let mut resolved = scope.resolve_declarations(&decls);

    {
        let mut attributes = element.attributes.borrow_mut();
        if element.name.local.as_ref() == "img" {
            for dimension in ["width", "height"] {
                if let Some(attr) = attributes.remove(dimension) {
                    if !resolved.contains(dimension) {
                        resolved.insert(dimension, css_length(&attr.value));
                    }
                }
            }
        }
        if resolved.is_empty() {
            if existing.is_some() {
                attributes.remove("style");
            }
        } else {
            attributes.insert("style", get_style_string(&resolved));
        }
    }

    for child in node.children() {
        inline_node(&child, sheet, &scope);
    }
}

/// Bare numbers in `width`/`height` attributes are pixels.
fn css_length(value: &str) -> String {
    let value = value.trim();
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit() || c == '.') {
        format!("{value}px")
    } else {
        value.to_string()
    }
}

fn is_element(node: &NodeRef, names: &[&str]) -> bool {
    node.as_element()
        .is_some_and(|e| names.contains(&e.name.local.as_ref()))
}

/// Move `<ul>`/`<ol>` children of every `<li>` to directly after it, in
/// order. Some editors lose list content nested inside items.
fn hoist_nested_lists(root: &NodeRef) {
    let items: Vec<NodeRef> = root
        .descendants()
        .filter(|n| is_element(n, &["li"]))
        .collect();
    for item in items {
        let nested: Vec<NodeRef> = item
            .children()
            .filter(|c| is_element(c, &["ul", "ol"]))
            .collect();
        let mut anchor = item.clone();
        for list in nested {
            list.detach();
            anchor.insert_after(list.clone());
            anchor = list;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rules_apply_under_inline_styles() {
        let html = inline_css(
            r#"<p class="x" style="color: red">hi</p>"#,
            "p { color: blue; margin: 0 } .x { padding: 1px }",
        );
        assert!(html.contains(r#"style="color: red; margin: 0; padding: 1px""#));
    }

    #[test]
    fn specificity_beats_source_order() {
        let html = inline_css(
            r#"<p id="a" class="b">hi</p>"#,
            "#a { color: red } .b { color: green } p { color: blue }",
        );
        assert!(html.contains(r#"style="color: red""#));
    }

    #[test]
    fn variables_resolve_and_disappear() {
        let html = inline_css(
            r#"<section style="--c: #123456; color: #333"><strong style="color: var(--c)">x</strong><em style="color: var(--root)">y</em></section>"#,
            ":root { --root: #abcdef }",
        );
        assert_eq!(
            html,
            r#"<section style="color: #333"><strong style="color: #123456">x</strong><em style="color: #abcdef">y</em></section>"#
        );
    }

    #[test]
    fn image_dimensions_become_styles() {
        let html = inline_css(r#"<img src="a.png" width="120" height="50%">"#, "");
        assert!(html.contains(r#"style="width: 120px; height: 50%""#));
        assert!(!html.contains("width=\""));
    }

    #[test]
    fn nested_lists_are_hoisted() {
        let html = inline_css(
            "<ul><li>a<ul><li>b<ol><li>c</li></ol></li></ul></li><li>d</li></ul>",
            "",
        );
        assert_eq!(
            html,
            "<ul><li>a</li><ul><li>b</li><ol><li>c</li></ol></ul><li>d</li></ul>"
        );
    }

    #[test]
    fn at_rules_and_comments_are_skipped() {
        let html = inline_css(
            "<p>x</p>",
            "/* c */ @import url(x.css); @media (max-width: 1px) { p { color: red } } p { margin: 0 }",
        );
        assert_eq!(html, r#"<p style="margin: 0">x</p>"#);
    }

    #[test]
    fn inlining_is_idempotent() {
        let once = inline_css(
            r#"<section style="--c: red"><p style="color:var(--c);margin:0"><img src="a" width="3"></p><ul><li>a<ul><li>b</li></ul></li></ul></section>"#,
            "p { padding: 1px }",
        );
        assert_eq!(inline_css(&once, ""), once);
    }
}
