//! Stateful facade over theme, options and engine.

use std::sync::Arc;

use crate::RenderError;
use crate::engine::{Engine, EngineConfig, RenderOutput};
use crate::extensions::ExtensionSet;
use crate::frontmatter::{self, FrontMatter};
use crate::inliner::inline_css;
use crate::math::{MathMarkup, MathMlRenderer, MathRenderer};
use crate::options::{RenderOptions, RenderOptionsPatch};
use crate::style::build_theme;
use crate::theme::{Theme, ThemeRegistry};

/// Holds the current [`RenderOptions`] and the [`Engine`] built from them.
///
/// Every option change rebuilds the style mapping and the engine from
/// scratch; renders themselves go through the immutable engine, so a
/// renderer can hand out `&Engine` to other threads between changes.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: RenderOptions,
    themes: ThemeRegistry,
    math: Option<Arc<dyn MathRenderer>>,
    extensions: ExtensionSet,
    engine: Engine,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

impl MarkdownRenderer {
    pub fn new(options: RenderOptions) -> Self {
        let themes = ThemeRegistry::new();
        let math: Option<Arc<dyn MathRenderer>> = Some(Arc::new(MathMlRenderer));
        let extensions = ExtensionSet::all();
        let engine = build_engine(&options, &themes, &math, &extensions);
        Self {
            options,
            themes,
            math,
            extensions,
            engine,
        }
    }

    /// Replace the math renderer; `None` defers math to pending tasks.
    pub fn with_math_renderer(mut self, math: Option<Arc<dyn MathRenderer>>) -> Self {
        self.math = math;
        self.rebuild();
        self
    }

    pub fn with_extensions(mut self, extensions: ExtensionSet) -> Self {
        self.extensions = extensions;
        self.rebuild();
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn themes(&self) -> &ThemeRegistry {
        &self.themes
    }

    /// Apply `patch`. Returns `true` (and rebuilds) only if an option
    /// actually changed.
    pub fn set_options(&mut self, patch: &RenderOptionsPatch) -> bool {
        let changed = self.options.apply(patch);
        if changed {
            self.rebuild();
        }
        changed
    }

    /// Back to default options; registered themes are kept.
    pub fn reset(&mut self) {
        self.options = RenderOptions::default();
        self.rebuild();
    }

    /// Make `theme` selectable by name. Rebuilds if it replaces the theme
    /// currently in use.
    pub fn register_theme(&mut self, theme: Theme) {
        let current = theme.name == self.options.theme;
        self.themes.register(theme);
        if current {
            self.rebuild();
        }
    }

    pub fn load_theme_toml(&mut self, source: &str) -> Result<(), RenderError> {
        let theme = Theme::from_toml_str(source)?;
        self.register_theme(theme);
        Ok(())
    }

    pub fn parse(&self, markdown: &str) -> RenderOutput {
        self.engine.render(markdown)
    }

    pub fn parse_front_matter(&self, markdown: &str) -> FrontMatter {
        frontmatter::parse_front_matter(markdown)
    }

    /// The current theme as a standalone stylesheet.
    pub fn get_styles(&self) -> String {
        self.engine.mapping().stylesheet()
    }

    /// Fully inlined HTML for pasting into an editor: no stylesheet, no
    /// custom properties.
    ///
    /// Rendered elements already carry their tag's declarations inline, so
    /// only the `:root` variables are folded in. Element rules from
    /// [`get_styles`](Self::get_styles) would also hit elements that share a
    /// tag name, such as code inside `<pre>` picking up inline code colors.
    pub fn export(&self, output: &RenderOutput) -> String {
        let mathml = self
            .math
            .as_ref()
            .is_some_and(|math| math.markup() == MathMarkup::MathMl);
        if mathml && output.html.contains("<math") {
            tracing::warn!("exporting MathML, which the WeChat editor drops; use an SVG math renderer");
        }
        inline_css(&output.html, &self.engine.mapping().root_rule())
    }

    fn rebuild(&mut self) {
        self.engine = build_engine(&self.options, &self.themes, &self.math, &self.extensions);
    }
}

fn build_engine(
    options: &RenderOptions,
    themes: &ThemeRegistry,
    math: &Option<Arc<dyn MathRenderer>>,
    extensions: &ExtensionSet,
) -> Engine {
    let theme = themes.resolve(&options.theme);
    let mapping = build_theme(&theme, &options.style_overrides());
    let config = EngineConfig::from_options(options)
        .with_math_renderer(math.clone())
        .with_extensions(extensions.clone());
    Engine::build(mapping, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::LegendMode;

    #[test]
    fn set_options_rebuilds_only_on_change() {
        let mut renderer = MarkdownRenderer::default();
        assert!(!renderer.set_options(&RenderOptionsPatch::default()));
        assert!(renderer.set_options(&RenderOptionsPatch::default().primary_color("#00ff00")));
        assert_eq!(renderer.engine().mapping().primary_color(), Some("#00ff00"));
        assert!(!renderer.set_options(&RenderOptionsPatch::default().primary_color("#00ff00")));
        assert!(renderer.set_options(&RenderOptionsPatch::default().clear_primary_color()));
        assert_eq!(renderer.engine().mapping().primary_color(), Some("#0F4C81"));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut renderer = MarkdownRenderer::default();
        renderer.set_options(
            &RenderOptionsPatch::default()
                .theme("grace")
                .legend(LegendMode::None),
        );
        assert_eq!(renderer.engine().mapping().name(), "grace");
        renderer.reset();
        assert_eq!(renderer.options(), &RenderOptions::default());
        assert_eq!(renderer.engine().mapping().name(), "default");
    }

    #[test]
    fn custom_theme_is_selectable() {
        let mut renderer = MarkdownRenderer::default();
        renderer
            .load_theme_toml("name = \"mine\"\n[block.p]\ncolor = \"red\"\n")
            .unwrap();
        renderer.set_options(&RenderOptionsPatch::default().theme("mine"));
        let html = renderer.parse("hello").html;
        assert!(html.contains("<p style=\"font-size: 16px; color: red\">hello</p>"));
    }

    #[test]
    fn bad_theme_toml_is_reported() {
        let mut renderer = MarkdownRenderer::default();
        assert!(matches!(
            renderer.load_theme_toml("name = "),
            Err(RenderError::Theme { .. })
        ));
    }

    #[test]
    fn styles_include_variables() {
        let styles = MarkdownRenderer::default().get_styles();
        assert!(styles.starts_with(":root { --md-primary-color: #0F4C81"));
        assert!(styles.contains("\nh1 { "));
    }

    #[test]
    fn styles_apply_to_bare_markup() {
        let renderer = MarkdownRenderer::default();
        let html = inline_css("<h1>Title</h1><p>x <code>y</code></p>", &renderer.get_styles());
        assert!(html.starts_with("<h1 style=\""), "{html}");
        assert!(html.contains("border-bottom: 2px solid #0F4C81"), "{html}");
        assert!(html.contains("color: #d14"));
    }

    #[test]
    fn export_keeps_code_blocks_apart_from_inline_code() {
        let renderer = MarkdownRenderer::default();
        let html = renderer.export(&renderer.parse("```\nlet x = 1;\n```\n\nsee `x`"));
        let pre = html.find("<pre").unwrap();
        let span = html.find("see ").unwrap();
        assert!(!html[pre..span].contains("#d14"), "{html}");
        assert!(html[span..].contains("#d14"));
    }
}
