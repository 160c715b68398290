//! LaTeX math rendering.
//!
//! Pasted articles only keep math that is self-contained markup, and the
//! WeChat editor keeps SVG but strips MathML. The bundled
//! [`MathMlRenderer`] (pulldown-latex) is fine for previews; exports meant
//! for that editor need an SVG [`MathRenderer`].

use std::fmt;

use markdown_weaver_escape::escape_html;
use pulldown_latex::{
    Parser, Storage, config::DisplayMode, config::RenderConfig, mathml::push_mathml,
};

use crate::RenderError;

/// What a [`MathRenderer`] emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathMarkup {
    /// SVG with glyphs and styles inlined; survives export and paste.
    Svg,
    /// MathML; renders in browsers, stripped by the WeChat editor.
    MathMl,
}

/// Typesets LaTeX for the engine.
///
/// Output must be self-contained markup: no external stylesheet, font or
/// script. Implementations must be cheap to call repeatedly; one instance
/// is shared by every render of an engine.
pub trait MathRenderer: fmt::Debug + Send + Sync {
    /// Markup for `latex` (without `$` delimiters).
    fn render(&self, latex: &str, display: bool) -> Result<String, RenderError>;

    fn markup(&self) -> MathMarkup {
        MathMarkup::Svg
    }
}

/// Default [`MathRenderer`], producing MathML.
#[derive(Debug, Clone, Copy, Default)]
pub struct MathMlRenderer;

impl MathRenderer for MathMlRenderer {
    fn render(&self, latex: &str, display: bool) -> Result<String, RenderError> {
        render_math(latex, display)
    }

    fn markup(&self) -> MathMarkup {
        MathMarkup::MathMl
    }
}

/// Typeset `latex` as MathML. Parse errors are collected and reported
/// together instead of stopping at the first.
pub fn render_math(latex: &str, display: bool) -> Result<String, RenderError> {
    let storage = Storage::new();
    let events: Vec<_> = Parser::new(latex, &storage).collect();
    let errors: Vec<String> = events
        .iter()
        .filter_map(|e| e.as_ref().err().map(ToString::to_string))
        .collect();
    if !errors.is_empty() {
        return Err(RenderError::Math {
            message: errors.join("; "),
        });
    }

    let config = RenderConfig {
        display_mode: if display {
            DisplayMode::Block
        } else {
            DisplayMode::Inline
        },
        ..Default::default()
    };
    let mut mathml = String::new();
    push_mathml(&mut mathml, events.into_iter(), config).map_err(|e| RenderError::Math {
        message: e.to_string(),
    })?;
    Ok(mathml)
}

/// Fallback markup showing the LaTeX source, with the error as a tooltip.
pub fn error_html(latex: &str, error: &str, display_mode: bool) -> String {
    let style = if display_mode {
        "display: block; text-align: center; color: #e5534b"
    } else {
        "color: #e5534b"
    };
    let mut escaped_latex = String::new();
    let mut escaped_error = String::new();
    let _ = escape_html(&mut escaped_latex, latex);
    let _ = escape_html(&mut escaped_error, error);
    format!(
        r#"<span style="{style}" title="{escaped_error}"><code>{escaped_latex}</code></span>"#
    )
}
