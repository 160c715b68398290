//! mpress renderer
//!
//! Turns markdown (with optional YAML front matter) into self-contained,
//! inline-styled HTML that survives editors which strip `<style>` tags,
//! such as the WeChat article editor.
//!
//! The pipeline is: front matter split, [`engine::Engine`] (tokenize,
//! extensions, styled writer), [`postprocess`] (reading block, footnotes,
//! container), and for the copy path [`inliner::inline_css`].
//! [`MarkdownRenderer`] wraps all of it behind a small stateful facade.

use miette::Diagnostic;
use thiserror::Error;

pub mod css_vars;
pub mod engine;
pub mod extensions;
pub mod frontmatter;
pub mod highlight;
pub mod inliner;
pub mod math;
pub mod options;
pub mod postprocess;
pub mod reading;
pub mod renderer;
pub mod resolve;
pub mod session;
pub mod style;
pub mod theme;
pub mod token;
mod writer;

pub use engine::{Engine, EngineConfig, RenderOutput};
pub use frontmatter::{FrontMatter, parse_front_matter};
pub use inliner::inline_css;
pub use math::{MathMarkup, MathMlRenderer, MathRenderer};
pub use options::{LegendMode, RenderOptions, RenderOptionsPatch};
pub use renderer::MarkdownRenderer;
pub use session::{PendingTask, TaskKind};
pub use style::{BlockTag, InlineTag, StyleDeclarations, StyleMapping, build_theme, get_style_string};
pub use theme::{BuiltinTheme, Theme, ThemeRegistry};
pub use token::default_md_options;

#[derive(Error, Debug, Diagnostic)]
pub enum RenderError {
    #[error("invalid theme: {message}")]
    #[diagnostic(
        code(mpress::theme::parse),
        help("themes are TOML files with `name`, `[variables]`, `[base]`, `[block.<tag>]` and `[inline.<tag>]` tables")
    )]
    Theme { message: String },

    #[error("no theme named `{theme}`")]
    #[diagnostic(code(mpress::theme::not_found))]
    ThemeNotFound { theme: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(mpress::config))]
    Config { message: String },

    #[error(transparent)]
    #[diagnostic(code(mpress::io))]
    Io(#[from] std::io::Error),

    #[error("math rendering failed: {message}")]
    #[diagnostic(code(mpress::math))]
    Math { message: String },

    #[error("diagram rendering failed: {message}")]
    #[diagnostic(code(mpress::diagram))]
    Diagram { message: String },

    #[cfg(feature = "diagram-fetch")]
    #[error("diagram request failed")]
    #[diagnostic(code(mpress::diagram::http))]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_carry_diagnostic_codes() {
        let err = RenderError::ThemeNotFound {
            theme: "nope".into(),
        };
        assert_eq!(err.to_string(), "no theme named `nope`");
        assert_eq!(
            err.code().map(|c| c.to_string()).as_deref(),
            Some("mpress::theme::not_found")
        );

        let err = RenderError::Theme {
            message: "bad".into(),
        };
        assert!(err.help().is_some());
    }

    #[test]
    fn io_errors_convert() {
        let err: RenderError = std::io::Error::other("gone").into();
        assert!(matches!(err, RenderError::Io(_)));
    }
}
