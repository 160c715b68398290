//! Per-render option snapshot and partial updates.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::path::Path;

use crate::RenderError;
use crate::style::StyleOverrides;

/// How image captions are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegendMode {
    /// Caption from the alt text.
    #[default]
    Alt,
    /// Caption from the title attribute.
    Title,
    /// Alt text, falling back to the title.
    AltTitle,
    /// Title, falling back to the alt text.
    TitleAlt,
    None,
}

impl LegendMode {
    /// Pick the caption for an image, if any.
    pub fn caption<'a>(self, alt: &'a str, title: &'a str) -> Option<&'a str> {
        let pick = |first: &'a str, second: &'a str| {
            if !first.is_empty() {
                Some(first)
            } else if !second.is_empty() {
                Some(second)
            } else {
                None
            }
        };
        match self {
            LegendMode::Alt => pick(alt, ""),
            LegendMode::Title => pick(title, ""),
            LegendMode::AltTitle => pick(alt, title),
            LegendMode::TitleAlt => pick(title, alt),
            LegendMode::None => None,
        }
    }
}

/// Immutable snapshot of everything that affects one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RenderOptions {
    pub theme: SmolStr,
    pub font_family: Option<String>,
    pub font_size: String,
    pub primary_color: Option<String>,
    pub use_indent: bool,
    pub use_justify: bool,
    pub legend: LegendMode,
    /// Turn external links into numbered citations collected as footnotes.
    pub cite_status: bool,
    /// Prepend a word count / reading time block.
    pub count_status: bool,
    pub mac_code_block: bool,
    pub code_theme: SmolStr,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            theme: SmolStr::new("default"),
            font_family: None,
            font_size: "16px".to_string(),
            primary_color: None,
            use_indent: false,
            use_justify: false,
            legend: LegendMode::Alt,
            cite_status: false,
            count_status: false,
            mac_code_block: true,
            code_theme: SmolStr::new("InspiredGitHub"),
        }
    }
}

impl RenderOptions {
    pub fn style_overrides(&self) -> StyleOverrides {
        StyleOverrides {
            font_family: self.font_family.clone(),
            font_size: Some(self.font_size.clone()),
            primary_color: self.primary_color.clone(),
            use_indent: self.use_indent,
            use_justify: self.use_justify,
        }
    }

    /// Apply a partial update, returning whether anything changed.
    pub fn apply(&mut self, patch: &RenderOptionsPatch) -> bool {
        let before = self.clone();
        if let Some(theme) = &patch.theme {
            self.theme = theme.clone();
        }
        if let Some(family) = &patch.font_family {
            self.font_family = family.clone();
        }
        if let Some(size) = &patch.font_size {
            self.font_size = size.clone();
        }
        if let Some(color) = &patch.primary_color {
            self.primary_color = color.clone();
        }
        if let Some(v) = patch.use_indent {
            self.use_indent = v;
        }
        if let Some(v) = patch.use_justify {
            self.use_justify = v;
        }
        if let Some(v) = patch.legend {
            self.legend = v;
        }
        if let Some(v) = patch.cite_status {
            self.cite_status = v;
        }
        if let Some(v) = patch.count_status {
            self.count_status = v;
        }
        if let Some(v) = patch.mac_code_block {
            self.mac_code_block = v;
        }
        if let Some(code_theme) = &patch.code_theme {
            self.code_theme = code_theme.clone();
        }
        *self != before
    }

    /// Load options from a TOML file. Missing fields take their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source).map_err(|e| match e {
            RenderError::Config { message } => RenderError::Config {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })
    }

    pub fn from_toml_str(source: &str) -> Result<Self, RenderError> {
        toml::from_str(source).map_err(|e| RenderError::Config {
            message: e.to_string(),
        })
    }
}

/// Partial options for `set_options`; `None` leaves a field alone.
///
/// The optional fields nest: `Some(None)` clears a font family or primary
/// color back to the theme's own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RenderOptionsPatch {
    pub theme: Option<SmolStr>,
    pub font_family: Option<Option<String>>,
    pub font_size: Option<String>,
    pub primary_color: Option<Option<String>>,
    pub use_indent: Option<bool>,
    pub use_justify: Option<bool>,
    pub legend: Option<LegendMode>,
    pub cite_status: Option<bool>,
    pub count_status: Option<bool>,
    pub mac_code_block: Option<bool>,
    pub code_theme: Option<SmolStr>,
}

impl RenderOptionsPatch {
    pub fn primary_color(mut self, color: impl Into<String>) -> Self {
        self.primary_color = Some(Some(color.into()));
        self
    }

    pub fn clear_primary_color(mut self) -> Self {
        self.primary_color = Some(None);
        self
    }

    pub fn font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(Some(family.into()));
        self
    }

    pub fn clear_font_family(mut self) -> Self {
        self.font_family = Some(None);
        self
    }

    pub fn theme(mut self, theme: impl Into<SmolStr>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub fn font_size(mut self, size: impl Into<String>) -> Self {
        self.font_size = Some(size.into());
        self
    }

    pub fn cite_status(mut self, on: bool) -> Self {
        self.cite_status = Some(on);
        self
    }

    pub fn count_status(mut self, on: bool) -> Self {
        self.count_status = Some(on);
        self
    }

    pub fn legend(mut self, legend: LegendMode) -> Self {
        self.legend = Some(legend);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legend_picks_caption() {
        assert_eq!(LegendMode::Alt.caption("a", "t"), Some("a"));
        assert_eq!(LegendMode::Title.caption("a", ""), None);
        assert_eq!(LegendMode::AltTitle.caption("", "t"), Some("t"));
        assert_eq!(LegendMode::TitleAlt.caption("a", "t"), Some("t"));
        assert_eq!(LegendMode::None.caption("a", "t"), None);
    }

    #[test]
    fn patch_reports_changes() {
        let mut opts = RenderOptions::default();
        assert!(!opts.apply(&RenderOptionsPatch::default()));
        assert!(opts.apply(&RenderOptionsPatch::default().primary_color("#ff0000")));
        assert_eq!(opts.primary_color.as_deref(), Some("#ff0000"));
        assert!(!opts.apply(&RenderOptionsPatch::default().primary_color("#ff0000")));
    }

    #[test]
    fn patch_clears_optional_fields() {
        let mut opts = RenderOptions::default();
        opts.apply(
            &RenderOptionsPatch::default()
                .primary_color("#ff0000")
                .font_family("serif"),
        );
        assert_eq!(opts.font_family.as_deref(), Some("serif"));
        assert!(opts.apply(&RenderOptionsPatch::default().clear_primary_color()));
        assert_eq!(opts.primary_color, None);
        assert_eq!(opts.font_family.as_deref(), Some("serif"));
        assert!(opts.apply(&RenderOptionsPatch::default().clear_font_family()));
        assert_eq!(opts, RenderOptions::default());
        assert!(!opts.apply(&RenderOptionsPatch::default().clear_primary_color()));
    }

    #[test]
    fn options_from_partial_toml() {
        let opts = RenderOptions::from_toml_str(
            r##"
            theme = "grace"
            primary-color = "#009874"
            legend = "title-alt"
            cite-status = true
            "##,
        )
        .unwrap();
        assert_eq!(opts.theme, "grace");
        assert_eq!(opts.primary_color.as_deref(), Some("#009874"));
        assert_eq!(opts.legend, LegendMode::TitleAlt);
        assert!(opts.cite_status);
        // untouched fields keep defaults
        assert_eq!(opts.font_size, "16px");
        assert!(opts.mac_code_block);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = RenderOptions::from_toml_str("legend = 3").unwrap_err();
        assert!(matches!(err, RenderError::Config { .. }));
    }
}
