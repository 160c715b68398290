//! Themes: named declaration sets loaded from TOML, and the registry of
//! built-in and user themes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::RenderError;
use crate::style::StyleDeclarations;

const DEFAULT_THEME: &str = include_str!("../themes/default.toml");
const GRACE_THEME: &str = include_str!("../themes/grace.toml");
const SIMPLE_THEME: &str = include_str!("../themes/simple.toml");

/// A named set of CSS declarations keyed by semantic element tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: SmolStr,
    /// Defaults merged under every block and inline entry.
    #[serde(default)]
    pub base: StyleDeclarations,
    /// Custom properties, e.g. the primary color.
    #[serde(default)]
    pub variables: StyleDeclarations,
    #[serde(default)]
    pub block: IndexMap<SmolStr, StyleDeclarations>,
    #[serde(default)]
    pub inline: IndexMap<SmolStr, StyleDeclarations>,
}

impl Theme {
    pub fn empty(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            base: StyleDeclarations::new(),
            variables: StyleDeclarations::new(),
            block: IndexMap::new(),
            inline: IndexMap::new(),
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, RenderError> {
        toml::from_str(source).map_err(|e| RenderError::Theme {
            message: e.to_string(),
        })
    }
}

impl Default for Theme {
    fn default() -> Self {
        BuiltinTheme::Default.theme()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuiltinTheme {
    #[default]
    Default,
    Grace,
    Simple,
}

static BUILTINS: LazyLock<[Theme; 3]> = LazyLock::new(|| {
    [
        load_builtin("default", DEFAULT_THEME),
        load_builtin("grace", GRACE_THEME),
        load_builtin("simple", SIMPLE_THEME),
    ]
});

fn load_builtin(name: &str, source: &str) -> Theme {
    Theme::from_toml_str(source).unwrap_or_else(|e| {
        tracing::error!(theme = name, error = %e, "built-in theme failed to load");
        Theme::empty(name)
    })
}

impl BuiltinTheme {
    pub const ALL: &'static [BuiltinTheme] =
        &[BuiltinTheme::Default, BuiltinTheme::Grace, BuiltinTheme::Simple];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinTheme::Default => "default",
            BuiltinTheme::Grace => "grace",
            BuiltinTheme::Simple => "simple",
        }
    }

    /// A fresh copy of the theme.
    pub fn theme(self) -> Theme {
        let idx = match self {
            BuiltinTheme::Default => 0,
            BuiltinTheme::Grace => 1,
            BuiltinTheme::Simple => 2,
        };
        BUILTINS[idx].clone()
    }
}

impl FromStr for BuiltinTheme {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuiltinTheme::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RenderError::ThemeNotFound { theme: s.into() })
    }
}

/// Themes available by name: the built-ins plus anything registered.
#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    themes: IndexMap<SmolStr, Theme>,
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        let themes = BuiltinTheme::ALL
            .iter()
            .map(|t| (SmolStr::new(t.name()), t.theme()))
            .collect();
        Self { themes }
    }
}

impl ThemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a theme under its own name.
    pub fn register(&mut self, theme: Theme) {
        self.themes.insert(theme.name.clone(), theme);
    }

    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.themes.get(name)
    }

    /// The named theme, or the default theme when the name is unknown.
    pub fn resolve(&self, name: &str) -> Theme {
        match self.themes.get(name) {
            Some(theme) => theme.clone(),
            None => {
                tracing::warn!(theme = name, "unknown theme, using default");
                BuiltinTheme::Default.theme()
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(SmolStr::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_parse() {
        for builtin in BuiltinTheme::ALL {
            let source = match builtin {
                BuiltinTheme::Default => DEFAULT_THEME,
                BuiltinTheme::Grace => GRACE_THEME,
                BuiltinTheme::Simple => SIMPLE_THEME,
            };
            let theme = Theme::from_toml_str(source).expect("builtin theme parses");
            assert_eq!(theme.name, builtin.name());
            assert!(!theme.block.is_empty());
            assert!(theme.variables.get("--md-primary-color").is_some());
        }
    }

    #[test]
    fn theme_keeps_file_order() {
        let theme = BuiltinTheme::Default.theme();
        let h1: Vec<_> = theme.block["h1"].iter().map(|(k, _)| k).collect();
        assert_eq!(&h1[..3], &["display", "padding", "border-bottom"]);
    }

    #[test]
    fn malformed_theme_is_an_error() {
        let err = Theme::from_toml_str("name = ").unwrap_err();
        assert!(matches!(err, RenderError::Theme { .. }));
    }

    #[test]
    fn registry_falls_back_to_default() {
        let mut registry = ThemeRegistry::new();
        assert_eq!(registry.resolve("nope").name, "default");
        let mut custom = Theme::empty("mine");
        custom
            .block
            .insert("p".into(), [("color", "red")].into_iter().collect());
        registry.register(custom);
        assert_eq!(registry.resolve("mine").name, "mine");
        assert!(registry.names().any(|n| n == "grace"));
    }

    #[test]
    fn builtin_from_str_is_case_insensitive() {
        assert_eq!("Grace".parse::<BuiltinTheme>().unwrap(), BuiltinTheme::Grace);
        assert!("purple".parse::<BuiltinTheme>().is_err());
    }
}
