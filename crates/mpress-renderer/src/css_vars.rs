//! CSS custom property resolution for the export path.
//!
//! Editors that strip stylesheets usually drop custom properties too, so
//! exported HTML must not depend on `var()`. A [`VariableScope`] follows the
//! element tree: each element inherits its parent's properties, adds its
//! own, and has every `var(--name[, fallback])` replaced with a literal.

use std::collections::HashMap;

use crate::style::StyleDeclarations;

/// Substitution depth guard against pathological fallbacks.
const MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableScope {
    vars: HashMap<String, String>,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A root scope defined by `decls` (typically a `:root` rule).
    pub fn from_declarations(decls: &StyleDeclarations) -> Self {
        Self::new().child(decls)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Scope for an element declaring `decls` under `self`.
    ///
    /// Stored values are already substituted, so later lookups never chase
    /// references. A property whose value cannot be resolved is left unset,
    /// which is what a browser does with an invalid custom property.
    pub fn child(&self, decls: &StyleDeclarations) -> Self {
        let mut scope = self.clone();
        for (name, value) in decls.custom_properties() {
            match scope.substitute(value) {
                Some(resolved) => {
                    scope.vars.insert(name.to_string(), resolved);
                }
                None => {
                    tracing::debug!(name, value, "custom property does not resolve");
                    scope.vars.remove(name);
                }
            }
        }
        scope
    }

    /// `decls` without custom properties, with every `var()` replaced.
    /// Declarations that cannot be resolved are dropped.
    pub fn resolve_declarations(&self, decls: &StyleDeclarations) -> StyleDeclarations {
        let mut out = StyleDeclarations::new();
        for (property, value) in decls.iter() {
            if property.starts_with("--") {
                continue;
            }
            match self.substitute(value) {
                Some(resolved) => out.insert(property, resolved),
                None => tracing::debug!(property, value, "dropping unresolvable declaration"),
            }
        }
        out
    }

    /// Replace every `var()` in `value`; `None` when a reference has neither
    /// a definition nor a fallback.
    pub fn substitute(&self, value: &str) -> Option<String> {
        self.substitute_at(value, 0)
    }

    fn substitute_at(&self, value: &str, depth: usize) -> Option<String> {
        if depth > MAX_DEPTH {
            return None;
        }
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find("var(") {
            out.push_str(&rest[..start]);
            let inner_start = start + "var(".len();
            let close = inner_start + matching_paren(&rest[inner_start..])?;
            let inner = &rest[inner_start..close];
            let (name, fallback) = match top_level_comma(inner) {
                Some(i) => (&inner[..i], Some(&inner[i + 1..])),
                None => (inner, None),
            };
            let replacement = match (self.vars.get(name.trim()), fallback) {
                (Some(v), _) => self.substitute_at(v, depth + 1)?,
                (None, Some(fallback)) => self.substitute_at(fallback.trim(), depth + 1)?,
                (None, None) => return None,
            };
            out.push_str(&replacement);
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        Some(out)
    }
}

/// Offset of the `)` closing an already opened parenthesis.
fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn top_level_comma(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}
