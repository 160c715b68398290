//! YAML front matter split.

use indexmap::IndexMap;
use yaml_rust2::{Yaml, YamlLoader};

/// Flat front matter attributes plus the remaining markdown body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub attributes: IndexMap<String, String>,
    pub body: String,
}

impl FrontMatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    pub fn author(&self) -> Option<&str> {
        self.get("author")
    }

    pub fn digest(&self) -> Option<&str> {
        self.get("digest")
    }

    pub fn source(&self) -> Option<&str> {
        self.get("source")
    }

    pub fn banner(&self) -> Option<&str> {
        self.get("banner")
    }

    fn body_only(markdown: &str) -> Self {
        Self {
            attributes: IndexMap::new(),
            body: markdown.to_string(),
        }
    }
}

/// Split a leading `---` fenced YAML block from the markdown body.
///
/// Anything that does not parse as YAML is treated as plain body text with
/// no attributes.
pub fn parse_front_matter(markdown: &str) -> FrontMatter {
    let source = markdown.strip_prefix('\u{feff}').unwrap_or(markdown);
    let Some((yaml, body)) = split_fence(source) else {
        return FrontMatter::body_only(markdown);
    };

    let docs = match YamlLoader::load_from_str(yaml) {
        Ok(docs) => docs,
        Err(e) => {
            tracing::debug!(error = %e, "front matter is not valid YAML, keeping it as body");
            return FrontMatter::body_only(markdown);
        }
    };

    let mut attributes = IndexMap::new();
    match docs.first() {
        Some(Yaml::Hash(hash)) => {
            for (k, v) in hash.iter() {
                let Some(key) = scalar_to_string(k) else {
                    continue;
                };
                if let Some(value) = value_to_string(v) {
                    attributes.insert(key, value);
                }
            }
        }
        None | Some(Yaml::Null) => {}
        Some(_) => {
            tracing::debug!("front matter is not a mapping, keeping it as body");
            return FrontMatter::body_only(markdown);
        }
    }

    FrontMatter {
        attributes,
        body: body.to_string(),
    }
}

/// Returns `(yaml, body)` when `source` opens with a `---` line that is
/// closed by a later `---` or `...` line.
fn split_fence(source: &str) -> Option<(&str, &str)> {
    let mut lines = source.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }
    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let yaml = &source[yaml_start..offset];
            let body = &source[offset + line.len()..];
            return Some((yaml, body.trim_start_matches(['\r', '\n'])));
        }
        offset += line.len();
    }
    None
}

fn scalar_to_string(yaml: &Yaml) -> Option<String> {
    match yaml {
        Yaml::String(s) | Yaml::Real(s) => Some(s.clone()),
        Yaml::Integer(i) => Some(i.to_string()),
        Yaml::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_string(yaml: &Yaml) -> Option<String> {
    match yaml {
        Yaml::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
            Some(parts.join(", "))
        }
        Yaml::Null => Some(String::new()),
        other => scalar_to_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_attributes_and_body() {
        let fm = parse_front_matter(
            "---\ntitle: Hello\nauthor: Someone\ntags: [a, b]\n---\n\n# Body\n",
        );
        assert_eq!(fm.title(), Some("Hello"));
        assert_eq!(fm.author(), Some("Someone"));
        assert_eq!(fm.get("tags"), Some("a, b"));
        assert_eq!(fm.body, "# Body\n");
    }

    #[test]
    fn no_front_matter_is_all_body() {
        let fm = parse_front_matter("# Title\n\ntext");
        assert!(fm.attributes.is_empty());
        assert_eq!(fm.body, "# Title\n\ntext");
    }

    #[test]
    fn unclosed_fence_is_all_body() {
        let src = "---\ntitle: x\n\nno closing fence";
        let fm = parse_front_matter(src);
        assert!(fm.attributes.is_empty());
        assert_eq!(fm.body, src);
    }

    #[test]
    fn malformed_yaml_is_all_body() {
        let src = "---\ntitle: [unterminated\n---\nbody";
        let fm = parse_front_matter(src);
        assert!(fm.attributes.is_empty());
        assert_eq!(fm.body, src);
    }

    #[test]
    fn empty_block_and_crlf() {
        let fm = parse_front_matter("---\r\n---\r\nbody");
        assert!(fm.attributes.is_empty());
        assert_eq!(fm.body, "body");
    }

    #[test]
    fn scalar_types_are_stringified() {
        let fm = parse_front_matter("---\ncount: 3\ndraft: true\ndigest:\n---\n");
        assert_eq!(fm.get("count"), Some("3"));
        assert_eq!(fm.get("draft"), Some("true"));
        assert_eq!(fm.digest(), Some(""));
        assert_eq!(fm.body, "");
    }
}
