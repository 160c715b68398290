//! The markdown engine: an immutable pairing of a style mapping and the
//! render configuration.
//!
//! Building is cheap and engines are never mutated; changing an option means
//! building a new one. All per-document state lives in a [`ParseSession`]
//! created inside [`Engine::render`], so one engine can serve any number of
//! renders, including concurrent ones.

use std::sync::Arc;

use smol_str::SmolStr;

use crate::extensions::ExtensionSet;
use crate::frontmatter::{FrontMatter, parse_front_matter};
use crate::math::{MathMlRenderer, MathRenderer};
use crate::options::{LegendMode, RenderOptions};
use crate::postprocess;
use crate::reading::ReadingStats;
use crate::session::{FootnoteEntry, HeadingEntry, ParseSession, PendingTask};
use crate::style::StyleMapping;
use crate::token::tokenize;
use crate::writer::StyledWriter;

/// Non-style knobs for an [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub extensions: ExtensionSet,
    pub legend: LegendMode,
    pub cite_links: bool,
    pub count_words: bool,
    pub mac_code_block: bool,
    pub code_theme: SmolStr,
    /// `None` leaves math as placeholders plus pending tasks.
    pub math: Option<Arc<dyn MathRenderer>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_options(&RenderOptions::default())
    }
}

impl EngineConfig {
    pub fn from_options(options: &RenderOptions) -> Self {
        Self {
            extensions: ExtensionSet::all(),
            legend: options.legend,
            cite_links: options.cite_status,
            count_words: options.count_status,
            mac_code_block: options.mac_code_block,
            code_theme: options.code_theme.clone(),
            math: Some(Arc::new(MathMlRenderer)),
        }
    }

    pub fn with_math_renderer(mut self, math: Option<Arc<dyn MathRenderer>>) -> Self {
        self.math = math;
        self
    }

    pub fn with_extensions(mut self, extensions: ExtensionSet) -> Self {
        self.extensions = extensions;
        self
    }
}

/// Everything one render produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    /// Preview HTML: inline styles, theme variables kept on the container.
    pub html: String,
    pub front_matter: FrontMatter,
    pub footnotes: Vec<FootnoteEntry>,
    pub headings: Vec<HeadingEntry>,
    pub stats: ReadingStats,
    /// Placeholders still waiting for diagram or math output.
    pub pending: Vec<PendingTask>,
}

impl RenderOutput {
    /// Swap the placeholder of task `id` for `html` and drop the task.
    ///
    /// Returns `false` for an unknown id or when the placeholder is no longer
    /// in the output (for example after the HTML was edited).
    pub fn patch(&mut self, id: &str, html: &str) -> bool {
        let Some(pos) = self.pending.iter().position(|t| t.id == id) else {
            return false;
        };
        let task = &self.pending[pos];
        if !self.html.contains(&task.placeholder) {
            tracing::warn!(id, "placeholder missing from output, cannot patch");
            return false;
        }
        self.html = self.html.replacen(&task.placeholder, &task.fill(html), 1);
        self.pending.remove(pos);
        true
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    mapping: StyleMapping,
    config: EngineConfig,
}

impl Engine {
    pub fn build(mapping: StyleMapping, config: EngineConfig) -> Self {
        tracing::debug!(theme = mapping.name(), "built render engine");
        Self { mapping, config }
    }

    pub fn mapping(&self) -> &StyleMapping {
        &self.mapping
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Render `markdown` (front matter allowed). Never fails: malformed
    /// syntax falls through to text.
    pub fn render(&self, markdown: &str) -> RenderOutput {
        let front_matter = parse_front_matter(markdown);
        let extensions = &self.config.extensions;
        let mut blocks = extensions.claim(tokenize(&front_matter.body));

        let mut session = ParseSession::new(self.config.cite_links);
        extensions.prepare(&mut session);
        extensions.walk(&mut blocks, &mut session);
        let stats = ReadingStats::from_blocks(&blocks);

        let body = match StyledWriter::new(&self.mapping, &self.config, &mut session).run(&blocks)
        {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "writing HTML failed");
                String::new()
            }
        };
        let reading = self.config.count_words.then_some(&stats);
        let html = postprocess::assemble(&body, reading, &session.footnotes, &self.mapping);

        RenderOutput {
            html,
            front_matter,
            footnotes: session.footnotes.entries().to_vec(),
            headings: session.headings,
            stats,
            pending: session.pending,
        }
    }
}
