//! Resolving the placeholders left behind by a render.
//!
//! A render never blocks on I/O. Diagram blocks (and math, when the engine
//! has no synchronous renderer) come out as placeholders plus a
//! [`PendingTask`]; a [`TaskResolver`] turns a task into markup, and
//! [`resolve_pending`] patches the results into a [`RenderOutput`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::RenderError;
use crate::engine::RenderOutput;
use crate::math::MathRenderer;
use crate::session::{PendingTask, TaskKind};

#[async_trait]
pub trait TaskResolver: Send + Sync {
    /// Markup for `task`, or `Ok(None)` if this resolver does not handle
    /// its kind.
    async fn resolve(&self, task: &PendingTask) -> Result<Option<String>, RenderError>;
}

/// Renders math tasks with a synchronous [`MathRenderer`].
#[derive(Debug, Clone)]
pub struct MathTaskResolver(pub Arc<dyn MathRenderer>);

#[async_trait]
impl TaskResolver for MathTaskResolver {
    async fn resolve(&self, task: &PendingTask) -> Result<Option<String>, RenderError> {
        match task.kind {
            TaskKind::Math { display } => self.0.render(&task.source, display).map(Some),
            TaskKind::Diagram { .. } => Ok(None),
        }
    }
}

/// Renders diagrams to SVG through a Kroki server.
#[cfg(feature = "diagram-fetch")]
#[derive(Debug, Clone)]
pub struct KrokiResolver {
    client: reqwest::Client,
    endpoint: String,
}

#[cfg(feature = "diagram-fetch")]
impl Default for KrokiResolver {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ENDPOINT)
    }
}

#[cfg(feature = "diagram-fetch")]
impl KrokiResolver {
    pub const DEFAULT_ENDPOINT: &'static str = "https://kroki.io";

    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(feature = "diagram-fetch")]
#[async_trait]
impl TaskResolver for KrokiResolver {
    async fn resolve(&self, task: &PendingTask) -> Result<Option<String>, RenderError> {
        let TaskKind::Diagram { lang } = &task.kind else {
            return Ok(None);
        };
        let url = format!("{}/{}/svg", self.endpoint, lang);
        tracing::debug!(%url, id = %task.id, "fetching diagram");
        let svg = self
            .client
            .post(&url)
            .header("Content-Type", "text/plain")
            .body(task.source.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        if !svg.trim_start().starts_with('<') {
            return Err(RenderError::Diagram {
                message: format!("{lang} renderer returned something other than markup"),
            });
        }
        Ok(Some(svg))
    }
}

/// Outcome of [`resolve_pending`].
#[derive(Debug, Default)]
pub struct ResolveSummary {
    pub resolved: usize,
    /// Task ids with the error that stopped them. Their placeholders stay
    /// in the output.
    pub failed: Vec<(String, RenderError)>,
}

/// Run every pending task in `output` through the first resolver that
/// handles it and patch the results in.
///
/// Tasks no resolver handles are left pending and are not failures.
pub async fn resolve_pending(
    output: &mut RenderOutput,
    resolvers: &[&dyn TaskResolver],
) -> ResolveSummary {
    let mut summary = ResolveSummary::default();
    let tasks = output.pending.clone();
    'tasks: for task in tasks {
        for resolver in resolvers {
            match resolver.resolve(&task).await {
                Ok(Some(html)) => {
                    if output.patch(&task.id, &html) {
                        summary.resolved += 1;
                    }
                    continue 'tasks;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(id = %task.id, error = %e, "pending task failed");
                    summary.failed.push((task.id.clone(), e));
                    continue 'tasks;
                }
            }
        }
        tracing::debug!(id = %task.id, "no resolver handles task");
    }
    summary
}
