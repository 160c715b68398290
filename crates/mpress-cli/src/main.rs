use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use mpress_renderer::resolve::{KrokiResolver, MathTaskResolver, TaskResolver, resolve_pending};
use mpress_renderer::{MarkdownRenderer, MathMlRenderer, RenderOptions, RenderOptionsPatch};

#[derive(Parser)]
#[command(version, about = "mpress - markdown to inline-styled HTML for WeChat articles", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Options file (TOML, kebab-case keys)
    #[arg(long, global = true, env = "MPRESS_CONFIG")]
    config: Option<PathBuf>,

    /// Theme name, or a path to a theme TOML file
    #[arg(long, global = true)]
    theme: Option<String>,

    #[arg(long, global = true)]
    primary_color: Option<String>,

    #[arg(long, global = true)]
    font_size: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a markdown file to HTML
    Render {
        file: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Inline every style for pasting into an editor
        #[arg(long)]
        export: bool,

        /// Fetch diagrams and fill in deferred math before writing
        #[arg(long)]
        resolve: bool,

        /// Kroki server used by --resolve
        #[arg(long, default_value = KrokiResolver::DEFAULT_ENDPOINT)]
        kroki: String,

        /// Turn external links into numbered citations
        #[arg(long)]
        cite: bool,

        /// Prepend word count and reading time
        #[arg(long)]
        count: bool,
    },
    /// Print the current theme as a stylesheet
    Styles,
    /// List available themes
    Themes,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette()?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut renderer = build_renderer(&cli)?;

    match cli.command {
        Commands::Render {
            file,
            output,
            export,
            resolve,
            kroki,
            cite,
            count,
        } => {
            let mut patch = RenderOptionsPatch::default();
            if cite {
                patch = patch.cite_status(true);
            }
            if count {
                patch = patch.count_status(true);
            }
            renderer.set_options(&patch);
            let html = render_file(&renderer, &file, export, resolve.then_some(kroki)).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, html).into_diagnostic()?;
                    tracing::info!(path = %path.display(), "wrote output");
                }
                None => println!("{html}"),
            }
        }
        Commands::Styles => print!("{}", renderer.get_styles()),
        Commands::Themes => {
            for name in renderer.themes().names() {
                let marker = if name == renderer.options().theme.as_str() { "*" } else { " " };
                println!("{marker} {name}");
            }
        }
    }

    Ok(())
}

/// Config file first, flags on top.
fn build_renderer(cli: &Cli) -> Result<MarkdownRenderer> {
    let options = match &cli.config {
        Some(path) => RenderOptions::from_toml_file(path)?,
        None => RenderOptions::default(),
    };
    let mut renderer = MarkdownRenderer::new(options);

    let mut patch = RenderOptionsPatch::default();
    if let Some(theme) = &cli.theme {
        let path = Path::new(theme);
        if path.extension().is_some_and(|ext| ext == "toml") {
            let source = std::fs::read_to_string(path).into_diagnostic()?;
            let theme = mpress_renderer::Theme::from_toml_str(&source)?;
            patch = patch.theme(theme.name.clone());
            renderer.register_theme(theme);
        } else if renderer.themes().get(theme).is_some() {
            patch = patch.theme(theme.as_str());
        } else {
            return Err(mpress_renderer::RenderError::ThemeNotFound {
                theme: theme.clone(),
            }
            .into());
        }
    }
    if let Some(color) = &cli.primary_color {
        patch = patch.primary_color(color.as_str());
    }
    if let Some(size) = &cli.font_size {
        patch = patch.font_size(size.as_str());
    }
    renderer.set_options(&patch);
    Ok(renderer)
}

async fn render_file(
    renderer: &MarkdownRenderer,
    file: &Path,
    export: bool,
    kroki: Option<String>,
) -> Result<String> {
    let markdown = std::fs::read_to_string(file).into_diagnostic()?;
    let mut output = renderer.parse(&markdown);
    if let Some(title) = output.front_matter.title() {
        tracing::debug!(title, "front matter");
    }

    if let Some(endpoint) = kroki {
        let diagrams = KrokiResolver::new(endpoint);
        let math = MathTaskResolver(Arc::new(MathMlRenderer));
        let resolvers: [&dyn TaskResolver; 2] = [&diagrams, &math];
        let summary = resolve_pending(&mut output, &resolvers).await;
        for (id, error) in &summary.failed {
            tracing::warn!(%id, %error, "left placeholder in place");
        }
        tracing::info!(resolved = summary.resolved, failed = summary.failed.len(), "resolved pending tasks");
    } else if !output.pending.is_empty() {
        tracing::info!(pending = output.pending.len(), "placeholders left unresolved, pass --resolve to fetch them");
    }

    Ok(if export {
        renderer.export(&output)
    } else {
        output.html
    })
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_render_flags() {
        let cli = Cli::try_parse_from([
            "mpress",
            "--theme",
            "grace",
            "render",
            "post.md",
            "--export",
            "-o",
            "out.html",
        ])
        .unwrap();
        assert_eq!(cli.theme.as_deref(), Some("grace"));
        match cli.command {
            Commands::Render {
                file,
                output,
                export,
                resolve,
                ..
            } => {
                assert_eq!(file, PathBuf::from("post.md"));
                assert_eq!(output, Some(PathBuf::from("out.html")));
                assert!(export);
                assert!(!resolve);
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from(["mpress", "--primary-color", "#ff0000", "styles"]).unwrap();
        let renderer = build_renderer(&cli).unwrap();
        assert_eq!(renderer.options().primary_color.as_deref(), Some("#ff0000"));
        assert!(renderer.get_styles().contains("--md-primary-color: #ff0000"));
    }

    #[test]
    fn unknown_theme_is_an_error() {
        let cli = Cli::try_parse_from(["mpress", "--theme", "nope", "themes"]).unwrap();
        assert!(build_renderer(&cli).is_err());
    }
}
