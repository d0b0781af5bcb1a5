use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use futures_util::StreamExt;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use texdraft_artifacts::{
    ArtifactState, DeltaEvent, DeltaKind, Document, DocumentBuffer, HandlerRegistry,
    LatexArtifact, Reconciler, preview,
};
use texdraft_common::{ProviderConfig, ReconcilerConfig, kinds};
use texdraft_llm::ModelRoleTable;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Prompts offered by `texdraft example`
const EXAMPLE_PROMPTS: [&str; 5] = [
    "Create a LaTeX document with an equation for the quadratic formula",
    "Write a LaTeX document with Maxwell's equations in differential form",
    "Generate a LaTeX document with Einstein's field equations",
    "Create a LaTeX document for a university homework template with matrix operations",
    "Generate a LaTeX document with the Navier-Stokes equations",
];

const PREVIEW_LINES: usize = 12;

/// Command-line arguments for the texdraft CLI
#[derive(Parser)]
#[command(name = "texdraft", about = "texdraft - Stream LaTeX documents from a language model")]
pub struct Args {
    #[command(subcommand)]
    command: Command,

    /// Use the deterministic test models
    #[clap(long, global = true)]
    test_mode: bool,

    /// Hosted model backing every role
    #[clap(long, global = true)]
    model: Option<String>,

    /// Enable debug mode
    #[clap(short, long, global = true)]
    debug: bool,

    /// Write the final document here instead of stdout
    #[clap(short, long, global = true)]
    output: Option<PathBuf>,

    /// Print delta events as JSON lines
    #[clap(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new document from a title
    Create { title: String },
    /// Revise an existing document
    Update {
        /// Document to revise
        #[clap(short, long)]
        file: PathBuf,
        /// What to change
        instruction: String,
    },
    /// Create a document from a random example prompt
    Example,
}

/// A single generation run, resolved from the command line
enum Run {
    Create { title: String },
    Update { document: Document, instruction: String },
}

impl Run {
    fn title(&self) -> &str {
        match self {
            Run::Create { title } => title,
            Run::Update { document, .. } => &document.title,
        }
    }

    fn initial_content(&self) -> &str {
        match self {
            Run::Create { .. } => "",
            Run::Update { document, .. } => &document.content,
        }
    }
}

fn provider_config(args: &Args) -> Result<ProviderConfig> {
    let mut config = ProviderConfig::from_env()?;
    if args.test_mode {
        config.test_mode = true;
    }
    if let Some(model) = &args.model {
        config.live_model = model.clone();
    }
    Ok(config)
}

fn load_document(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "Untitled".to_string());
    Ok(Document::new(title, kinds::LATEX, content))
}

fn pick_example() -> &'static str {
    EXAMPLE_PROMPTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(EXAMPLE_PROMPTS[0])
}

async fn generate(args: &Args, registry: &HandlerRegistry, run: Run) -> Result<String> {
    let handler = registry.get(kinds::LATEX)?;

    let mut panel = ArtifactState::new(kinds::LATEX, run.title());
    let mut reconciler: Reconciler<DocumentBuffer> =
        Reconciler::new(DeltaKind::Latex, ReconcilerConfig::default());
    reconciler.mount(run.initial_content());
    reconciler.set_on_save(|content, debounce| {
        debug!("Local edit ({} bytes, debounce={})", content.len(), debounce);
    });

    let title = run.title().to_string();
    let (tx, rx) = mpsc::unbounded_channel::<DeltaEvent>();
    let task = tokio::spawn(async move {
        let mut sink = tx;
        match run {
            Run::Create { title } => handler.on_create_document(&title, &mut sink).await,
            Run::Update {
                document,
                instruction,
            } => {
                handler
                    .on_update_document(&document, &instruction, &mut sink)
                    .await
            }
        }
    });

    let json = args.json;
    let deltas = UnboundedReceiverStream::new(rx).inspect(|event| {
        LatexArtifact::on_stream_part(&mut panel, event);
        if json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to encode delta: {}", e),
            }
        }
    });
    let applied = reconciler.apply_stream(deltas).await?;

    let final_content = task.await.context("Generation task panicked")??;
    reconciler.finish_run();
    panel.finish_stream();
    panel.push_version(Document::new(title, kinds::LATEX, final_content.clone()));
    info!("Applied {} deltas", applied);

    let buffered = reconciler.text().unwrap_or_default().to_string();
    if buffered != final_content {
        warn!("Buffer diverged from the final document, using the final document");
    }
    reconciler.unmount();

    if !json {
        eprintln!("{}", "📄 Preview".bright_cyan().bold());
        eprintln!("{}", preview(&final_content, PREVIEW_LINES).dimmed());
    }
    Ok(final_content)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Logs go to stderr so stdout carries only the document
    let default_level = if args.debug { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = provider_config(&args)?;
    let roles = Arc::new(ModelRoleTable::from_config(&config));
    let registry = HandlerRegistry::with_defaults(roles);
    info!("Document kinds: {}", registry.kinds().join(", "));

    let run = match &args.command {
        Command::Create { title } => Run::Create {
            title: title.clone(),
        },
        Command::Update { file, instruction } => Run::Update {
            document: load_document(file)?,
            instruction: instruction.clone(),
        },
        Command::Example => {
            let prompt = pick_example();
            eprintln!("{} {}", "🎲 Example:".bright_yellow(), prompt.bright_green());
            Run::Create {
                title: prompt.to_string(),
            }
        }
    };

    eprintln!(
        "{}",
        format!("🚀 Generating \"{}\" ({} models)...", run.title(), config_label(&config))
            .bright_yellow()
    );

    let document = match generate(&args, &registry, run).await {
        Ok(document) => document,
        Err(e) => {
            eprintln!("{}", format!("❌ Generation failed: {}", e).red());
            return Err(e);
        }
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{}",
                format!("✅ Wrote {}", path.display()).bright_green()
            );
        }
        None if !args.json => println!("{}", document),
        None => {}
    }

    Ok(())
}

fn config_label(config: &ProviderConfig) -> &str {
    if config.test_mode {
        "test"
    } else {
        &config.live_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_parse() {
        Args::command().debug_assert();

        let args = Args::parse_from(["texdraft", "--test-mode", "create", "Quadratic formula"]);
        assert!(args.test_mode);
        assert!(matches!(args.command, Command::Create { ref title } if title == "Quadratic formula"));

        let args = Args::parse_from(["texdraft", "update", "--file", "notes.tex", "Add a proof", "--json"]);
        assert!(args.json);
        assert!(matches!(args.command, Command::Update { .. }));
    }

    #[test]
    fn test_pick_example() {
        assert!(EXAMPLE_PROMPTS.contains(&pick_example()));
    }

    #[tokio::test]
    async fn test_generate_in_test_mode() {
        let args = Args::parse_from(["texdraft", "--test-mode", "create", "Quadratic formula"]);
        let config = provider_config(&args).unwrap();
        let registry = HandlerRegistry::with_defaults(Arc::new(ModelRoleTable::from_config(&config)));

        let document = generate(
            &args,
            &registry,
            Run::Create {
                title: "Quadratic formula".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(document.contains(r"\documentclass{article}"));
        assert!(document.ends_with(r"\end{document}"));
    }
}
