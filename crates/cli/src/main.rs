use clap::{Parser, Subcommand};
use cxr_core::{
    ArtifactStore, ConditionSet, CoreConfig, DocumentRenderer, GeminiBackend, GeminiConfig, Prompt,
    RawNarrative, RenderContext, ReportId, ReportService, SectionParser, TrailingFindings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cxr")]
#[command(about = "Chest X-ray report service CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List condition labels and their decision thresholds
    Conditions,
    /// Print the prompt that would be sent to the narrative backend
    Prompt {
        /// Fourteen comma-separated probabilities in condition order
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        predictions: Vec<f64>,
    },
    /// Parse a narrative file and print the structured document as JSON
    Parse {
        /// Narrative text file
        file: PathBuf,
        /// Discard findings rows left unflushed at the end of the narrative, overriding
        /// CXR_TRAILING_FINDINGS
        #[arg(long)]
        drop_trailing: bool,
    },
    /// Render a narrative file to a PDF report without calling the backend
    Render {
        /// Narrative text file
        file: PathBuf,
        /// Output directory (defaults to CXR_REPORTS_DIR or "reports")
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Run the full pipeline against the configured narrative backend
    Report {
        /// Fourteen comma-separated probabilities in condition order
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        predictions: Vec<f64>,
    },
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn core_config() -> Result<CoreConfig, Box<dyn std::error::Error>> {
    Ok(CoreConfig::from_env_values(
        env("CXR_REPORTS_DIR"),
        env("CXR_NARRATIVE_TIMEOUT_SECS"),
        env("CXR_WORKER_THREADS"),
        env("CXR_TRAILING_FINDINGS"),
    )?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cxr_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Conditions) => {
            for condition in ConditionSet::nih_chest_xray14().iter() {
                println!("{:<20} {:.4}", condition.label, condition.threshold);
            }
        }
        Some(Commands::Prompt { predictions }) => {
            let scores = ConditionSet::nih_chest_xray14().scores(&predictions)?;
            println!("{}", Prompt::build(&scores));
        }
        Some(Commands::Parse {
            file,
            drop_trailing,
        }) => {
            let cfg = core_config()?;
            let text = std::fs::read_to_string(&file)?;
            let conditions = ConditionSet::nih_chest_xray14();
            let policy = trailing_policy(drop_trailing, cfg.trailing_findings());
            let document = SectionParser::new(&conditions)
                .with_trailing_findings(policy)
                .parse(&RawNarrative::new(text));
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Some(Commands::Render { file, out_dir }) => {
            let cfg = core_config()?;
            let text = std::fs::read_to_string(&file)?;
            let conditions = ConditionSet::nih_chest_xray14();
            let document = SectionParser::new(&conditions)
                .with_trailing_findings(cfg.trailing_findings())
                .parse(&RawNarrative::new(text));

            let out_dir = out_dir.unwrap_or_else(|| cfg.reports_dir().to_path_buf());
            let store = ArtifactStore::open(&out_dir)?;
            let context = RenderContext::new(ReportId::new());
            let artifact = DocumentRenderer::default().render_to_store(&document, &context, &store)?;
            println!(
                "Rendered {} page(s) to {} at {}",
                artifact.page_count,
                artifact.path.display(),
                context.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        Some(Commands::Report { predictions }) => {
            let cfg = core_config()?;
            let service = ReportService::new(&cfg, Arc::new(gemini_backend(&cfg)))?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .max_blocking_threads(cfg.worker_threads())
                .build()?;
            match runtime.block_on(service.generate(&predictions)) {
                Ok(artifact) => println!(
                    "Report {} written to {}",
                    artifact.report_id,
                    artifact.path.display()
                ),
                Err(e) => {
                    eprintln!("Error generating report: {}", e.user_message());
                    return Err(e.into());
                }
            }
        }
        None => {
            println!("No command provided. Use --help for usage information.");
        }
    }

    Ok(())
}

/// `--drop-trailing` overrides the configured policy; otherwise `CXR_TRAILING_FINDINGS` applies.
fn trailing_policy(drop_trailing: bool, configured: TrailingFindings) -> TrailingFindings {
    if drop_trailing {
        TrailingFindings::Drop
    } else {
        configured
    }
}

fn gemini_backend(cfg: &CoreConfig) -> GeminiBackend {
    GeminiBackend::new(
        GeminiConfig::from_env_values(env("GEMINI_API_KEY"), env("GEMINI_MODEL"), env("GEMINI_BASE_URL"))
            .with_http_timeout(cfg.narrative_timeout()),
    )
}
