use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use studykit::config::{find_config_file, get_config, load_config, Config};
use studykit::export::OutputPlan;
use studykit::extract::{extract_document, ocr_available, ExtractOptions};
use studykit::generation::{Generation, Orchestrator};
use studykit::models::{ContentRequest, ProviderKind, QuestionKind};
use studykit::providers::ProviderPreference;
use studykit::ui::{self, Spinner, Status};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// studykit - Turn documents into quiz questions, flashcards and summaries
#[derive(Parser, Debug)]
#[command(name = "studykit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn PDF, DOCX and text documents into study materials", long_about = None)]
struct Cli {
    /// Documents to process (.pdf, .docx, .txt)
    #[arg(required_unless_present_any = ["env", "completions", "show_config"])]
    paths: Vec<PathBuf>,

    /// Provider to try first
    #[arg(long, short, value_enum, default_value_t = ProviderChoice::Auto)]
    provider: ProviderChoice,

    /// Do not OCR scanned pages or embedded images
    #[arg(long)]
    no_ocr: bool,

    /// Write JSON to this path (single document only)
    #[arg(long, value_name = "PATH")]
    output_json: Option<PathBuf>,

    /// Write PDF to this path (single document only)
    #[arg(long, value_name = "PATH")]
    output_pdf: Option<PathBuf>,

    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Per-provider timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Number of multiple choice questions
    #[arg(long, value_name = "N")]
    multiple_choice: Option<usize>,

    /// Number of short answer questions
    #[arg(long, value_name = "N")]
    short_answer: Option<usize>,

    /// Number of conceptual questions
    #[arg(long, value_name = "N")]
    conceptual: Option<usize>,

    /// Number of application questions
    #[arg(long, value_name = "N")]
    application: Option<usize>,

    /// Number of flash cards
    #[arg(long, value_name = "N")]
    flashcards: Option<usize>,

    /// Skip the summary
    #[arg(long)]
    no_summary: bool,

    /// Target summary length in words
    #[arg(long, value_name = "N")]
    summary_words: Option<usize>,

    /// Show all environment variables
    #[arg(long)]
    env: bool,

    /// Print the effective configuration with API keys redacted
    #[arg(long)]
    show_config: bool,

    /// Generate shell completions
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

/// Provider selection on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ProviderChoice {
    /// Gemini, then Claude, then GPT, then the local template
    Auto,
    #[value(name = "gemini")]
    Gemini,
    #[value(name = "claude")]
    Claude,
    #[value(name = "openai")]
    OpenAi,
    /// Offline template generator
    #[value(name = "local")]
    Local,
}

impl From<ProviderChoice> for ProviderPreference {
    fn from(choice: ProviderChoice) -> Self {
        match choice {
            ProviderChoice::Auto => ProviderPreference::Auto,
            ProviderChoice::Gemini => ProviderPreference::Prefer(ProviderKind::Gemini),
            ProviderChoice::Claude => ProviderPreference::Prefer(ProviderKind::Claude),
            ProviderChoice::OpenAi => ProviderPreference::Prefer(ProviderKind::OpenAi),
            ProviderChoice::Local => ProviderPreference::Prefer(ProviderKind::LocalTemplate),
        }
    }
}

impl Cli {
    /// Apply command line overrides to the configured request
    fn content_request(&self, base: &ContentRequest) -> ContentRequest {
        let mut request = base.clone();
        let overrides = [
            (QuestionKind::MultipleChoice, self.multiple_choice),
            (QuestionKind::ShortAnswer, self.short_answer),
            (QuestionKind::Conceptual, self.conceptual),
            (QuestionKind::Application, self.application),
        ];
        for (kind, count) in overrides {
            if let Some(count) = count {
                request = request.with_questions(kind, count);
            }
        }
        if let Some(count) = self.flashcards {
            request = request.with_flashcards(count);
        }
        if self.no_summary {
            request = request.with_summary(false);
        }
        if let Some(words) = self.summary_words {
            request = request.with_summary_words(words);
        }
        request
    }
}

/// Print all available environment variables
fn print_env_vars() {
    println!("studykit - Environment Variables");
    println!();
    println!("API Keys (an empty value counts as unset):");
    println!("  GOOGLE_API_KEY              Enables Google Gemini");
    println!("  ANTHROPIC_API_KEY           Enables Anthropic Claude");
    println!("  OPENAI_API_KEY              Enables OpenAI GPT");
    println!();
    println!("Generation Settings:");
    println!("  STUDYKIT_GENERATION__TIMEOUT_SECS               Per-provider timeout (default: 90)");
    println!("  STUDYKIT_GENERATION__REQUEST__MULTIPLE_CHOICE   Multiple choice questions (default: 4)");
    println!("  STUDYKIT_GENERATION__REQUEST__FLASHCARDS        Flash cards (default: 10)");
    println!("  STUDYKIT_GENERATION__REQUEST__SUMMARY_WORDS     Summary length in words (default: 150)");
    println!();
    println!("Provider Settings (GEMINI, CLAUDE or OPENAI):");
    println!("  STUDYKIT_PROVIDERS__GEMINI__MODEL               Model name");
    println!("  STUDYKIT_PROVIDERS__GEMINI__BASE_URL            API base URL");
    println!("  STUDYKIT_PROVIDERS__GEMINI__MAX_INPUT_CHARS     Input truncation limit");
    println!("  STUDYKIT_PROVIDERS__GEMINI__TIMEOUT_SECS        HTTP timeout (default: 120)");
    println!();
    println!("Extraction Settings:");
    println!("  STUDYKIT_EXTRACTION__OCR                        OCR scans and embedded images (default: true)");
    println!("  STUDYKIT_EXTRACTION__OCR_LANGUAGE               Tesseract language (default: eng)");
    println!("  STUDYKIT_EXTRACTION__OCR_DPI                    Render resolution (default: 300)");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging level (e.g., debug, info, warn, error)");
    println!();
    println!("Example:");
    println!("  export ANTHROPIC_API_KEY=\"your-key-here\"");
    println!("  export STUDYKIT_PROVIDERS__CLAUDE__MODEL=\"claude-sonnet-4-5\"");
    std::process::exit(0);
}

fn load(cli: &Cli) -> Result<Config> {
    let config = if let Some(config_path) = &cli.config {
        load_config(config_path)
            .with_context(|| format!("Cannot load config {}", config_path.display()))?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)?
    } else {
        get_config()?
    };
    Ok(config)
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        ui::print_status(Status::Error, &format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
    }

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "studykit", &mut std::io::stdout());
        return Ok(());
    }

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("studykit={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = load(&cli)?;
    if let Some(timeout) = cli.timeout {
        config.generation.timeout_secs = timeout;
    }
    if cli.no_ocr {
        config.extraction.ocr = false;
    }
    config.generation.request = cli.content_request(&config.generation.request);

    if cli.show_config {
        print!("{}", config.to_toml_redacted()?);
        return Ok(());
    }

    if cli.paths.len() > 1 && (cli.output_json.is_some() || cli.output_pdf.is_some()) {
        bail!("--output-json and --output-pdf take a single input document");
    }

    if config.extraction.ocr && !ocr_available() {
        tracing::debug!("poppler-utils or tesseract not found; scanned pages and images cannot be read");
    }

    let orchestrator = Orchestrator::from_config(&config, cli.provider.into());
    let options = ExtractOptions::from(&config.extraction);
    let out_dir = std::env::current_dir().context("Cannot determine working directory")?;

    if !cli.quiet {
        let chain: Vec<&str> = orchestrator.chain().iter().map(|k| k.name()).collect();
        ui::print_status(Status::Info, &format!("Provider order: {}", chain.join(" → ")));
    }

    let failed = convert_all(&cli, &config, &orchestrator, &options, &out_dir).await;
    if failed > 0 {
        bail!("{} of {} documents failed", failed, cli.paths.len());
    }

    Ok(())
}

/// Convert every document, reporting failures and carrying on with the rest.
///
/// Returns the number of documents that failed.
async fn convert_all(
    cli: &Cli,
    config: &Config,
    orchestrator: &Orchestrator,
    options: &ExtractOptions,
    out_dir: &Path,
) -> usize {
    let mut failed = 0;

    for path in &cli.paths {
        let outputs = OutputPlan::new(
            path,
            out_dir,
            cli.output_json.as_deref(),
            cli.output_pdf.as_deref(),
        );

        let result = process(cli, config, orchestrator, options, path)
            .await
            .and_then(|generation| {
                outputs.write(&generation.materials)?;
                Ok(generation)
            });

        match result {
            Ok(generation) => {
                if !cli.quiet {
                    report(&generation, &outputs);
                }
            }
            Err(e) => {
                failed += 1;
                ui::print_status(Status::Error, &format!("{}: {:#}", path.display(), e));
            }
        }
    }

    failed
}

/// Extract one document and generate its study materials
async fn process(
    cli: &Cli,
    config: &Config,
    orchestrator: &Orchestrator,
    options: &ExtractOptions,
    path: &Path,
) -> Result<Generation> {
    let spinner = if cli.quiet || !ui::is_terminal() {
        Spinner::hidden()
    } else {
        Spinner::new(&format!("Extracting text from {}...", path.display()))
    };

    let document = {
        let path = path.to_path_buf();
        let options = options.clone();
        tokio::task::spawn_blocking(move || extract_document(&path, &options)).await?
    };
    let document = match document {
        Ok(document) => document,
        Err(e) => {
            spinner.finish_with_error(&format!("Extraction failed for {}", path.display()));
            return Err(e.into());
        }
    };

    spinner.set_message(&format!(
        "Generating study materials from {} words...",
        document.word_count()
    ));

    match orchestrator
        .generate(&document, &config.generation.request)
        .await
    {
        Ok(generation) => {
            spinner.finish_with_success(&format!(
                "Generated with {}",
                generation.provider().name()
            ));
            Ok(generation)
        }
        Err(e) => {
            spinner.finish_with_error("Generation failed");
            Err(e.into())
        }
    }
}

fn report(generation: &Generation, outputs: &OutputPlan) {
    ui::print_section(generation.materials.display_name());
    println!("{}", ui::materials_table(generation));

    if generation.failures().next().is_some() {
        ui::print_status(Status::Warning, "Some providers failed before one succeeded:");
        println!("{}", ui::attempts_table(&generation.attempts));
    }

    for path in outputs.paths() {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        ui::print_status(
            Status::Success,
            &format!("Saved {} ({})", path.display(), ui::format_file_size(size)),
        );
    }
}
