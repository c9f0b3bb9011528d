//! CLI binary for pdf2cards.
//!
//! A thin shim over the library crate that maps CLI flags to a completion
//! client, runs extraction and generation, and prints the cards.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2cards::config::{API_KEY_VAR, DEFAULT_CARD_COUNT, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use pdf2cards::pipeline::document::is_plain_text_path;
use pdf2cards::{
    extract_with, generate_request, CancellationToken, ChatCompletionsClient, ClientConfig,
    CompletionClient, Difficulty, ExtractOptions, FlashcardSetDraft, GeneratedCard,
    GenerationRequest, PdfiumEngine, ProviderClient, SourceDocument,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Ten intermediate cards from a PDF (stdout)
  pdf2cards lecture.pdf

  # Twenty advanced cards as a JSON set draft
  pdf2cards --count 20 --difficulty advanced --json --title "Cell Biology" notes.pdf

  # Plain-text input skips PDF extraction
  pdf2cards chapter3.txt -o chapter3.md

  # Only show the extracted text
  pdf2cards --extract-only scan.pdf

  # Use another provider through edgequake-llm
  pdf2cards --provider openai --model gpt-4.1-mini lecture.pdf

LIMITS:
  PDFs up to 10 MB; only the first 50 pages are read.
  Only the first 8000 characters of text are sent to the model.

ENVIRONMENT VARIABLES:
  PERPLEXITY_API_KEY      API key for the default chat-completions endpoint
  PDF2CARDS_ENDPOINT      Override the chat-completions URL
  PDF2CARDS_MODEL         Override the model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium (skips auto-download)
"#;

/// Generate study flashcards from a PDF or text file.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2cards",
    version,
    about = "Generate study flashcards from PDF documents with an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF (.pdf) or plain-text (.txt, .md) file.
    input: PathBuf,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "PDF2CARDS_OUTPUT")]
    output: Option<PathBuf>,

    /// Number of cards to ask for (1–50; the app offers 5, 10, 15, 20).
    #[arg(short = 'n', long, env = "PDF2CARDS_COUNT", default_value_t = DEFAULT_CARD_COUNT as u64,
          value_parser = clap::value_parser!(u64).range(1..=50))]
    count: u64,

    /// Question difficulty.
    #[arg(short, long, env = "PDF2CARDS_DIFFICULTY", value_enum, default_value = "intermediate")]
    difficulty: DifficultyArg,

    /// Model ID.
    #[arg(long, env = "PDF2CARDS_MODEL")]
    model: Option<String>,

    /// Use an edgequake-llm provider (openai, anthropic, gemini, ollama) instead
    /// of the chat-completions endpoint.
    #[arg(long, env = "PDF2CARDS_PROVIDER")]
    provider: Option<String>,

    /// Chat-completions URL.
    #[arg(long, env = "PDF2CARDS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// API key for the chat-completions endpoint.
    #[arg(long, env = API_KEY_VAR, hide_env_values = true)]
    api_key: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "PDF2CARDS_TIMEOUT_SECS", default_value_t = 60)]
    timeout: u64,

    /// Set title used for JSON output. Defaults to the file stem.
    #[arg(long)]
    title: Option<String>,

    /// Output a JSON set draft instead of Markdown.
    #[arg(long, env = "PDF2CARDS_JSON")]
    json: bool,

    /// Print the extracted text and stop (no API key needed).
    #[arg(long)]
    extract_only: bool,

    /// Disable the spinner.
    #[arg(long, env = "PDF2CARDS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2CARDS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2CARDS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum DifficultyArg {
    Basic,
    Intermediate,
    Advanced,
}

impl From<DifficultyArg> for Difficulty {
    fn from(v: DifficultyArg) -> Self {
        match v {
            DifficultyArg::Basic => Difficulty::Basic,
            DifficultyArg::Intermediate => Difficulty::Intermediate,
            DifficultyArg::Advanced => Difficulty::Advanced,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.verbose;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // Ctrl-C abandons the in-flight extraction or remote call.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let spinner = if show_progress {
        Some(new_spinner())
    } else {
        None
    };

    // ── Source text ──────────────────────────────────────────────────────
    let source_text = if is_plain_text_path(&cli.input) {
        tokio::fs::read_to_string(&cli.input)
            .await
            .with_context(|| format!("Failed to read {}", cli.input.display()))?
    } else {
        if let Some(ref s) = spinner {
            s.set_message("Extracting text…");
        }
        let document = SourceDocument::from_path(&cli.input)
            .await
            .context("Failed to open input")?;
        let extracted = extract_with(
            Arc::new(PdfiumEngine),
            document,
            &ExtractOptions::default(),
            cancel.clone(),
        )
        .await
        .context("Text extraction failed")?;
        if extracted.was_truncated() && !cli.quiet {
            if let Some(ref s) = spinner {
                s.println(dim(&format!(
                    "Read the first {} of {} pages",
                    extracted.pages_read, extracted.total_pages
                )));
            }
        }
        extracted.text
    };

    if cli.extract_only {
        if let Some(s) = spinner {
            s.finish_and_clear();
        }
        return write_output(cli.output.as_deref(), &source_text);
    }

    // ── Generation ───────────────────────────────────────────────────────
    let client = build_client(&cli)?;
    let request = GenerationRequest::new(&source_text, cli.count as usize, cli.difficulty.clone().into())
        .context("Invalid generation request")?;

    if let Some(ref s) = spinner {
        s.set_message(format!(
            "Generating {} {} cards with {}…",
            request.count(),
            request.difficulty(),
            client.name()
        ));
    }
    let result = generate_request(client.as_ref(), &request, &cancel).await;
    if let Some(s) = spinner {
        s.finish_and_clear();
    }
    let cards = result.map_err(|e| {
        let hint = e.user_message();
        anyhow::Error::new(e).context(hint)
    })?;

    let rendered = if cli.json {
        let title = cli.title.clone().unwrap_or_else(|| default_title(&cli.input));
        let draft = FlashcardSetDraft::from_generated(title, cards.clone());
        draft.validate().context("Generated set failed validation")?;
        serde_json::to_string_pretty(&draft).context("Failed to serialise cards")?
    } else {
        render_markdown(&cards)
    };

    write_output(cli.output.as_deref(), &rendered)?;

    if !cli.quiet {
        eprintln!(
            "{} {} flashcards generated {}",
            green("✔"),
            bold(&cards.len().to_string()),
            dim(&format!("({} requested)", request.count()))
        );
    }
    Ok(())
}

/// Pick the provider client when `--provider` is set, else the HTTP client.
fn build_client(cli: &Cli) -> Result<Box<dyn CompletionClient>> {
    if let Some(ref provider) = cli.provider {
        let model = cli.model.as_deref().unwrap_or("gpt-4.1-nano");
        let client = ProviderClient::from_name(provider, model)
            .context("Provider is not configured")?
            .with_timeout(cli.timeout);
        return Ok(Box::new(client));
    }

    let api_key = cli.api_key.clone().unwrap_or_default();
    let config = ClientConfig::builder(api_key)
        .endpoint(cli.endpoint.clone())
        .model(cli.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()))
        .timeout_secs(cli.timeout)
        .build()
        .context("Invalid configuration")?;
    let client = ChatCompletionsClient::new(config).context("Generation service is not configured")?;
    Ok(Box::new(client))
}

fn new_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message("Reading input…");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn render_markdown(cards: &[GeneratedCard]) -> String {
    let mut out = String::new();
    for (i, card) in cards.iter().enumerate() {
        out.push_str(&format!(
            "{}. **Q:** {}\n   **A:** {}\n\n",
            i + 1,
            card.question.trim(),
            card.answer.trim()
        ));
    }
    out
}

fn default_title(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Generated flashcards")
        .to_string()
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(p) => std::fs::write(p, content)
            .with_context(|| format!("Failed to write {}", p.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
            if !content.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
            Ok(())
        }
    }
}
