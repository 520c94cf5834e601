//! CLI binary for edgequake-extract.
//!
//! A thin shim over the library crate: loads the config, builds one
//! `Extractor`, then either serves HTTP or runs a single extraction.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_extract::{
    server, Config, ExtractRequest, ExtractionProgressCallback, Extractor, ProgressCallback,
    PromptCatalog, SanitizedOutput, SourceContent,
};
use edgequake_extract::source::is_url;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that narrates the pipeline stages.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_classified(&self, name: &str, category: &str, bytes: usize) {
        self.bar.println(format!(
            "{} {}  {}",
            cyan("◆"),
            bold(name),
            dim(&format!("{category}, {bytes} bytes"))
        ));
        self.bar.set_prefix("Extracting");
    }

    fn on_ocr_fallback(&self, name: &str) {
        self.bar
            .println(format!("  {} no text layer in {name}, running OCR", cyan("⚠")));
        self.bar.set_prefix("OCR");
        self.bar.set_message("waiting for OCR…");
    }

    fn on_provider_call(&self, provider: &str, request_kind: &str) {
        self.bar.set_prefix("Calling");
        self.bar
            .set_message(format!("{provider} ({request_kind} request)"));
    }

    fn on_complete(&self, output_len: usize) {
        self.bar.finish_and_clear();
        eprintln!("{} {} chars extracted", green("✔"), bold(&output_len.to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service
  extract serve --bind 0.0.0.0:8000

  # Tables from a PDF as CSV (stdout)
  extract file invoice.pdf --prompt ocr

  # Free-form prompt, markdown preview with repaired tables
  extract file report.xlsx --prompt-text "Summarise each sheet as a table" --ext md --preview

  # Summarise a web page with a specific provider, saved to the processed dir
  extract summary example.com --prompt summary --provider openai --save

  # List prompt templates
  extract prompts

CONFIGURATION:
  Settings come from a TOML file (default: config.toml, or $EXTRACT_CONFIG).
  API keys may live in a separate secrets file merged over it (--secrets).
"#;

/// Extract structured text from documents and web pages with LLM providers.
#[derive(Parser, Debug)]
#[command(
    name = "extract",
    version,
    about = "Extract structured text from documents and web pages with LLM providers",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = "EXTRACT_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Optional secrets file merged over the configuration.
    #[arg(long, global = true, env = "EXTRACT_SECRETS")]
    secrets: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "EXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "EXTRACT_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "EXTRACT_NO_PROGRESS")]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Listen address; overrides `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Extract from a local file.
    File {
        /// Path to a PDF, spreadsheet, image or text file.
        path: PathBuf,

        #[command(flatten)]
        opts: ExtractOpts,
    },

    /// Extract from a web page via the scraping API.
    Summary {
        /// Page URL; `https://` is assumed when no scheme is given.
        url: String,

        #[command(flatten)]
        opts: ExtractOpts,
    },

    /// List the configured prompt templates.
    Prompts,
}

#[derive(Args, Debug)]
struct ExtractOpts {
    /// Prompt template id or name supplying defaults.
    #[arg(long)]
    prompt: Option<String>,

    /// Prompt text; overrides the template's prompt.
    #[arg(long)]
    prompt_text: Option<String>,

    /// Provider: gemini, openai, mistral (default from config).
    #[arg(long)]
    provider: Option<String>,

    /// Output extension: csv, md, txt, …
    #[arg(long)]
    ext: Option<String>,

    /// Write the result to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the result to `ui.processed_dir/<download name>`.
    #[arg(long, conflicts_with = "output")]
    save: bool,

    /// Print the display form (markdown tables repaired).
    #[arg(long)]
    preview: bool,
}

impl ExtractOpts {
    fn request(&self, extractor: &Extractor) -> Result<ExtractRequest> {
        let request = ExtractRequest {
            prompt_text: self.prompt_text.clone().unwrap_or_default(),
            file_ext: self.ext.clone().unwrap_or_default(),
            provider: self.provider.clone(),
        };
        extractor
            .resolve_request(request, self.prompt.as_deref())
            .context("Invalid prompt selection")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback a one-shot run needs; keep library
    // INFO logs for `serve`, where there is no spinner.
    let one_shot = matches!(cli.command, Command::File { .. } | Command::Summary { .. });
    let show_progress = one_shot && !cli.quiet && !cli.no_progress;
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

    let config = Config::load_with_secrets(&cli.config, cli.secrets.as_ref())
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    match cli.command {
        Command::Serve { ref bind } => {
            let bind = bind.clone().unwrap_or_else(|| config.server.bind.clone());
            let extractor = Extractor::new(config).context("Failed to initialise providers")?;
            if !cli.quiet {
                eprintln!("{} listening on {}", green("✔"), bold(&format!("http://{bind}")));
            }
            server::run_server(Arc::new(extractor), &bind)
                .await
                .context("Server stopped")?;
        }

        Command::Prompts => {
            let catalog = PromptCatalog::from_config(&config);
            let default = catalog.default_prompt().map(|p| p.id.clone());
            for name in catalog.sorted_names() {
                if let Some(spec) = catalog.by_name(name) {
                    let marker = if default.as_deref() == Some(spec.id.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        "{marker} {:<24} {:<10} {:<8} {}",
                        spec.name,
                        spec.id,
                        spec.provider,
                        spec.file_ext
                    );
                }
            }
        }

        Command::File { ref path, ref opts } => {
            if is_url(&path.to_string_lossy()) {
                anyhow::bail!("{} is a URL; use `extract summary` for web pages", path.display());
            }
            let extractor = build_extractor(config, show_progress)?;
            if let Some(spec) = opts.prompt.as_deref().and_then(|p| extractor.prompts().lookup(p)) {
                if spec.requires_url() {
                    anyhow::bail!(
                        "prompt '{}' runs on a web page; use `extract summary`",
                        spec.name
                    );
                }
            }
            let request = opts.request(&extractor)?;
            let source = SourceContent::from_path(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let output = extractor
                .process_document(&source, &request)
                .await
                .context("Extraction failed")?;
            emit(&extractor, &output, opts, cli.quiet).await?;
        }

        Command::Summary { ref url, ref opts } => {
            let extractor = build_extractor(config, show_progress)?;
            let request = opts.request(&extractor)?;
            let output = extractor
                .process_url(url, &request)
                .await
                .context("Extraction failed")?;
            emit(&extractor, &output, opts, cli.quiet).await?;
        }
    }

    Ok(())
}

fn build_extractor(config: Config, show_progress: bool) -> Result<Extractor> {
    let extractor = Extractor::new(config).context("Failed to initialise providers")?;
    Ok(if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        extractor.with_progress(cb)
    } else {
        extractor
    })
}

/// Write the result to `-o`, the processed dir, or stdout.
async fn emit(
    extractor: &Extractor,
    output: &SanitizedOutput,
    opts: &ExtractOpts,
    quiet: bool,
) -> Result<()> {
    let text = if opts.preview {
        output.preview()
    } else {
        output.text.clone()
    };

    let written = if let Some(ref path) = opts.output {
        tokio::fs::write(path, &text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Some(path.clone())
    } else if opts.save {
        let path = extractor
            .save(output)
            .await
            .context("Failed to save output")?;
        Some(path)
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
        None
    };

    if let (Some(path), false) = (written, quiet) {
        eprintln!(
            "{}  {}  →  {}",
            green("✔"),
            dim(output.content_type()),
            bold(&path.display().to_string())
        );
    }
    Ok(())
}
