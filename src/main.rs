//! quizforge CLI - turn a PDF into a three-level multiple-choice quiz.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use quizforge::{AppState, Config, HealthStatus, LLMClient, QuizPipeline, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "quizforge")]
#[command(version)]
#[command(about = "Generate and take multiple-choice quizzes from PDF study material")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web UI
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Generate a quiz from a PDF without the web UI
    Generate {
        /// Path to the PDF file
        #[arg(short, long)]
        pdf: PathBuf,

        /// Questions per difficulty level
        #[arg(short = 'n', long)]
        per_level: Option<usize>,

        /// Chunk size in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Overlap between chunks in characters
        #[arg(long)]
        chunk_overlap: Option<usize>,

        /// Write quiz JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate {
        /// Also check that the LLM endpoint is reachable
        #[arg(long)]
        ping: bool,
    },

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn print_example_config() {
    let example = r#"# quizforge configuration file

[llm]
# API key (can also use the env var named by api_key_env)
# api_key = "${OPENAI_API_KEY}"
api_key_env = "OPENAI_API_KEY"
base_url = "https://api.openai.com/v1"
timeout_secs = 180
max_retries = 3
json_mode = true   # ask for a JSON object response

[llm.model]
id = "gpt-4o-mini"
max_tokens = 4096
temperature = 0.7

# [llm.headers]
# X-Title = "quizforge"

[chunking]
chunk_size = { min = 800, max = 2400, step = 100, default = 1200 }
chunk_overlap = { min = 100, max = 600, step = 20, default = 240 }

[quiz]
questions_per_level = { min = 3, max = 8, step = 1, default = 5 }
sample_chunks = 3        # leading chunks sent to the model
generation_attempts = 2  # model calls allowed on malformed output

[server]
bind = "127.0.0.1:8501"
max_upload_bytes = 26214400
session_idle_minutes = 120
"#;
    println!("{example}");
}

fn load_config(path: &PathBuf) -> Result<Config> {
    Config::load_or_default(path).with_context(|| format!("Failed to load config from {path:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Example => {
            print_example_config();
            return Ok(());
        }

        Commands::Validate { ping } => {
            let config = load_config(&cli.config)?;
            let client = LLMClient::from_config(&config).context("Failed to resolve API key")?;

            info!("Configuration is valid");
            info!("  Model: {} (temperature {})", config.llm.model.id, config.llm.model.temperature);
            info!("  Endpoint: {}", client.base_url());
            info!(
                "  Chunking: size {} / overlap {}",
                config.chunking.chunk_size.default, config.chunking.chunk_overlap.default
            );
            info!(
                "  Questions per level: {} ({}-{})",
                config.quiz.questions_per_level.default,
                config.quiz.questions_per_level.min,
                config.quiz.questions_per_level.max
            );
            info!("  Generation attempts: {}", config.quiz.generation_attempts);

            if ping {
                let health = client.health_check().await;
                match health.status {
                    HealthStatus::Healthy => info!(
                        latency_ms = health.latency_ms.unwrap_or_default(),
                        "LLM endpoint is healthy"
                    ),
                    status => warn!(
                        %status,
                        error = health.error.as_deref().unwrap_or(""),
                        "LLM endpoint check failed"
                    ),
                }
            }
        }

        Commands::Serve { bind } => {
            let config = load_config(&cli.config)?;
            let client = Arc::new(LLMClient::from_config(&config).context("Failed to create LLM client")?);
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());

            info!(model = %config.llm.model.id, "Starting quizforge web UI");
            quizforge::web::run(AppState::new(config, client), &bind)
                .await
                .context("Web server failed")?;
        }

        Commands::Generate {
            pdf,
            per_level,
            chunk_size,
            chunk_overlap,
            output,
        } => {
            let config = load_config(&cli.config)?;
            let client = Arc::new(LLMClient::from_config(&config).context("Failed to create LLM client")?);

            let defaults = Settings::defaults(&config);
            let settings = Settings {
                chunk_size: chunk_size.unwrap_or(defaults.chunk_size),
                chunk_overlap: chunk_overlap.unwrap_or(defaults.chunk_overlap),
                questions_per_level: per_level.unwrap_or(defaults.questions_per_level),
            }
            .clamped(&config);

            let bytes = QuizPipeline::load_pdf(&pdf)
                .with_context(|| format!("Failed to read {pdf:?}"))?;
            let pipeline = QuizPipeline::from_config(client.clone(), &config);

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                    .context("Invalid spinner template")?,
            );
            spinner.set_message(format!(
                "Generating {} questions per level with {}",
                settings.questions_per_level,
                pipeline.generator().model_id()
            ));
            spinner.enable_steady_tick(Duration::from_millis(120));

            let result = pipeline.run(&bytes, &settings).await;
            spinner.finish_and_clear();
            let generated = result.context("Quiz generation failed")?;

            let json = serde_json::to_string_pretty(&generated.quiz)
                .context("Failed to serialize quiz")?;
            match &output {
                Some(path) => std::fs::write(path, &json)
                    .with_context(|| format!("Failed to write {path:?}"))?,
                None => println!("{json}"),
            }

            eprintln!("\n=== Quiz Generated ===");
            eprintln!("Questions:   {}", generated.quiz.total_questions());
            eprintln!("Material:    {}", generated.material.info());
            let (tokens_in, tokens_out) = client.total_tokens();
            eprintln!("Tokens:      {tokens_in} in / {tokens_out} out");
            if let Some(path) = output {
                eprintln!("Output:      {path:?}");
            }
        }
    }

    Ok(())
}
