use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser as ClapParser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use zsh_history_tail::config::{
    expand_home, read_api_key_file, Config, OpenAiConfig, DEFAULT_API_KEY_FILE,
    DEFAULT_ARCHIVE_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_QUEUE_CAPACITY, DEFAULT_SOURCE,
};
use zsh_history_tail::controller::TailController;
use zsh_history_tail::events::{forward, spawn_source_watcher, NotificationQueue, TailEvent};
use zsh_history_tail::ingest::tail::TailCursor;
use zsh_history_tail::output::OutputFileManager;
use zsh_history_tail::summary::format::MarkdownFormatter;
use zsh_history_tail::summary::openai::OpenAiSummarizer;
use zsh_history_tail::summary::{PassthroughSummarizer, Summarizer};

#[derive(ClapParser, Debug)]
#[command(
    name = "zsh-history-tail",
    about = "Explain new zsh history entries into a daily markdown journal"
)]
struct Cli {
    /// History file to tail.
    #[arg(long, env = "ZSH_HISTORY_TAIL_SOURCE", default_value = DEFAULT_SOURCE)]
    source: PathBuf,

    /// Directory holding today's journal file.
    #[arg(long, env = "ZSH_HISTORY_TAIL_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Directory that receives journal files from previous days.
    #[arg(long, env = "ZSH_HISTORY_TAIL_ARCHIVE_DIR", default_value = DEFAULT_ARCHIVE_DIR)]
    archive_dir: PathBuf,

    /// API key for the summarization service (takes precedence over the key file).
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// File containing the API key.
    #[arg(long, default_value = DEFAULT_API_KEY_FILE)]
    api_key_file: PathBuf,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,

    /// Model used for descriptions.
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Skip the summarization service and journal the raw commands.
    #[arg(long)]
    no_ai: bool,

    /// Maximum number of queued change notifications.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Log filter, e.g. `debug` or `zsh_history_tail=trace` (defaults to RUST_LOG).
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = resolve_config(&cli)?;

    if !config.source.is_file() {
        error!(path = %config.source.display(), "history file does not exist");
        eprintln!("Error: {} does not exist", config.source.display());
        return Ok(ExitCode::FAILURE);
    }

    run(config)?;
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("zsh_history_tail=info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let openai = if cli.no_ai {
        None
    } else {
        let key_file = expand_home(&cli.api_key_file);
        let file_key = read_api_key_file(&key_file)
            .wrap_err_with(|| format!("Failed to read {}", key_file.display()))?;
        let cfg = OpenAiConfig::new(cli.api_key.clone(), cli.base_url.clone(), cli.model.clone())
            .or_api_key(file_key);
        if cfg.api_key().is_none() {
            return Err(eyre!(
                "No API key: set OPENAI_API_KEY, write one to {}, or pass --no-ai",
                key_file.display()
            ));
        }
        Some(cfg)
    };

    Ok(Config {
        source: expand_home(&cli.source),
        output_dir: expand_home(&cli.output_dir),
        archive_dir: expand_home(&cli.archive_dir),
        queue_capacity: cli.queue_capacity,
        openai,
    })
}

fn run(config: Config) -> Result<()> {
    for dir in [&config.output_dir, &config.archive_dir] {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let summarizer: Box<dyn Summarizer + Send> = match &config.openai {
        Some(cfg) => Box::new(
            OpenAiSummarizer::try_from_config(cfg).wrap_err("Failed to set up summarizer")?,
        ),
        None => Box::new(PassthroughSummarizer),
    };

    let controller = TailController::new(
        TailCursor::at_end(&config.source)?,
        OutputFileManager::new(&config.output_dir, &config.archive_dir),
        summarizer,
        Box::new(MarkdownFormatter::default()),
    );

    let queue = NotificationQueue::bounded(config.queue_capacity);
    let shutdown = Arc::new(AtomicBool::new(false));

    let watcher = spawn_source_watcher(&config.source, queue.sender())
        .wrap_err_with(|| format!("Failed to watch {}", config.source.display()))?;

    let tx = queue.sender();
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        forward(&tx, TailEvent::Shutdown);
    })
    .wrap_err("Failed to install signal handler")?;

    let worker_flag = shutdown.clone();
    let worker = std::thread::Builder::new()
        .name("tail-worker".to_string())
        .spawn(move || controller.run(queue, worker_flag))
        .wrap_err("Failed to spawn tail worker")?;

    info!(
        source = %config.source.display(),
        output = %config.output_dir.display(),
        "tailing history; press Ctrl-C to stop"
    );

    if worker.join().is_err() {
        warn!("tail worker panicked");
    }
    // Releases the directory subscription.
    drop(watcher);
    Ok(())
}
