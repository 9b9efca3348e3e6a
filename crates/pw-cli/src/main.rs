mod input;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pw_core::{InputOrder, Settings, Stack, present};
use pw_store::WordStore;
use uuid::Uuid;

use crate::input::{load_completions, load_panes, load_settings, parse_capture};

#[derive(Parser)]
#[command(name = "pw", about = "Pane word index and completion result shaping")]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, env = "PW_CONFIG")]
    config: Option<PathBuf>,

    /// Override the store location (`:memory:` or a file path)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index panes, then look up words by prefix
    Search {
        #[command(flatten)]
        panes: PaneArgs,

        /// Pane the user is working in; its words rank first
        #[arg(long)]
        active_pane: String,

        /// Number of leading characters of WORD to match on
        #[arg(long)]
        prefix_len: usize,

        /// The word being typed
        word: String,
    },

    /// Rank, deduplicate and print completions as menu records (JSON lines)
    Present {
        /// JSON list of completions
        #[arg(long)]
        completions: PathBuf,

        /// Correlation id of the request (random if omitted)
        #[arg(long)]
        uid: Option<Uuid>,
    },

    /// Index panes and show store statistics
    Stats {
        #[command(flatten)]
        panes: PaneArgs,
    },
}

#[derive(clap::Args)]
struct PaneArgs {
    /// JSON object mapping pane id to its words
    #[arg(long)]
    panes: Option<PathBuf>,

    /// Raw pane capture to tokenize, as ID=PATH (repeatable)
    #[arg(long = "capture", value_parser = parse_capture)]
    captures: Vec<(String, PathBuf)>,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

/// Collate words in the user's locale.
fn init_locale() {
    // SAFETY: called once from `main` while the process is still
    // single-threaded.
    let applied = unsafe { libc::setlocale(libc::LC_COLLATE, c"".as_ptr()) };
    if applied.is_null() {
        tracing::warn!("could not apply LC_COLLATE from the environment, using C ordering");
    }
}

fn settings(cli: &Cli) -> Result<Settings> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        settings.store.location = db.clone();
    }
    Ok(settings)
}

async fn open_store(settings: &Settings) -> Result<WordStore> {
    WordStore::open(&settings.store.location)
        .await
        .with_context(|| format!("failed to open word store at {}", settings.store.location))
}

async fn index_panes(store: &WordStore, settings: &Settings, panes: &PaneArgs) -> Result<()> {
    let map = load_panes(
        panes.panes.as_deref(),
        &panes.captures,
        &settings.match_options.unifying_chars,
    )?;
    store.refresh(map).await.context("failed to refresh panes")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    // before the runtime exists, so no other thread is running yet
    init_locale();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?
        .block_on(run(&cli))
}

async fn run(cli: &Cli) -> Result<()> {
    let settings = settings(cli)?;

    match &cli.command {
        Commands::Search {
            panes,
            active_pane,
            prefix_len,
            word,
        } => cmd_search(&settings, panes, active_pane, *prefix_len, word).await,
        Commands::Present { completions, uid } => {
            cmd_present(&settings, completions, *uid).await
        }
        Commands::Stats { panes } => cmd_stats(&settings, panes).await,
    }
}

async fn cmd_search(
    settings: &Settings,
    panes: &PaneArgs,
    active_pane: &str,
    prefix_len: usize,
    word: &str,
) -> Result<()> {
    let store = open_store(settings).await?;
    index_panes(&store, settings, panes).await?;

    let words = store
        .search(prefix_len, word, active_pane)
        .await
        .context("search failed")?;

    if words.is_empty() {
        println!("(no matches)");
    }
    for w in &words {
        println!("{w}");
    }
    Ok(())
}

async fn cmd_present(settings: &Settings, path: &Path, uid: Option<Uuid>) -> Result<()> {
    let completions = load_completions(path)?;
    let store = open_store(settings).await?;
    let reader = store.reader();

    let context = match uid {
        Some(uid) => pw_core::Context::with_uid(uid),
        None => pw_core::Context::new(),
    };
    let stack = Stack {
        settings,
        db: &reader,
    };

    let total = completions.len();
    let mut shown = 0usize;
    for record in present(&stack, &InputOrder, &context, completions) {
        let record = record.context("ranking failed")?;
        println!("{}", serde_json::to_string(&record)?);
        shown += 1;
    }
    tracing::debug!("presented {shown} of {total} candidates");
    Ok(())
}

async fn cmd_stats(settings: &Settings, panes: &PaneArgs) -> Result<()> {
    let store = open_store(settings).await?;
    index_panes(&store, settings, panes).await?;

    let stats = store.stats().await.context("failed to read stats")?;
    println!("location: {}", settings.store.location);
    println!("panes:    {}", stats.panes);
    println!("words:    {}", stats.words);
    Ok(())
}
