//! CodeAce CLI
//!
//! Interactive chat, one-shot runs, tag lookups, search, and the installer.

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use codeace::agent::{
    AgentGraph, AzureOpenAiClient, Checkpointer, GenerationOptions, MemoryCheckpointer, RunConfig,
    SqliteCheckpointer,
};
use codeace::config::{
    config_path, save_config, validate_config, CheckpointBackend, Config,
};
use codeace::install::{self, InstallOptions, DEFAULT_INSTALL_DIR};
use codeace::session::{
    default_history_filename, load_conversation, load_last_source, save_conversation,
    save_last_source, ChatSession, SavedPaths, SessionHandle,
};
use codeace::tools::{
    find_definitions, find_implementations, Tool, ToolRegistry, WebSearchTool, WikiSearchTool,
};
use codeace::{Error, Result, VERSION};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "codeace",
    author = "CodeAce Contributors",
    version = VERSION,
    about = "CodeAce - ask questions about a source tree",
    long_about = None
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Answer with the smaller (mini) deployment
    #[arg(long, global = true)]
    mini: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat mode
    Chat {
        /// Source directory to ask about
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// Answer a single query and exit
    Run {
        /// The question
        query: String,
        /// Continue this thread instead of starting a new one
        #[arg(short, long)]
        thread: Option<String>,
        /// Checkpoint database (overrides config)
        #[arg(long, env = "CODEACE_CHECKPOINT_DB")]
        checkpoint_db: Option<PathBuf>,
        /// Source directory (defaults to the current directory)
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// Look symbols up in a ctags file
    Tags {
        /// Lookup kind
        #[arg(value_enum)]
        kind: TagKind,
        /// Path to the ctags file
        tags_file: PathBuf,
        /// Symbols to find
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Web search
    Search {
        /// Search query
        query: String,
    },

    /// Wiki keyword search
    Wiki {
        /// Keyword
        keyword: String,
    },

    /// Manage saved source directories
    Paths {
        #[command(subcommand)]
        action: Option<PathsAction>,
    },

    /// Clone, configure and build CodeAce
    Install {
        /// Repository URL
        repo: String,
        /// Checkout directory
        #[arg(short, long, default_value = DEFAULT_INSTALL_DIR)]
        dir: PathBuf,
        /// Start a chat after installing
        #[arg(long)]
        run: bool,
    },

    /// Validate the configuration
    Check,

    /// Print (or write) a sample configuration
    InitConfig {
        /// Write to the config path instead of printing
        #[arg(long)]
        write: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TagKind {
    /// Class, function and variable definitions
    Definitions,
    /// Any reference
    Implementations,
}

#[derive(Subcommand)]
enum PathsAction {
    /// List saved paths
    List,
    /// Save a path
    Add { path: PathBuf },
    /// Forget a path
    Remove { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "codeace=debug" } else { "codeace=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Some(Commands::Chat { source }) => interactive_chat(source, cli.mini).await,
        Some(Commands::Run {
            query,
            thread,
            checkpoint_db,
            source,
        }) => run_once(&query, thread, checkpoint_db, source, cli.mini).await,
        Some(Commands::Tags {
            kind,
            tags_file,
            symbols,
        }) => lookup_tags(kind, &tags_file, &symbols),
        Some(Commands::Search { query }) => web_search(&query).await,
        Some(Commands::Wiki { keyword }) => wiki_search(&keyword).await,
        Some(Commands::Paths { action }) => manage_paths(action),
        Some(Commands::Install { repo, dir, run }) => run_install(repo, dir, run).await,
        Some(Commands::Check) => check_config(),
        Some(Commands::InitConfig { write }) => init_config(write),
        None => interactive_chat(None, cli.mini).await,
    }
}

// ============================================================================
// Prompts
// ============================================================================

/// Get the dialoguer theme
fn theme() -> ColorfulTheme {
    ColorfulTheme::default()
}

/// Prompt user for input using dialoguer
fn prompt(message: &str) -> Result<String> {
    let input: String = Input::with_theme(&theme())
        .with_prompt(message.trim())
        .allow_empty(true)
        .interact_text()?;
    Ok(input)
}

/// Prompt user for yes/no using dialoguer
fn prompt_yes_no(message: &str, default: bool) -> Result<bool> {
    Ok(Confirm::with_theme(&theme())
        .with_prompt(message.trim())
        .default(default)
        .interact()?)
}

/// Display an interactive menu with arrow key navigation
fn prompt_menu(title: &str, options: &[String], default: usize) -> Result<usize> {
    println!("\n{}", style(title).cyan().bold());
    println!("{}", style("  Use ↑/↓ arrows to navigate, Enter to select").dim());

    Ok(Select::with_theme(&theme())
        .items(options)
        .default(default)
        .interact()?)
}

fn print_ok(message: impl std::fmt::Display) {
    println!("   {} {}", style("✓").green(), message);
}

fn print_warn(message: impl std::fmt::Display) {
    println!("   {} {}", style("⚠").yellow(), message);
}

// ============================================================================
// Graph setup
// ============================================================================

/// Build the graph from config, with the configured checkpoint store
async fn build_graph(config: &Config, checkpoint_db: Option<PathBuf>, mini: bool) -> Result<AgentGraph> {
    let azure = config.provider.azure.clone().ok_or_else(|| {
        Error::Config("Azure OpenAI not configured. Set AZURE_OPENAI_ENDPOINT and AZ_OPENAI_API_KEY".into())
    })?;
    let mut client = AzureOpenAiClient::new(azure)?;
    if mini {
        client = client.mini();
    }
    debug!("Answering with deployment {}", client.deployment());
    let tools = ToolRegistry::builtin(config)?;

    let checkpointer: Arc<dyn Checkpointer> = match (config.storage.checkpoint, checkpoint_db) {
        (_, Some(path)) => Arc::new(SqliteCheckpointer::open(&path).await?),
        (CheckpointBackend::Sqlite, None) => {
            Arc::new(SqliteCheckpointer::open(&config.storage.checkpoint_db).await?)
        }
        (CheckpointBackend::Memory, None) => Arc::new(MemoryCheckpointer::new()),
    };

    let options = GenerationOptions {
        temperature: config.agent.temperature,
        ..Default::default()
    };

    Ok(AgentGraph::new(Arc::new(client), Arc::new(tools))
        .with_checkpointer(checkpointer)
        .with_options(options))
}

/// Cancel `token` on Ctrl-C until the returned task is aborted
fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}

/// Select `path` as the session source and remember it
fn select_source(session: &mut ChatSession, config: &Config, path: &Path) -> Result<()> {
    session.set_source(path)?;
    let Some(source) = session.source().map(|s| s.to_string_lossy().to_string()) else {
        return Ok(());
    };

    let mut saved = SavedPaths::load(&config.storage.saved_paths_file)?;
    if saved.add(source.clone()) {
        saved.save()?;
    }
    save_last_source(&config.storage.last_source_file, Some(&source))?;

    if !session.mapping_done() {
        print_warn(format!(
            "No {} file in {}. Run `ctags -R` there so symbol lookups work.",
            config.agent.tags_file, source
        ));
    }
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

/// Interactive chat
async fn interactive_chat(source: Option<PathBuf>, mini: bool) -> Result<()> {
    let config = Config::from_env()?;
    let graph = build_graph(&config, None, mini).await?;
    let run_config = RunConfig::from_config(&config.agent);

    println!();
    println!("{}", style("╔══════════════════════════════════════════════════╗").cyan());
    println!("{}", style("║             🧭 CodeAce Interactive Chat           ║").cyan());
    println!("{}", style("╚══════════════════════════════════════════════════╝").cyan());
    println!();

    let mut session = ChatSession::from_config(&config);

    let initial = match source {
        Some(path) => Some(path),
        None => load_last_source(&config.storage.last_source_file)?.map(PathBuf::from),
    };
    if let Some(path) = initial {
        match select_source(&mut session, &config, &path) {
            Ok(()) => print_ok(format!("Source: {}", style(path.display()).cyan())),
            Err(e) => print_warn(format!("Could not use {}: {}", path.display(), e)),
        }
    }
    if session.source().is_none() {
        choose_saved_source(&mut session, &config)?;
    }

    print_help();

    let handle = SessionHandle::new(session);

    loop {
        let user_input: String = Input::with_theme(&theme())
            .with_prompt(style("You").green().bold().to_string())
            .allow_empty(true)
            .interact_text()?;

        let input = user_input.trim();

        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            let (command, arg) = match input.split_once(char::is_whitespace) {
                Some((command, arg)) => (command, arg.trim()),
                None => (input, ""),
            };
            let mut session = handle.try_begin_turn()?;

            match command.to_lowercase().as_str() {
                "/quit" | "/exit" | "/q" => {
                    println!("\n{} Goodbye!\n", style("👋").bold());
                    break;
                }
                "/clear" | "/c" => {
                    session.reset();
                    let _ = Term::stdout().clear_screen();
                    print_ok("New chat started.\n");
                }
                "/save" => {
                    if session.messages().is_empty() {
                        print_warn("No conversation to save.\n");
                        continue;
                    }
                    let filename = if arg.is_empty() {
                        default_history_filename(chrono::Local::now())
                    } else {
                        arg.to_string()
                    };
                    match save_conversation(&config.storage.history_dir, session.messages(), &filename) {
                        Ok(path) => print_ok(format!("Conversation saved to {}\n", path.display())),
                        Err(e) => print_warn(format!("Save failed: {}\n", e)),
                    }
                }
                "/load" => match load_conversation(Path::new(arg)) {
                    Ok(messages) => {
                        session.replace_messages(messages);
                        print_ok("Conversation loaded successfully!\n");
                    }
                    Err(e) => print_warn(format!("Load failed: {}\n", e)),
                },
                "/source" => match select_source(&mut session, &config, Path::new(arg)) {
                    Ok(()) => print_ok("Source updated.\n"),
                    Err(e) => print_warn(format!("{}\n", e)),
                },
                "/paths" => choose_saved_source(&mut session, &config)?,
                "/extra" => {
                    if arg.is_empty() || arg == "off" {
                        session.set_extra_source(None);
                        print_ok("Additional source cleared.\n");
                    } else {
                        session.set_extra_source(Some(PathBuf::from(arg)));
                        print_ok(format!("Additional source selected: {}\n", arg));
                    }
                }
                "/summary" => {
                    let enabled = arg != "off";
                    session.set_use_summary_context(enabled);
                    print_ok(format!(
                        "Summary context {}.\n",
                        if enabled { "on" } else { "off" }
                    ));
                }
                "/help" | "/h" | "/?" => print_help(),
                _ => print_warn(format!("Unknown command. Type {} for help.\n", style("/help").cyan())),
            }
            continue;
        }

        let mut session = handle.try_begin_turn()?;

        print!("   {} ", style("●●●").dim());
        io::stdout().flush()?;

        let cancel = CancellationToken::new();
        let watcher = cancel_on_ctrl_c(cancel.clone());
        let result = session
            .answer(&graph, input, &run_config.clone().with_cancel(cancel))
            .await;
        watcher.abort();

        let _ = Term::stdout().clear_line();
        match result {
            Ok(reply) => println!("\n   {}: {}\n", style("CodeAce").cyan().bold(), reply),
            Err(Error::Cancelled) => println!("\n   {} Turn cancelled.\n", style("⏹").yellow()),
            Err(e) => println!("\n   {} Error: {}\n", style("❌").red(), e),
        }
    }

    Ok(())
}

fn print_help() {
    println!();
    println!("   {}", style("Commands:").cyan().bold());
    println!("   {}            - Exit chat", style("/quit").yellow());
    println!("   {}           - Start a new chat", style("/clear").yellow());
    println!("   {}    - Save the conversation", style("/save [file]").yellow());
    println!("   {}     - Load a saved conversation", style("/load <file>").yellow());
    println!("   {}   - Select the source directory", style("/source <dir>").yellow());
    println!("   {}           - Pick a saved source directory", style("/paths").yellow());
    println!("   {} - Additional source directory", style("/extra <dir|off>").yellow());
    println!("   {} - Replay earlier turns on new threads", style("/summary on|off").yellow());
    println!("   {}            - Show this help", style("/help").yellow());
    println!();
}

/// Let the user pick one of the saved source directories
fn choose_saved_source(session: &mut ChatSession, config: &Config) -> Result<()> {
    let saved = SavedPaths::load(&config.storage.saved_paths_file)?;
    if saved.is_empty() {
        print_warn("No saved paths yet. Use /source <dir> to select one.\n");
        return Ok(());
    }

    let mut options: Vec<String> = saved.paths().to_vec();
    options.push("Keep current selection".to_string());
    let choice = prompt_menu("Select a source directory", &options, 0)?;

    if let Some(path) = saved.paths().get(choice) {
        match select_source(session, config, Path::new(path)) {
            Ok(()) => print_ok(format!("Source: {}\n", style(path).cyan())),
            Err(e) => print_warn(format!("{}\n", e)),
        }
    }
    Ok(())
}

/// One query, optionally continuing a checkpointed thread
async fn run_once(
    query: &str,
    thread: Option<String>,
    checkpoint_db: Option<PathBuf>,
    source: Option<PathBuf>,
    mini: bool,
) -> Result<()> {
    let config = Config::from_env()?;
    let graph = build_graph(&config, checkpoint_db, mini).await?;

    let mut session = ChatSession::from_config(&config);
    if let Some(thread) = thread {
        session = session.with_thread_id(thread);
    }
    let source = match source {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    session.set_source(&source)?;

    let cancel = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(cancel.clone());
    let result = session
        .answer(
            &graph,
            query,
            &RunConfig::from_config(&config.agent).with_cancel(cancel),
        )
        .await;
    watcher.abort();

    let reply = result?;
    println!("{}", reply);
    eprintln!("{} {}", style("thread:").dim(), session.thread_id());
    Ok(())
}

/// ctags lookup, printed as JSON
fn lookup_tags(kind: TagKind, tags_file: &Path, symbols: &[String]) -> Result<()> {
    let found = match kind {
        TagKind::Definitions => find_definitions(symbols, tags_file)?,
        TagKind::Implementations => find_implementations(symbols, tags_file)?,
    };
    let sorted: BTreeMap<_, _> = found.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&sorted)?);
    Ok(())
}

async fn web_search(query: &str) -> Result<()> {
    let config = Config::from_env()?;
    let tool = WebSearchTool::new(config.search.clone())?;
    let output = tool.execute(serde_json::json!({ "query": query })).await?;
    println!("{}", output.into_text());
    Ok(())
}

async fn wiki_search(keyword: &str) -> Result<()> {
    let config = Config::from_env()?;
    let tool = WikiSearchTool::from_config(&config.wiki)?
        .ok_or_else(|| Error::Config("Wiki not configured. Set WIKI_BASE_URL".into()))?;
    let output = tool.execute(serde_json::json!({ "key_word": keyword })).await?;
    println!("{}", output.into_text());
    Ok(())
}

fn manage_paths(action: Option<PathsAction>) -> Result<()> {
    let config = Config::from_env()?;
    let mut saved = SavedPaths::load(&config.storage.saved_paths_file)?;

    match action.unwrap_or(PathsAction::List) {
        PathsAction::List => {
            if saved.is_empty() {
                println!("   {}", style("No saved paths.").dim());
            }
            for path in saved.paths() {
                println!("   {}", path);
            }
        }
        PathsAction::Add { path } => {
            let path = path
                .canonicalize()
                .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))?;
            if saved.add(path.to_string_lossy()) {
                saved.save()?;
                print_ok(format!("Saved {}", path.display()));
            } else {
                print_warn(format!("{} is already saved", path.display()));
            }
        }
        PathsAction::Remove { path } => {
            if saved.remove(&path) {
                saved.save()?;
                if load_last_source(&config.storage.last_source_file)?.as_deref() == Some(path.as_str()) {
                    save_last_source(&config.storage.last_source_file, None)?;
                }
                print_ok(format!("Removed {}", path));
            } else {
                print_warn(format!("{} was not saved", path));
            }
        }
    }
    Ok(())
}

async fn run_install(repo: String, dir: PathBuf, run: bool) -> Result<()> {
    println!("{}", style("Starting CodeAce installation...").cyan().bold());

    let options = InstallOptions {
        install_dir: dir,
        run_after: false,
        ..InstallOptions::new(repo)
    };
    install::install(&options, |name| prompt(&format!("Enter value for {}", name))).await?;
    print_ok("Installation completed!");

    if run || prompt_yes_no("Would you like to run the application now?", false)? {
        install::launch(&options.install_dir).await?;
    }
    Ok(())
}

fn check_config() -> Result<()> {
    let config = Config::from_env()?;
    let result = validate_config(&config);

    for issue in &result.errors {
        println!("   {} {}: {}", style("❌").red(), issue.path, issue.message);
        if let Some(ref suggestion) = issue.suggestion {
            println!("      {}", style(suggestion).dim());
        }
    }
    for issue in &result.warnings {
        print_warn(format!("{}: {}", issue.path, issue.message));
    }

    if result.valid {
        print_ok("Configuration is valid");
        Ok(())
    } else {
        Err(Error::Config(format!("{} configuration error(s)", result.errors.len())))
    }
}

/// Generate sample configuration
fn init_config(write: bool) -> Result<()> {
    let config = Config::default();

    if write {
        let path = config_path();
        if path.exists() && !prompt_yes_no(&format!("{} exists. Overwrite?", path.display()), false)? {
            warn!("Keeping existing config at {}", path.display());
            return Ok(());
        }
        save_config(&config, &path)?;
        print_ok(format!("Wrote {}", path.display()));
    } else {
        debug!("Printing default config");
        println!("{}", serde_json::to_string_pretty(&config)?);
    }
    Ok(())
}
