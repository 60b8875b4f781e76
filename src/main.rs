use repochat::cli::{Cli, Commands, ConfigAction, ReplCommand};
use repochat::config::{Config, ConfigValidator};
use repochat::error::{RepoChatError, Result};
use repochat::pipeline::run_query;
use repochat::session::{ChatSession, Role};
use repochat::{DefaultRepoChat, IndexSummary, QueryOutcome};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    cli.command.check()?;

    match cli.command {
        Commands::Chat { repo, model } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_chat(config, &repo, model).await
        }
        Commands::Ask {
            repo,
            question,
            model,
            top_k,
            json,
        } => {
            let mut config = load_config(cli.config, cli.profile)?;
            if let Some(k) = top_k {
                config.retrieval.top_k = k;
                ConfigValidator::validate(&config)?;
            }
            cmd_ask(config, &repo, &question, model, json).await
        }
        Commands::Index { repo, json } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_index(config, &repo, json).await
        }
        Commands::Config { action } => cmd_config(cli.config, cli.profile, action),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("repochat=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("repochat=info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn report_error(e: &RepoChatError) {
    eprintln!("✗ {e}");
    if let Some(hint) = e.hint() {
        eprintln!("  hint: {hint}");
    }
}

/// Build the pipeline off the async workers; the embedding model may be
/// downloaded here
async fn build_pipeline(config: Config) -> Result<DefaultRepoChat> {
    tokio::task::spawn_blocking(move || DefaultRepoChat::from_config(config))
        .await
        .map_err(|e| RepoChatError::Other(anyhow::anyhow!("Startup task failed: {e}")))?
}

async fn cmd_index(config: Config, repo: &str, json: bool) -> Result<()> {
    let chat = build_pipeline(config).await?;
    let summary = chat.load(repo).await?;

    if json {
        println!("{}", to_json(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

#[derive(Serialize)]
struct AskOutput<'a> {
    repository: &'a str,
    model: &'a str,
    question: &'a str,
    answer: String,
    index: IndexSummary,
}

async fn cmd_ask(
    config: Config,
    repo: &str,
    question: &str,
    model: Option<String>,
    json: bool,
) -> Result<()> {
    let model = model.unwrap_or_else(|| config.llm.model.clone());
    let timeout_secs = config.llm.timeout_secs;
    let chat = build_pipeline(config).await?;

    chat.check_model(&model).await?;
    let summary = chat.load(repo).await?;
    if !json {
        print_summary(&summary);
    }

    let mut session = ChatSession::new();
    let answer = match ask_once(&chat, &mut session, repo, question, &model, timeout_secs, !json).await? {
        QueryOutcome::Answered(answer) => answer,
        QueryOutcome::Cancelled => String::new(),
    };

    if json {
        let key = summary.key.clone();
        let output = AskOutput {
            repository: &key,
            model: &model,
            question,
            answer,
            index: summary,
        };
        println!("{}", to_json(&output)?);
    }
    Ok(())
}

async fn cmd_chat(config: Config, repo: &str, model: Option<String>) -> Result<()> {
    let model = model.unwrap_or_else(|| config.llm.model.clone());
    let timeout_secs = config.llm.timeout_secs;
    let chat = build_pipeline(config).await?;

    if let Err(e) = chat.check_model(&model).await {
        report_error(&e);
    }

    println!("Indexing {} ...", repo);
    let summary = chat.load(repo).await?;
    print_summary(&summary);
    println!("Ask anything about the repository. /help lists commands.");

    let mut session = ChatSession::new();
    tracing::debug!("Chat session {} started", session.id);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        flush_stdout();

        let line = tokio::select! {
            line = lines.next_line() => line.map_err(|e| RepoChatError::Io {
                source: e,
                context: "Failed to read input".to_string(),
            })?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            ReplCommand::Help => print_help(),
            ReplCommand::Clear => {
                session.clear();
                println!("✓ Conversation cleared");
            }
            ReplCommand::History => print_history(&session),
            ReplCommand::Reindex => {
                println!("Re-indexing {} ...", repo);
                tokio::select! {
                    result = chat.reindex(repo) => match result {
                        Ok(summary) => print_summary(&summary),
                        Err(e) => report_error(&e),
                    },
                    _ = tokio::signal::ctrl_c() => {
                        println!("[reindex cancelled, previous index kept]");
                    }
                }
            }
            ReplCommand::Unknown(command) => {
                println!("Unknown command: /{command} (try /help)");
            }
            ReplCommand::Ask(question) => {
                if let Err(e) =
                    ask_once(&chat, &mut session, repo, &question, &model, timeout_secs, true).await
                {
                    report_error(&e);
                }
            }
        }
    }

    Ok(())
}

/// Ask one question, streaming fragments to stdout when `echo` is set.
///
/// Ctrl-C cancels the answer at any point of the cycle.
async fn ask_once(
    chat: &DefaultRepoChat,
    session: &mut ChatSession,
    repo: &str,
    question: &str,
    model: &str,
    timeout_secs: u64,
    echo: bool,
) -> Result<QueryOutcome> {
    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let outcome = run_query(
        chat,
        session,
        repo,
        question,
        model,
        Duration::from_secs(timeout_secs),
        cancel,
        |fragment| {
            if echo {
                print!("{fragment}");
                flush_stdout();
            }
        },
    )
    .await;

    if echo {
        match &outcome {
            Ok(QueryOutcome::Cancelled) => println!("\n[cancelled]"),
            Ok(QueryOutcome::Answered(_)) => println!(),
            Err(_) => {}
        }
    }
    outcome
}

fn print_summary(summary: &IndexSummary) {
    let source = if summary.cached { "cached" } else { "built" };
    println!(
        "✓ {} indexed: {} chunks ({}D, {}) [{} in {}ms]",
        summary.key,
        summary.chunks,
        summary.dimension,
        summary.embedding_model,
        source,
        summary.duration_ms
    );
}

fn print_history(session: &ChatSession) {
    if session.is_empty() {
        println!("(no messages yet)");
        return;
    }
    for turn in session.history() {
        let who = match turn.role {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::Error => "error",
        };
        println!("[{}] {}: {}", turn.at.format("%H:%M:%S"), who, turn.text.trim());
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /reindex   rebuild the repository index");
    println!("  /clear     clear the conversation");
    println!("  /history   show the conversation so far");
    println!("  /quit      leave the chat");
    println!("Anything else is sent as a question. Ctrl-C cancels an answer in progress.");
}

fn flush_stdout() {
    std::io::stdout().flush().ok();
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| RepoChatError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, profile)?;
            let value = serde_json::to_value(&config).map_err(|e| RepoChatError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            let shown = match section {
                Some(section) => value.get(&section).cloned().ok_or_else(|| {
                    RepoChatError::Config(format!("Unknown config section: {section}"))
                })?,
                None => value,
            };
            println!("{}", to_json(&shown)?);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| RepoChatError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'repochat config init' to create one."
        );
        let mut config = Config::default();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}
