//! CLI command definitions and parsing
use crate::error::{RepoChatError, Result};
use crate::retrieval;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "repochat",
    version,
    author = "neur0map",
    about = "Chat with a public git repository using a local model",
    long_about = "repochat clones a public repository, indexes its text with a local embedding \
                  model and answers questions about it with a model served by Ollama. Nothing \
                  leaves the machine except the repository fetch."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/repochat/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration profile to apply
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat about a repository
    Chat {
        /// Repository URL (e.g. https://github.com/owner/name)
        #[arg(short, long)]
        repo: String,

        /// Ollama model to answer with (defaults to llm.model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Ask a single question and print the answer
    Ask {
        /// Repository URL
        #[arg(short, long)]
        repo: String,

        /// Question to ask
        question: String,

        /// Ollama model to answer with (defaults to llm.model)
        #[arg(short, long)]
        model: Option<String>,

        /// Number of context chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the answer and index summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Index a repository and report what was built
    Index {
        /// Repository URL
        #[arg(short, long)]
        repo: String,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section (e.g. "llm")
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// Commands understood inside the chat loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Ask(String),
    Reindex,
    Clear,
    History,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Ask(line.to_string());
        };
        match command.split_whitespace().next().unwrap_or_default() {
            "reindex" => Self::Reindex,
            "clear" => Self::Clear,
            "history" => Self::History,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl Commands {
    /// Reject arguments that would only fail after the repository is indexed
    pub fn check(&self) -> Result<()> {
        if let Self::Ask {
            question, top_k, ..
        } = self
        {
            retrieval::validate_query(question)?;
            if *top_k == Some(0) {
                return Err(RepoChatError::InvalidConfigValue {
                    path: "retrieval.top_k".to_string(),
                    message: "Top K must be greater than 0".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from([
            "repochat",
            "--profile",
            "offline",
            "ask",
            "--repo",
            "https://github.com/owner/name",
            "What does main do?",
            "-k",
            "3",
        ]);
        assert_eq!(cli.profile.as_deref(), Some("offline"));
        match cli.command {
            Commands::Ask {
                repo,
                question,
                top_k,
                json,
                ..
            } => {
                assert_eq!(repo, "https://github.com/owner/name");
                assert_eq!(question, "What does main do?");
                assert_eq!(top_k, Some(3));
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ask_arguments_checked_up_front() {
        let ask = |question: &str, k: &str| {
            Cli::parse_from([
                "repochat",
                "ask",
                "--repo",
                "https://github.com/owner/name",
                question,
                "-k",
                k,
            ])
            .command
        };

        assert!(ask("What does main do?", "3").check().is_ok());
        assert!(matches!(
            ask("   ", "3").check(),
            Err(RepoChatError::InvalidQuery(_))
        ));
        assert!(matches!(
            ask("What does main do?", "0").check(),
            Err(RepoChatError::InvalidConfigValue { .. })
        ));

        let index = Cli::parse_from(["repochat", "index", "--repo", "https://github.com/o/n"]);
        assert!(index.command.check().is_ok());
    }

    #[test]
    fn test_repl_commands() {
        assert_eq!(ReplCommand::parse("  "), ReplCommand::Empty);
        assert_eq!(ReplCommand::parse("/quit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("/reindex now"), ReplCommand::Reindex);
        assert_eq!(ReplCommand::parse("/clear"), ReplCommand::Clear);
        assert_eq!(
            ReplCommand::parse(" how does auth work? "),
            ReplCommand::Ask("how does auth work?".to_string())
        );
        assert_eq!(
            ReplCommand::parse("/frobnicate"),
            ReplCommand::Unknown("frobnicate".to_string())
        );
    }
}
