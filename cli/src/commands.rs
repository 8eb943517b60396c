//! CLI command definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use streamchat_application::ParamsPatch;

/// CLI arguments for streamchat
#[derive(Parser, Debug)]
#[command(name = "streamchat")]
#[command(author, version, about = "Stream chat completions from an OpenAI-compatible endpoint")]
#[command(long_about = r#"
streamchat sends a conversation to a chat completions endpoint and prints the
reply as it streams in. Press Ctrl-C to stop a reply early.

Without a prompt it starts an interactive session that keeps the
conversation (and its history on disk) between turns.

Configuration is merged from (highest priority first):
1. STREAMCHAT_* environment variables (e.g. STREAMCHAT_GATEWAY__API_KEY)
2. --config <path>                         Explicit config file
3. ./streamchat.toml                       Project-level config
4. ~/.config/streamchat/config.toml        Global config

Example:
  streamchat "Explain ownership in one paragraph"
  streamchat -m accounts/fireworks/models/mixtral-8x7b-instruct -t 0.2
  streamchat settings set --max-tokens 512
  streamchat history show
"#)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Prompt to send (starts an interactive session when omitted)
    pub prompt: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub params: ParamsArgs,

    /// Do not load or save history for this run
    #[arg(long)]
    pub no_history: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress stream metrics
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

/// Per-request parameter overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ParamsArgs {
    /// Model identifier
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(short, long, value_name = "TEMP")]
    pub temperature: Option<f32>,

    /// Maximum number of generated tokens
    #[arg(long, value_name = "N")]
    pub max_tokens: Option<u32>,
}

impl ParamsArgs {
    pub fn to_patch(&self) -> ParamsPatch {
        ParamsPatch {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect or delete the saved conversation
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Inspect or change stored request settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// Print the saved conversation
    Show,
    /// Delete the saved conversation
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the effective request settings
    Show,
    /// Store overrides for future requests
    Set(ParamsArgs),
    /// Remove stored overrides
    Clear,
}
