use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use keypool_core::models::{KeyListQuery, Provider};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keypool")]
#[command(version, about = "KeyPool - LLM API key balance checker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// KeyPool server URL; without it the local database is used directly
    #[arg(long, global = true, env = "KEYPOOL_SERVER_URL")]
    pub server: Option<String>,

    /// Database path (defaults to ~/.keypool/keypool.db)
    #[arg(long, global = true, env = "KEYPOOL_DB_PATH")]
    pub db_path: Option<String>,

    /// Admin token for the admin commands when talking to a server
    #[arg(long, global = true, env = "KEYPOOL_ADMIN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the balance of one or more API keys
    Check {
        /// Provider: deepseek, openai, volcengine, qwen or siliconflow
        #[arg(short, long)]
        provider: Option<Provider>,

        /// Keys to check; newline or comma separated lists are split
        keys: Vec<String>,

        /// Read keys from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Save valid keys to the shared pool after checking
        #[arg(long)]
        save: bool,

        /// Skip the confirmation prompt when saving
        #[arg(short, long)]
        yes: bool,

        /// Print the keys that checked successfully, one per line
        #[arg(long)]
        copy_valid: bool,
    },

    /// Local lookup history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// Browse and add to the shared key pool
    Keys {
        #[command(subcommand)]
        command: KeysCommands,
    },

    /// Manage stored keys
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// Show recent lookups, newest first
    List {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Remove all history entries
    Clear,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct ListArgs {
    /// Only show keys of this provider
    #[arg(short, long)]
    pub provider: Option<Provider>,

    /// Case-insensitive substring of the key
    #[arg(short, long)]
    pub search: Option<String>,

    /// Page number, starting at 1
    #[arg(long)]
    pub page: Option<usize>,

    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Subcommand)]
pub enum KeysCommands {
    /// List the shared pool with masked keys
    List(ListArgs),
    /// Add a key by hand
    Add {
        #[arg(short, long)]
        provider: Provider,
        key: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        balance: Option<f64>,
        #[arg(long)]
        currency: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// List stored keys in full
    List(ListArgs),
    /// Delete a stored key
    Delete { id: String },
    /// Re-check the balance of one stored key
    Refresh { id: String },
    /// Re-check every key on one page of the admin list
    RefreshPage(ListArgs),
    /// Edit fields of a stored key
    Edit {
        id: String,
        #[arg(long)]
        provider: Option<Provider>,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        balance: Option<f64>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
}

impl ListArgs {
    pub fn to_query(&self) -> KeyListQuery {
        KeyListQuery {
            provider: self.provider,
            search: self.search.clone(),
            page: self.page,
            page_size: self.page_size,
        }
    }
}
