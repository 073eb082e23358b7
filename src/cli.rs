use std::path::PathBuf;

use clap::Parser;

use crate::types::{RetrievalPolicy, DEFAULT_MAX_DURATION_SECS, DEFAULT_MAX_FILE_SIZE};

macro_rules! arg_env {
    ($v:literal) => {
        concat!("TGRAB_", $v)
    };
}

/// Telegram bot fetching YouTube videos on request.
/// Resolve, validate against duration/size limits, and deliver back to the chat.
#[derive(Parser, Debug)]
pub struct Args {
    /// The bot token, as handed out by BotFather
    #[clap(long, env = arg_env!("BOT_TOKEN"), hide_env_values = true)]
    pub bot_token: String,

    /// The path to the sqlite file recording download attempts
    #[clap(long, default_value = "tgrab.db", env = arg_env!("DATABASE"))]
    pub database: PathBuf,

    /// The maximum accepted video duration, in seconds
    #[clap(long, default_value_t = DEFAULT_MAX_DURATION_SECS, env = arg_env!("MAX_DURATION"))]
    pub max_duration: u64,

    /// The maximum accepted file size, in bytes
    #[clap(long, default_value_t = DEFAULT_MAX_FILE_SIZE, env = arg_env!("MAX_FILE_SIZE"))]
    pub max_file_size: u64,

    /// The number of concurrent download workers
    #[clap(long, default_value_t = 4, env = arg_env!("WORKERS"))]
    pub workers: usize,

    /// Log debug information
    #[clap(long, env = arg_env!("VERBOSE"))]
    pub verbose: bool,
}

impl Args {
    pub fn policy(&self) -> RetrievalPolicy {
        RetrievalPolicy {
            max_duration_secs: self.max_duration,
            max_file_size: self.max_file_size,
        }
    }
}
