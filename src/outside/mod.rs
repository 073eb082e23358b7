mod command;
mod telegram;
mod ytdl;

pub use telegram::{ChatId, Messenger, MessageId, Telegram};
pub use ytdl::{FetchOptions, MediaSource, Ytdl};
