use std::{path::Path, time::Duration};

use miette::{Context, IntoDiagnostic};
use reqwest::blocking::{multipart, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use crate::result::{bail, Result};

/// Seconds the `getUpdates` call blocks server-side waiting for traffic.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Generous ceiling for the multipart video upload.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub type ChatId = i64;
pub type MessageId = i64;

/// Interface for delivering messages and media back to the user
pub trait Messenger: Sync {
    /// Post a text message, returning its id so it can be edited later.
    fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId>;

    /// Replace the text of a previously posted message.
    fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<()>;

    /// Upload a video file with its caption.
    fn send_video(&self, chat: ChatId, video: &Path, caption: &str) -> Result<()>;
}

/// Interface for the [Telegram Bot API](https://core.telegram.org/bots/api)
pub struct Telegram {
    client: Client,
    base: String,
}

impl Telegram {
    /// Build the client and verify the token against `getMe`.
    pub fn new(token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .into_diagnostic()
            .wrap_err("Could not build the HTTP client")?;

        let telegram = Self {
            client,
            base: format!("https://api.telegram.org/bot{token}"),
        };

        let me: BotProfile = telegram.call("getMe", &[], None)?;
        info!(
            "Authorized as @{}",
            me.username.as_deref().unwrap_or("<unnamed bot>")
        );

        Ok(telegram)
    }

    /// Long-poll for inbound updates starting at the given offset.
    pub fn next_updates(&self, offset: i64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &[
                ("offset", offset.to_string()),
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
            ],
            // The request must outlive the server-side poll window
            Some(Duration::from_secs(POLL_TIMEOUT_SECS + 10)),
        )
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> Result<T> {
        let mut req = self.client.post(format!("{}/{method}", self.base));
        if !params.is_empty() {
            req = req.form(params);
        }
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }

        let reply: ApiReply<T> = req
            .send()
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not reach the Bot API ({method})"))?
            .json()
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not decode the Bot API reply ({method})"))?;

        reply.into_result(method)
    }
}

impl Messenger for Telegram {
    fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId> {
        let posted: Posted = self.call(
            "sendMessage",
            &[("chat_id", chat.to_string()), ("text", text.to_string())],
            None,
        )?;
        Ok(posted.message_id)
    }

    fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<()> {
        let _: serde_json::Value = self.call(
            "editMessageText",
            &[
                ("chat_id", chat.to_string()),
                ("message_id", message.to_string()),
                ("text", text.to_string()),
            ],
            None,
        )?;
        Ok(())
    }

    fn send_video(&self, chat: ChatId, video: &Path, caption: &str) -> Result<()> {
        let form = multipart::Form::new()
            .text("chat_id", chat.to_string())
            .text("caption", caption.to_string())
            .text("supports_streaming", "true")
            .file("video", video)
            .into_diagnostic()
            .wrap_err("Could not read the video file for upload")?;

        let reply: ApiReply<serde_json::Value> = self
            .client
            .post(format!("{}/sendVideo", self.base))
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .into_diagnostic()
            .wrap_err("Could not reach the Bot API (sendVideo)")?
            .json()
            .into_diagnostic()
            .wrap_err("Could not decode the Bot API reply (sendVideo)")?;

        reply.into_result("sendVideo")?;
        Ok(())
    }
}

/// Envelope every Bot API method replies with.
#[derive(Debug, Deserialize)]
struct ApiReply<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

impl<T> ApiReply<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if !self.ok {
            let why = self.description.as_deref().unwrap_or("no description");
            return bail(format!("Bot API {method} failed: {why}"));
        }
        match self.result {
            Some(result) => Ok(result),
            None => bail(format!("Bot API {method} replied ok without a result")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BotProfile {
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Posted {
    message_id: MessageId,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Incoming>,
}

/// The slice of an inbound message the bot acts on.
#[derive(Debug, Deserialize)]
pub struct Incoming {
    pub from: Option<Peer>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Peer {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}
