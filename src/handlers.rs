use std::fmt::Write;

use indoc::{formatdoc, indoc};
use tracing::{error, info};

use crate::{
    actors::{Job, Task},
    database::{DownloadLogEntry, DownloadStore, LogStatus, PlatformCount},
    engine::Engine,
    outside::Messenger,
    result::Result,
    types::VideoMetadata,
    utils::group_digits,
};

/// The single platform the bot handles; also the key under which
/// attempts are recorded.
pub const PLATFORM: &str = "youtube";

/// Host substrings that mark a message as an in-scope URL.
const SUPPORTED_HOSTS: &[&str] = &["youtube.com", "youtu.be", "www.youtube.com", "m.youtube.com"];

/// Captions get the title cut down to this many characters.
const CAPTION_TITLE_LIMIT: usize = 100;

const UNSUPPORTED_TEXT: &str = indoc! {"
    ❌ Unsupported link!

    Send a YouTube video link:
    • https://www.youtube.com/watch?v=...
    • https://youtu.be/...
    • https://youtube.com/shorts/...
"};

const PROCESSING_TEXT: &str = indoc! {"
    ⏳ Processing the YouTube video...
    This can take up to 30 seconds ⏱️
"};

const DELIVERED_TEXT: &str = "✅ Video delivered!";

const GENERIC_FAILURE_TEXT: &str = indoc! {"
    ❌ Something went wrong while processing the video.
    Try again or use another link.
"};

/// The messaging-facing controller: classifies inbound text, drives the
/// retrieval engine, reports back to the user, and feeds the stats sink.
pub struct Handlers<'a> {
    engine: Engine<'a>,
    store: &'a dyn DownloadStore,
    messenger: &'a dyn Messenger,
}

impl<'a> Handlers<'a> {
    pub fn new(
        engine: Engine<'a>,
        store: &'a dyn DownloadStore,
        messenger: &'a dyn Messenger,
    ) -> Self {
        Self {
            engine,
            store,
            messenger,
        }
    }

    /// True iff the text contains one of the recognized host substrings.
    pub fn classify(text: &str) -> bool {
        let text = text.to_lowercase();
        SUPPORTED_HOSTS.iter().any(|host| text.contains(host))
    }

    pub fn handle(&self, job: &Job) -> Result<()> {
        match &job.task {
            Task::Start => {
                self.messenger.send_text(job.chat, &self.start_text())?;
            }
            Task::Help => {
                self.messenger.send_text(job.chat, &self.help_text())?;
            }
            Task::Stats => self.send_stats(job)?,
            Task::Candidate(text) => self.handle_candidate(job, text)?,
        }
        Ok(())
    }

    fn handle_candidate(&self, job: &Job, text: &str) -> Result<()> {
        let url = text.trim();
        if !Self::classify(url) {
            self.messenger.send_text(job.chat, UNSUPPORTED_TEXT)?;
            return Ok(());
        }

        let ack = self.messenger.send_text(job.chat, PROCESSING_TEXT)?;
        info!("Retrieving {url} for user {}", job.user);

        let retrieval = self.engine.retrieve(url);
        match retrieval.payload {
            Ok(file) => {
                let caption = build_caption(retrieval.metadata.as_ref(), file.size());
                match self.messenger.send_video(job.chat, file.path(), &caption) {
                    Ok(()) => {
                        // Delivered; the artifact is single-use
                        drop(file);
                        self.record(job, url, LogStatus::Completed);
                        self.messenger.edit_text(job.chat, ack, DELIVERED_TEXT)?;
                    }
                    Err(err) => {
                        error!("Could not deliver video to chat {}: {err}", job.chat);
                        self.messenger
                            .edit_text(job.chat, ack, GENERIC_FAILURE_TEXT)?;
                    }
                }
            }
            Err(err) => {
                self.record(job, url, LogStatus::Failed);
                self.messenger
                    .edit_text(job.chat, ack, &format!("❌ {err}"))?;
            }
        }

        Ok(())
    }

    fn send_stats(&self, job: &Job) -> Result<()> {
        let stats = self.store.user_stats(job.user)?;

        let text = if stats.is_empty() {
            "You have no downloaded videos yet.".to_string()
        } else {
            let mut text = String::from("📊 Your download stats:\n");
            for PlatformCount { platform, count } in stats {
                write!(text, "\n📺 {platform}: {count} videos").unwrap();
            }
            text
        };

        self.messenger.send_text(job.chat, &text)?;
        Ok(())
    }

    fn record(&self, job: &Job, url: &str, status: LogStatus) {
        let entry = DownloadLogEntry {
            user_id: job.user,
            platform: PLATFORM,
            video_url: url.to_string(),
            status,
        };

        // A lost record must not fail the user-facing request
        if let Err(err) = self.store.record(&entry) {
            error!("Could not record download attempt: {err}");
        }
    }

    fn start_text(&self) -> String {
        formatdoc! {"
            🎥 Hi! I fetch YouTube videos for you.

            📺 Only YouTube is supported
            ⏱️ Maximum duration: {} minutes
            📊 Maximum size: {} MB

            Just send me a YouTube link!

            Commands:
            /start - this banner
            /help - usage instructions
            /stats - your download stats",
            self.engine.policy().max_minutes(),
            self.engine.policy().max_megabytes(),
        }
    }

    fn help_text(&self) -> String {
        formatdoc! {"
            🔧 How to use the bot:

            1. Send a YouTube video link
            2. Wait for processing (usually 10-30 seconds)
            3. Get the video right in the chat!

            ⚠️ Limitations:
            • Only YouTube videos
            • Maximum {} minutes long
            • File size up to {} MB
            • Only public videos

            Example links:
            • https://www.youtube.com/watch?v=...
            • https://youtu.be/...
            • https://youtube.com/shorts/...",
            self.engine.policy().max_minutes(),
            self.engine.policy().max_megabytes(),
        }
    }
}

/// Build the delivery caption from the resolved metadata and the final
/// artifact size.
fn build_caption(metadata: Option<&VideoMetadata>, size: u64) -> String {
    let Some(metadata) = metadata else {
        return format!("🎥 YouTube video\n📊 {} MB", size / 1024 / 1024);
    };

    let title: String = metadata.title.chars().take(CAPTION_TITLE_LIMIT).collect();
    let mut caption = format!("🎥 {title}\n📺 YouTube\n📊 {} MB", size / 1024 / 1024);

    if metadata.view_count > 0 {
        write!(caption, "\n👀 {} views", group_digits(metadata.view_count)).unwrap();
    }

    caption
}

#[cfg(test)]
mod tests {
    use std::{
        fs::File,
        path::{Path, PathBuf},
        sync::Mutex,
    };

    use super::*;
    use crate::{
        database::{PlatformCount, UserId},
        outside::{ChatId, FetchOptions, MediaSource, MessageId},
        result::{Error, Result},
        types::RetrievalPolicy,
        utils::MutexUtils,
    };

    const POLICY: RetrievalPolicy = RetrievalPolicy {
        max_duration_secs: 600,
        max_file_size: 52_428_800,
    };

    /// Media source scripted with a fixed duration and transfer size.
    struct StubSource {
        duration_secs: u64,
        bytes: u64,
        probes: Mutex<usize>,
    }

    impl StubSource {
        fn new(duration_secs: u64, bytes: u64) -> Self {
            Self {
                duration_secs,
                bytes,
                probes: Mutex::new(0),
            }
        }

        fn probe_count(&self) -> usize {
            self.probes.with_lock(|probes| *probes)
        }
    }

    impl MediaSource for StubSource {
        fn probe(&self, _url: &str) -> Result<VideoMetadata> {
            self.probes.with_lock(|mut probes| *probes += 1);
            Ok(VideoMetadata {
                title: "A perfectly fine video".to_string(),
                duration_secs: self.duration_secs,
                view_count: 1_234_567,
            })
        }

        fn fetch(&self, _url: &str, path: &Path, _options: &FetchOptions) -> Result<()> {
            let file = File::create(path).unwrap();
            file.set_len(self.bytes).unwrap();
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Outbox {
        texts: Vec<(ChatId, String)>,
        edits: Vec<(ChatId, MessageId, String)>,
        videos: Vec<(PathBuf, String, bool)>,
    }

    #[derive(Default)]
    struct StubMessenger {
        outbox: Mutex<Outbox>,
        refuse_videos: bool,
    }

    impl StubMessenger {
        fn refusing_videos() -> Self {
            Self {
                refuse_videos: true,
                ..Self::default()
            }
        }

        fn outbox(&self) -> std::sync::MutexGuard<'_, Outbox> {
            self.outbox.lock().unwrap()
        }
    }

    impl Messenger for StubMessenger {
        fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId> {
            self.outbox.with_lock(|mut outbox| {
                outbox.texts.push((chat, text.to_string()));
                Ok(outbox.texts.len() as MessageId)
            })
        }

        fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<()> {
            self.outbox
                .with_lock(|mut outbox| outbox.edits.push((chat, message, text.to_string())));
            Ok(())
        }

        fn send_video(&self, _chat: ChatId, video: &Path, caption: &str) -> Result<()> {
            if self.refuse_videos {
                return Err(Error::Transfer("upload rejected".to_string()));
            }
            self.outbox.with_lock(|mut outbox| {
                outbox
                    .videos
                    .push((video.to_path_buf(), caption.to_string(), video.exists()))
            });
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubStore {
        entries: Mutex<Vec<DownloadLogEntry>>,
    }

    impl DownloadStore for StubStore {
        fn record(&self, entry: &DownloadLogEntry) -> Result<()> {
            self.entries
                .with_lock(|mut entries| entries.push(entry.clone()));
            Ok(())
        }

        fn user_stats(&self, user: UserId) -> Result<Vec<PlatformCount>> {
            let count = self.entries.with_lock(|entries| {
                entries
                    .iter()
                    .filter(|e| e.user_id == user && e.status == LogStatus::Completed)
                    .count() as u64
            });

            Ok(if count == 0 {
                vec![]
            } else {
                vec![PlatformCount {
                    platform: PLATFORM.to_string(),
                    count,
                }]
            })
        }
    }

    fn job(task: Task) -> Job {
        Job {
            chat: 1,
            user: 42,
            task,
        }
    }

    #[test]
    fn classify_recognizes_youtube_hosts_only() {
        assert!(Handlers::classify("https://www.youtube.com/watch?v=abc"));
        assert!(Handlers::classify("https://YOUTU.BE/abc"));
        assert!(Handlers::classify("check https://m.youtube.com/shorts/x"));

        assert!(!Handlers::classify("https://vimeo.com/12345"));
        assert!(!Handlers::classify("hello there"));
        assert!(!Handlers::classify(""));
    }

    #[test]
    fn out_of_scope_text_triggers_neither_retrieval_nor_record() {
        let source = StubSource::new(300, 1024);
        let store = StubStore::default();
        let messenger = StubMessenger::default();
        let handlers = Handlers::new(Engine::new(&source, &POLICY), &store, &messenger);

        handlers
            .handle(&job(Task::Candidate("https://vimeo.com/123".to_string())))
            .unwrap();

        assert_eq!(source.probe_count(), 0);
        assert!(store.entries.with_lock(|entries| entries.is_empty()));

        let outbox = messenger.outbox();
        assert_eq!(outbox.texts.len(), 1);
        assert!(outbox.texts[0].1.contains("Unsupported"));
        assert!(outbox.videos.is_empty());
    }

    #[test]
    fn successful_retrieval_delivers_records_and_cleans_up() {
        let source = StubSource::new(300, 1_048_576);
        let store = StubStore::default();
        let messenger = StubMessenger::default();
        let handlers = Handlers::new(Engine::new(&source, &POLICY), &store, &messenger);

        handlers
            .handle(&job(Task::Candidate(
                "https://youtu.be/abcdef".to_string(),
            )))
            .unwrap();

        let outbox = messenger.outbox();

        // Acknowledged, delivered with a full caption, then edited to done
        assert!(outbox.texts[0].1.contains("Processing"));
        let (path, caption, existed_at_send) = &outbox.videos[0];
        assert!(*existed_at_send);
        assert!(caption.contains("A perfectly fine video"));
        assert!(caption.contains("1 MB"));
        assert!(caption.contains("1,234,567 views"));
        assert_eq!(outbox.edits[0].2, DELIVERED_TEXT);

        // Ownership passed to the orchestrator, which deleted it after use
        assert!(!path.exists());

        let entries = store.entries.with_lock(|entries| entries.clone());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, LogStatus::Completed);
        assert_eq!(entries[0].user_id, 42);
        assert_eq!(entries[0].platform, PLATFORM);
    }

    #[test]
    fn retrieval_failure_records_and_surfaces_the_message() {
        let source = StubSource::new(1200, 1_048_576);
        let store = StubStore::default();
        let messenger = StubMessenger::default();
        let handlers = Handlers::new(Engine::new(&source, &POLICY), &store, &messenger);

        handlers
            .handle(&job(Task::Candidate("https://youtu.be/long".to_string())))
            .unwrap();

        let entries = store.entries.with_lock(|entries| entries.clone());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, LogStatus::Failed);

        let outbox = messenger.outbox();
        assert!(outbox.videos.is_empty());
        assert!(outbox.edits[0].2.contains("maximum 10 minutes"));
    }

    #[test]
    fn delivery_failure_is_caught_and_kept_out_of_the_stats() {
        let source = StubSource::new(300, 1_048_576);
        let store = StubStore::default();
        let messenger = StubMessenger::refusing_videos();
        let handlers = Handlers::new(Engine::new(&source, &POLICY), &store, &messenger);

        handlers
            .handle(&job(Task::Candidate("https://youtu.be/abc".to_string())))
            .unwrap();

        assert!(store.entries.with_lock(|entries| entries.is_empty()));

        let outbox = messenger.outbox();
        assert_eq!(outbox.edits[0].2, GENERIC_FAILURE_TEXT);
    }

    #[test]
    fn stats_command_reports_completed_counts() {
        let source = StubSource::new(300, 1024);
        let store = StubStore::default();
        let messenger = StubMessenger::default();
        let handlers = Handlers::new(Engine::new(&source, &POLICY), &store, &messenger);

        store
            .record(&DownloadLogEntry {
                user_id: 42,
                platform: PLATFORM,
                video_url: "https://youtu.be/a".to_string(),
                status: LogStatus::Completed,
            })
            .unwrap();

        handlers.handle(&job(Task::Stats)).unwrap();

        let outbox = messenger.outbox();
        assert!(outbox.texts[0].1.contains("youtube: 1 videos"));
    }

    #[test]
    fn start_banner_carries_the_configured_limits() {
        let source = StubSource::new(300, 1024);
        let store = StubStore::default();
        let messenger = StubMessenger::default();
        let handlers = Handlers::new(Engine::new(&source, &POLICY), &store, &messenger);

        handlers.handle(&job(Task::Start)).unwrap();

        let outbox = messenger.outbox();
        let banner = &outbox.texts[0].1;
        assert!(banner.contains("10 minutes"));
        assert!(banner.contains("50 MB"));
        assert!(banner.contains("/stats"));
    }

    #[test]
    fn captions_truncate_long_titles_on_char_boundaries() {
        let metadata = VideoMetadata {
            title: "é".repeat(150),
            duration_secs: 10,
            view_count: 0,
        };

        let caption = build_caption(Some(&metadata), 2 * 1024 * 1024);
        assert!(caption.contains(&"é".repeat(100)));
        assert!(!caption.contains(&"é".repeat(101)));
        assert!(caption.contains("2 MB"));
        assert!(!caption.contains("views"));
    }
}
