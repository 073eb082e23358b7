mod sqlite;

pub use sqlite::Sqlite;

pub type UserId = i64;

/// Final state of one user-facing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStatus {
    Completed,
    Failed,
}

/// One attempt record, as handed to the persistence sink.
///
/// The sink assigns the row id and creation timestamp. Entries are
/// append-only: never updated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLogEntry {
    pub user_id: UserId,
    pub platform: &'static str,
    pub video_url: String,
    pub status: LogStatus,
}

/// One line of a user's aggregate statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCount {
    pub platform: String,
    pub count: u64,
}

/// A sink recording the outcome of every retrieval attempt.
///
/// Writes are independent single transactions. Stats are additive, no
/// cross-request ordering is required.
pub trait DownloadStore: Sync {
    /// Append one attempt record.
    fn record(&self, entry: &DownloadLogEntry) -> crate::result::Result<()>;

    /// Completed-download counts for one user, grouped by platform.
    fn user_stats(&self, user: UserId) -> crate::result::Result<Vec<PlatformCount>>;
}
