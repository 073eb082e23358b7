/// Video attributes resolved before any payload transfer.
///
/// Fields the platform did not report fall back to neutral values
/// ("Unknown" title, zero duration, zero views).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,

    /// Duration in seconds. 0 means the platform did not report it.
    pub duration_secs: u64,

    pub view_count: u64,
}
