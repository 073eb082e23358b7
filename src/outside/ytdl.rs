use std::{ffi::OsStr, path::Path};

use serde::Deserialize;

use super::command::{assert_success_command, run_command, Capture, YT_DL, YT_DLP};
use crate::{
    result::{bail, Error, Result},
    types::{RetrievalPolicy, VideoMetadata},
};

/// Resolution ceiling of the primary format selector.
const MAX_HEIGHT: u32 = 720;

/// Browser-like agent, some platform endpoints reject the default one.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Interface for resolving and transferring remote media streams
pub trait MediaSource: Sync {
    /// Query title, duration and view count without transferring the payload.
    ///
    /// Must not write any file. Every network, parsing, or platform-side
    /// failure is reported as [`Error::Extraction`].
    fn probe(&self, url: &str) -> Result<VideoMetadata>;

    /// Transfer the media stream to `path` using the given format selection.
    ///
    /// A failed transfer is reported as [`Error::Transfer`] and may leave a
    /// partial file behind, the caller owns the cleanup.
    fn fetch(&self, url: &str, path: &Path, options: &FetchOptions) -> Result<()>;
}

/// One transfer attempt's format selection and hardening switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    format: String,

    /// Send browser-like headers and alternate player clients. The
    /// compatibility tier leaves this off to keep the request minimal.
    hardened: bool,
}

impl FetchOptions {
    /// Primary selection: best stream under the resolution and byte-size
    /// ceilings, degrading through laxer candidates before giving up on
    /// the constraints entirely.
    pub fn constrained(policy: &RetrievalPolicy) -> Self {
        let size = policy.max_file_size;
        Self {
            format: format!(
                "best[height<={MAX_HEIGHT}][filesize<{size}]\
                 /best[filesize<{size}]\
                 /mp4[filesize<{size}]\
                 /best"
            ),
            hardened: true,
        }
    }

    /// Fallback selection: smallest available stream in the most
    /// compatible container. Trades quality for reliability.
    pub fn compat() -> Self {
        Self {
            format: "worst[ext=mp4]/worst".to_string(),
            hardened: false,
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

/// Interface for the [yt-dlp](https://github.com/yt-dlp/yt-dlp) program
pub struct Ytdl {
    program: &'static str,
}

impl Ytdl {
    /// Verify that the `yt-dlp` or `youtube-dl` binaries are reachable
    pub fn new() -> Result<Self> {
        if assert_success_command(YT_DLP, |cmd| cmd.arg("--version")).is_ok() {
            Ok(Self { program: YT_DLP })
        } else if assert_success_command(YT_DL, |cmd| cmd.arg("--version")).is_ok() {
            Ok(Self { program: YT_DL })
        } else {
            bail("Neither yt-dlp nor youtube-dl found")
        }
    }
}

impl MediaSource for Ytdl {
    fn probe(&self, url: &str) -> Result<VideoMetadata> {
        let res = run_command(
            self.program,
            |cmd| {
                cmd.arg("-q")
                    .arg("--no-warnings")
                    .arg("--skip-download")
                    .arg("-j")
                    .arg("--")
                    .arg(url)
            },
            Capture::STDOUT | Capture::STDERR,
        )
        .map_err(|err| Error::Extraction(err.to_string()))?;

        if !res.status.success() {
            return Err(Error::Extraction(error_line(&res.stderr)));
        }

        parse_probe(&String::from_utf8_lossy(&res.stdout))
    }

    fn fetch(&self, url: &str, path: &Path, options: &FetchOptions) -> Result<()> {
        let res = run_command(
            self.program,
            |cmd| {
                let mut cmd = cmd
                    .arg("-q")
                    .arg("--no-warnings")
                    .args([OsStr::new("-o"), path.as_os_str()])
                    .args(["-f", options.format()])
                    // Or else fails when file already exists, even an empty one
                    .arg("--no-continue")
                    .arg("--force-overwrites")
                    .arg("--no-cache-dir");

                if options.hardened {
                    cmd = cmd
                        .args(["--user-agent", USER_AGENT])
                        .args(["--extractor-args", "youtube:player_client=android,web"])
                        .args(["--extractor-args", "youtube:skip=dash,hls"])
                        .args(["--add-header", "Accept-Language:en-US,en;q=0.9"]);
                }

                cmd.arg("--").arg(url)
            },
            Capture::STDERR,
        )
        .map_err(|err| Error::Transfer(err.to_string()))?;

        if res.status.success() {
            Ok(())
        } else {
            Err(Error::Transfer(error_line(&res.stderr)))
        }
    }
}

/// The JSON subset of `yt-dlp -j` the resolver cares about.
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    title: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
}

fn parse_probe(json: &str) -> Result<VideoMetadata> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|err| Error::Extraction(format!("Could not parse video info: {err}")))?;

    Ok(VideoMetadata {
        title: probe.title.unwrap_or_else(|| "Unknown".to_string()),
        duration_secs: probe.duration.map_or(0, |secs| secs as u64),
        view_count: probe.view_count.unwrap_or(0),
    })
}

/// Pull the most informative line out of a failed invocation's stderr.
fn error_line(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);

    if let Some(line) = text.lines().find(|line| line.starts_with("ERROR:")) {
        return line.trim_start_matches("ERROR:").trim().to_string();
    }

    let text = text.trim();
    if text.is_empty() {
        "Downloader exited with an error".to_string()
    } else {
        text.lines().last().unwrap().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constrained_selector_carries_both_ceilings() {
        let policy = RetrievalPolicy {
            max_duration_secs: 600,
            max_file_size: 52_428_800,
        };
        let options = FetchOptions::constrained(&policy);

        assert!(options.format().contains("height<=720"));
        assert!(options.format().contains("filesize<52428800"));
        assert!(options.format().ends_with("/best"));
        assert!(options.hardened);
    }

    #[test]
    fn compat_selector_prefers_smallest_mp4() {
        let options = FetchOptions::compat();

        assert_eq!(options.format(), "worst[ext=mp4]/worst");
        assert!(!options.hardened);
    }

    #[test]
    fn probe_parsing_applies_defaults() {
        let full = parse_probe(
            r#"{"title": "A video", "duration": 300.5, "view_count": 1234, "id": "x"}"#,
        )
        .unwrap();
        assert_eq!(
            full,
            VideoMetadata {
                title: "A video".to_string(),
                duration_secs: 300,
                view_count: 1234,
            }
        );

        let bare = parse_probe("{}").unwrap();
        assert_eq!(
            bare,
            VideoMetadata {
                title: "Unknown".to_string(),
                duration_secs: 0,
                view_count: 0,
            }
        );

        assert!(matches!(parse_probe("not json"), Err(Error::Extraction(_))));
    }

    #[test]
    fn error_line_prefers_the_error_marker() {
        let stderr = b"WARNING: something minor\nERROR: Video unavailable\n";
        assert_eq!(error_line(stderr), "Video unavailable");

        assert_eq!(error_line(b"some trailing noise\n"), "some trailing noise");
        assert_eq!(error_line(b""), "Downloader exited with an error");
    }
}
