use std::path::Path;

use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::{
    io::{named_tempfile, remove_existing},
    outside::{FetchOptions, MediaSource},
    result::{Error, Result},
    types::{RetrievalPolicy, VideoMetadata},
};

/// A policy-compliant downloaded artifact, exclusively owned by whoever
/// holds the record. Dropping it removes the file from disk.
#[derive(Debug)]
pub struct MediaFile {
    path: TempPath,
    size: u64,
}

impl MediaFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validated size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Immutable outcome of one retrieval attempt.
///
/// Produced exactly once per attempt. A success hands the artifact's
/// ownership to the consumer, a failure carries the message to surface.
#[derive(Debug)]
pub struct Retrieval {
    pub metadata: Option<VideoMetadata>,
    pub payload: Result<MediaFile>,
}

/// Policy-gated, retry-capable media retrieval with guaranteed cleanup.
pub struct Engine<'a> {
    source: &'a dyn MediaSource,
    policy: &'a RetrievalPolicy,
}

impl<'a> Engine<'a> {
    pub fn new(source: &'a dyn MediaSource, policy: &'a RetrievalPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &RetrievalPolicy {
        self.policy
    }

    /// Convert an untrusted URL into a policy-compliant local media file
    /// or a classified failure. Never leaves a file behind on failure.
    pub fn retrieve(&self, url: &str) -> Retrieval {
        let metadata = match self.source.probe(url) {
            Ok(metadata) => metadata,
            Err(err) => {
                return Retrieval {
                    metadata: None,
                    payload: Err(err),
                }
            }
        };

        debug!("title     = {}", metadata.title);
        debug!("duration  = {}s", metadata.duration_secs);
        debug!("views     = {}", metadata.view_count);

        // A zero duration means the platform did not report one, only a
        // known duration can be held against the ceiling.
        if metadata.duration_secs > 0 && metadata.duration_secs > self.policy.max_duration_secs {
            return Retrieval {
                metadata: Some(metadata),
                payload: Err(Error::DurationExceeded {
                    limit_secs: self.policy.max_duration_secs,
                }),
            };
        }

        match self.transfer(url) {
            Ok(file) => Retrieval {
                metadata: Some(metadata),
                payload: Ok(file),
            },
            Err(err) => {
                // The transfer path failing wholesale leaves nothing the
                // metadata could usefully describe; validation failures on
                // the other hand keep it attached for the record.
                let metadata = match &err {
                    Error::Transfer(_) | Error::Miette(_) => None,
                    _ => Some(metadata),
                };
                Retrieval {
                    metadata,
                    payload: Err(err),
                }
            }
        }
    }

    /// Two-tier download into a uniquely named temporary file, then
    /// validation in order: existence, non-empty, size ceiling.
    ///
    /// The `TempPath` guard removes the file on every early return; the
    /// success path moves it into the returned [`MediaFile`].
    fn transfer(&self, url: &str) -> Result<MediaFile> {
        let target = named_tempfile(".mp4")?.into_temp_path();

        // Hand the transfer tool a clean slate so the existence check
        // below observes its work, not ours.
        remove_existing(&target);

        info!("Downloading {url}");
        if let Err(err) = self
            .source
            .fetch(url, &target, &FetchOptions::constrained(self.policy))
        {
            warn!("Primary download attempt failed ({err}), retrying with compatibility options");
            remove_existing(&target);
            self.source.fetch(url, &target, &FetchOptions::compat())?;
        }

        // The transfer tool may report success while having written zero
        // bytes on some platform-side edge cases. Trust only the stat.
        let size = match std::fs::metadata(&target) {
            Ok(stat) => stat.len(),
            Err(_) => return Err(Error::NotCreated),
        };

        if size == 0 {
            return Err(Error::EmptyArtifact);
        }

        if size > self.policy.max_file_size {
            return Err(Error::SizeExceeded {
                limit_bytes: self.policy.max_file_size,
            });
        }

        Ok(MediaFile { path: target, size })
    }
}
