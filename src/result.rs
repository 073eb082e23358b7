use std::fmt::Display;

use miette::miette;

/// Failure taxonomy of one retrieval attempt, plus a catch-all for
/// infrastructure errors. Every variant carries enough to build the
/// user-facing message; callers never need to match on it.
#[derive(Debug)]
pub enum Error {
    /// The metadata query failed, network or platform side.
    Extraction(String),

    /// The video duration is over the configured ceiling.
    DurationExceeded { limit_secs: u64 },

    /// The downloaded artifact is over the configured ceiling.
    SizeExceeded { limit_bytes: u64 },

    /// The transfer reported success but no file appeared on disk.
    NotCreated,

    /// The transfer produced a zero-byte file.
    EmptyArtifact,

    /// The fetch itself failed, fallback attempt included.
    Transfer(String),

    Miette(miette::Report),
}

impl From<miette::Report> for Error {
    fn from(err: miette::Report) -> Self {
        Error::Miette(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Miette(miette!("{err}"))
    }
}

impl From<Error> for miette::Report {
    fn from(err: Error) -> Self {
        match err {
            Error::Miette(err) => err,
            err => miette!("{err}"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Extraction(msg) => write!(f, "{msg}"),
            Error::DurationExceeded { limit_secs } => {
                write!(f, "Video is too long (maximum {} minutes)", limit_secs / 60)
            }
            Error::SizeExceeded { limit_bytes } => {
                write!(
                    f,
                    "File is too large (maximum {} MB)",
                    limit_bytes / 1024 / 1024
                )
            }
            Error::NotCreated => write!(f, "File was not created"),
            Error::EmptyArtifact => write!(f, "Downloaded file is empty"),
            Error::Transfer(msg) => write!(f, "{msg}"),
            Error::Miette(report) => write!(f, "{report}"),
        }
    }
}

pub fn bail<T>(msg: impl Display) -> Result<T> {
    Err(Error::Miette(miette!("{msg}")))
}

pub type Result<T> = std::result::Result<T, Error>;
