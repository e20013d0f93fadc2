//! Structured error types for profgrab
//!
//! Two separate channels: [`FetchError`] is attributed to a single source and
//! never stops the run, [`GrabError`] aborts the whole fetch operation.

use profgrab_profile::ProfileError;
use thiserror::Error;

/// Failure to produce a profile from one source. Recoverable.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("server response: {0}")]
    Status(String),

    #[error("{converter} exited with {status}")]
    ConverterFailed { converter: String, status: std::process::ExitStatus },

    #[error("failed to run {converter}: {error}")]
    ConverterSpawn { converter: String, error: std::io::Error },

    #[error("random source unavailable: {0}")]
    Random(#[from] rand::Error),

    #[error(transparent)]
    Override(anyhow::Error),

    #[error("fetch worker panicked")]
    WorkerPanicked,

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of the fetch operation as a whole.
#[derive(Error, Debug)]
pub enum GrabError {
    #[error("failed to fetch any profiles")]
    NoProfiles,

    #[error("failed to identify temp dir")]
    NoTempDir,

    #[error(transparent)]
    Merge(ProfileError),

    #[error("merged profile is invalid: {0}")]
    Invalid(ProfileError),
}
