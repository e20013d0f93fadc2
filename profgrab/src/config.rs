//! Explicit fetch configuration
//!
//! Everything the pipeline would otherwise pick up from the process
//! environment lives here. [`FetchConfig::from_env`] is the only place that
//! reads environment variables; the rest of the crate takes a `FetchConfig`.

use std::ffi::OsString;
use std::path::PathBuf;

/// Largest number of sources fetched concurrently.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// Converter used for `perf record` captures when none is configured.
pub const DEFAULT_PERF_CONVERTER: &str = "perf_to_profile";

const TMPDIR_ENV: &str = "PPROF_TMPDIR";
const BINARY_PATH_ENV: &str = "PPROF_BINARY_PATH";
const CONVERTER_ENV: &str = "PPROF_PERF_CONVERTER";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Directories searched for local copies of mapped binaries, in order.
    pub binary_search_path: Vec<PathBuf>,
    /// Preferred temp directory. `None` falls back to `<home>/pprof`, then
    /// [`system_tmp_dir`](Self::system_tmp_dir).
    pub tmp_dir: Option<PathBuf>,
    pub home_dir: Option<PathBuf>,
    /// Last temp directory candidate, normally the system one.
    pub system_tmp_dir: Option<PathBuf>,
    /// Program invoked as `<converter> <input> <output>` for perf.data files.
    pub perf_converter: PathBuf,
    /// Batch size of the concurrent fetch stage. Values below 1 are treated as 1.
    pub chunk_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            binary_search_path: Vec::new(),
            tmp_dir: None,
            home_dir: None,
            system_tmp_dir: Some(std::env::temp_dir()),
            perf_converter: PathBuf::from(DEFAULT_PERF_CONVERTER),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl FetchConfig {
    /// Build a configuration from the process environment.
    ///
    /// Reads `PPROF_TMPDIR`, `PPROF_BINARY_PATH` (platform path-list syntax),
    /// `PPROF_PERF_CONVERTER` and the user's home directory.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var_os(TMPDIR_ENV),
            std::env::var_os(BINARY_PATH_ENV),
            std::env::var_os(CONVERTER_ENV),
            dirs::home_dir(),
            std::env::temp_dir(),
        )
    }

    fn from_vars(
        tmp_dir: Option<OsString>,
        binary_path: Option<OsString>,
        converter: Option<OsString>,
        home_dir: Option<PathBuf>,
        system_tmp_dir: PathBuf,
    ) -> Self {
        let binary_search_path = match binary_path.filter(|p| !p.is_empty()) {
            Some(list) => std::env::split_paths(&list).collect(),
            None => home_dir.iter().map(|h| h.join("pprof").join("binaries")).collect(),
        };

        Self {
            binary_search_path,
            tmp_dir: tmp_dir.filter(|d| !d.is_empty()).map(PathBuf::from),
            home_dir,
            system_tmp_dir: Some(system_tmp_dir),
            perf_converter: converter
                .filter(|c| !c.is_empty())
                .map_or_else(|| PathBuf::from(DEFAULT_PERF_CONVERTER), PathBuf::from),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the batch size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}
