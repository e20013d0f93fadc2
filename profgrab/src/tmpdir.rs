//! Scratch directory selection and saving of merged profiles

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use profgrab_profile::Profile;

use crate::config::FetchConfig;
use crate::domain::GrabError;
use crate::ui::Ui;

const MAX_SAVE_INDEX: u32 = 9999;

/// Pick the first usable temp directory, creating it if needed.
///
/// Candidates in order: the configured directory, `<home>/pprof`, the system
/// temp directory. Unusable candidates are reported and skipped.
///
/// # Errors
/// Returns [`GrabError::NoTempDir`] if no candidate can be created.
pub fn resolve_tmp_dir(config: &FetchConfig, ui: &dyn Ui) -> Result<PathBuf, GrabError> {
    let candidates = config
        .tmp_dir
        .iter()
        .cloned()
        .chain(config.home_dir.iter().map(|h| h.join("pprof")))
        .chain(config.system_tmp_dir.iter().cloned());

    for dir in candidates {
        match fs::create_dir_all(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) => ui.print_err(&format!("Could not use temp dir {}: {e}", dir.display())),
        }
    }
    Err(GrabError::NoTempDir)
}

/// `pprof.<main binary>.<sample types>.` for a profile.
#[must_use]
pub fn save_prefix(profile: &Profile) -> String {
    let mut prefix = String::from("pprof.");
    if let Some(base) = profile
        .mappings
        .first()
        .and_then(|m| Path::new(&m.file).file_name())
        .map(|n| n.to_string_lossy())
    {
        prefix.push_str(&base);
        prefix.push('.');
    }
    for st in &profile.sample_types {
        prefix.push_str(&st.kind);
        prefix.push('.');
    }
    prefix
}

/// Write `profile` into `dir` as `<prefix><NNN>.pb.gz`, using the first
/// index that doesn't exist yet.
///
/// # Errors
/// Returns an error if no file can be created or the profile can't be written.
pub fn save_profile(profile: &Profile, dir: &Path) -> Result<PathBuf> {
    let prefix = save_prefix(profile);
    let (path, file) = create_numbered(dir, &prefix, ".pb.gz")?;
    profile
        .write(BufWriter::new(file))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn create_numbered(dir: &Path, prefix: &str, suffix: &str) -> Result<(PathBuf, File)> {
    for index in 1..=MAX_SAVE_INDEX {
        let path = dir.join(format!("{prefix}{index:03}{suffix}"));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", path.display()))
            }
        }
    }
    Err(anyhow!("could not create file of the form {prefix}001{suffix}"))
}
