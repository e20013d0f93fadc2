//! Local profile files and `perf record` capture conversion
//!
//! Captures written by `perf record` start with the `PERFILE2` magic. Those are
//! handed to an external converter that writes a profile.proto file; every
//! other file is returned as-is, rewound to its start.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use log::debug;
use rand::rngs::OsRng;
use rand::RngCore;
use tempfile::TempPath;

use crate::domain::FetchError;
use crate::ui::Ui;

/// Magic marker at the start of a `perf record` capture.
pub const PERF_MAGIC: &[u8; 8] = b"PERFILE2";

/// A readable profile stream backed by a local file.
///
/// When the file is converter output it is deleted once the reader is dropped.
#[derive(Debug)]
pub struct ProfileReader {
    file: File,
    converted: Option<TempPath>,
}

impl ProfileReader {
    /// Path of the converter output, if a conversion took place.
    #[must_use]
    pub fn converted_path(&self) -> Option<&Path> {
        self.converted.as_deref()
    }
}

impl Read for ProfileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Open `path` as a profile stream, converting `perf record` captures.
///
/// Conversion runs `<converter> <path> <output>` with the output placed in
/// `tmp_dir` under a random name. The converter's stdout and stderr go
/// straight to ours.
///
/// # Errors
/// Returns an error if `path` can't be opened or read, if no random name can
/// be generated, or if the converter can't be started or exits unsuccessfully.
pub fn profile_proto_reader(
    path: &Path,
    converter: &Path,
    tmp_dir: &Path,
    ui: &dyn Ui,
) -> Result<ProfileReader, FetchError> {
    let mut file = File::open(path)?;

    if is_perf_file(&mut file)? {
        drop(file);
        return convert_perf_data(path, converter, tmp_dir, ui);
    }

    file.seek(SeekFrom::Start(0))?;
    Ok(ProfileReader { file, converted: None })
}

fn is_perf_file(file: &mut File) -> io::Result<bool> {
    let mut header = Vec::with_capacity(PERF_MAGIC.len());
    file.by_ref().take(PERF_MAGIC.len() as u64).read_to_end(&mut header)?;
    Ok(header == PERF_MAGIC)
}

fn convert_perf_data(
    path: &Path,
    converter: &Path,
    tmp_dir: &Path,
    ui: &dyn Ui,
) -> Result<ProfileReader, FetchError> {
    ui.print(&format!(
        "Converting {} to a profile.proto... (May take a few minutes)",
        path.display()
    ));

    let output = TempPath::from_path(random_output_path(tmp_dir)?);
    let converter_name = converter.display().to_string();
    debug!("running {converter_name} {} {}", path.display(), output.display());

    let status = Command::new(converter)
        .arg(path)
        .arg(&*output)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|error| FetchError::ConverterSpawn { converter: converter_name.clone(), error })?;

    if !status.success() {
        return Err(FetchError::ConverterFailed { converter: converter_name, status });
    }

    let file = File::open(&output)?;
    Ok(ProfileReader { file, converted: Some(output) })
}

/// `<tmp_dir>/pprof_<base64 of 32 random bytes>`
fn random_output_path(tmp_dir: &Path) -> Result<PathBuf, FetchError> {
    let mut bytes = [0u8; 32];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(tmp_dir.join(format!("pprof_{}", URL_SAFE_NO_PAD.encode(bytes))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::RecordingUi;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        path
    }

    fn read_all(mut r: impl Read) -> Vec<u8> {
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_regular_file_passes_through_rewound() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "cpu.pb", b"not a perf capture at all");
        let ui = RecordingUi::default();

        let reader =
            profile_proto_reader(&path, Path::new("/nonexistent"), dir.path(), &ui).unwrap();

        assert!(reader.converted_path().is_none());
        assert_eq!(read_all(reader), b"not a perf capture at all");
        assert!(ui.messages().is_empty());
    }

    #[test]
    fn test_empty_file_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "empty", b"");
        let ui = RecordingUi::default();

        let reader =
            profile_proto_reader(&path, Path::new("/nonexistent"), dir.path(), &ui).unwrap();
        assert!(read_all(reader).is_empty());
    }

    #[test]
    fn test_short_prefix_of_magic_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "short", b"PERF");
        let ui = RecordingUi::default();

        let reader =
            profile_proto_reader(&path, Path::new("/nonexistent"), dir.path(), &ui).unwrap();
        assert_eq!(read_all(reader), b"PERF");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let ui = RecordingUi::default();
        let err = profile_proto_reader(
            &dir.path().join("absent"),
            Path::new("cp"),
            dir.path(),
            &ui,
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_perf_capture_is_converted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "perf.data", b"PERFILE2 payload");
        let ui = RecordingUi::default();

        // `cp <in> <out>` satisfies the converter contract well enough to
        // observe the output being opened.
        let reader = profile_proto_reader(&path, Path::new("cp"), dir.path(), &ui).unwrap();
        let converted = reader.converted_path().unwrap().to_path_buf();

        assert_eq!(converted.parent(), Some(dir.path()));
        let name = converted.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("pprof_"));
        assert_eq!(name.len(), "pprof_".len() + 43);
        assert!(ui.messages()[0].starts_with("Converting "));

        assert_eq!(read_all(reader), b"PERFILE2 payload");
        assert!(!converted.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_converter_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "perf.data", b"PERFILE2");
        let ui = RecordingUi::default();

        let err = profile_proto_reader(&path, Path::new("false"), dir.path(), &ui).unwrap_err();
        assert!(matches!(err, FetchError::ConverterFailed { .. }));
    }

    #[test]
    fn test_missing_converter_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "perf.data", b"PERFILE2");
        let ui = RecordingUi::default();

        let err = profile_proto_reader(
            &path,
            Path::new("/definitely/not/a/converter"),
            dir.path(),
            &ui,
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::ConverterSpawn { .. }));
    }
}
