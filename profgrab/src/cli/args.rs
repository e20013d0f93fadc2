//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::{Source, SymbolizeMode};

#[derive(Parser, Debug)]
#[command(
    name = "profgrab",
    version,
    about = "Fetch pprof profiles from files and HTTP endpoints and merge them",
    after_help = "\
EXAMPLES:
    profgrab cpu.pb.gz                                  Validate and symbolize a local profile
    profgrab -o merged.pb.gz host1:6060/debug/pprof/heap host2:6060/debug/pprof/heap
    profgrab --seconds 30 --base before.pb.gz http://host:6060/debug/pprof/profile
    profgrab perf.data                                  Convert a perf record capture

ENVIRONMENT:
    PPROF_TMPDIR           Directory for saved and converted profiles
    PPROF_BINARY_PATH      Search path for local copies of mapped binaries
    PPROF_PERF_CONVERTER   Converter for perf.data captures (default: perf_to_profile)"
)]
pub struct Args {
    /// Profile sources: local files or URLs
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<String>,

    /// Baseline profile to subtract (repeatable)
    #[arg(long, value_name = "SOURCE")]
    pub base: Vec<String>,

    /// Sampling duration to request from remote sources (0 = server default)
    #[arg(long, default_value = "0")]
    pub seconds: u64,

    /// Per-source fetch timeout in seconds (0 = derived from --seconds)
    #[arg(long, default_value = "0")]
    pub timeout: u64,

    /// How to symbolize the merged profile
    #[arg(long, value_enum, default_value_t = SymbolizeMode::Local)]
    pub symbolize: SymbolizeMode,

    /// Override the file name of the main executable mapping
    #[arg(long)]
    pub exec_name: Option<String>,

    /// Override the build id of the main executable mapping
    #[arg(long)]
    pub build_id: Option<String>,

    /// Write the merged profile to FILE (gzip'd protobuf)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write mapping provenance of remote sources to FILE as JSON
    #[arg(long, value_name = "FILE")]
    pub provenance: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// The fetch descriptor these arguments describe.
    #[must_use]
    pub fn source(&self) -> Source {
        Source {
            sources: self.sources.clone(),
            base: self.base.clone(),
            duration: Duration::from_secs(self.seconds),
            timeout: Duration::from_secs(self.timeout),
            symbolize: self.symbolize,
            exec_name: self.exec_name.clone(),
            build_id: self.build_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let args = Args::try_parse_from([
            "profgrab",
            "--base",
            "old.pb.gz",
            "--seconds",
            "30",
            "--symbolize",
            "force",
            "--exec-name",
            "server",
            "-o",
            "out.pb.gz",
            "host:6060/debug/pprof/profile",
            "new.pb.gz",
        ])
        .unwrap();

        let source = args.source();
        assert_eq!(source.sources, vec!["host:6060/debug/pprof/profile", "new.pb.gz"]);
        assert_eq!(source.base, vec!["old.pb.gz"]);
        assert_eq!(source.duration, Duration::from_secs(30));
        assert_eq!(source.timeout, Duration::ZERO);
        assert_eq!(source.symbolize, SymbolizeMode::Force);
        assert_eq!(source.exec_name.as_deref(), Some("server"));
        assert_eq!(args.output, Some(PathBuf::from("out.pb.gz")));
    }

    #[test]
    fn test_source_is_required() {
        assert!(Args::try_parse_from(["profgrab"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["profgrab", "cpu.pb.gz"]).unwrap();
        assert_eq!(args.symbolize, SymbolizeMode::Local);
        assert_eq!(args.seconds, 0);
        assert!(args.base.is_empty());
        assert!(!args.quiet);
    }
}
