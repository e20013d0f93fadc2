//! Caller-facing descriptor types

use std::time::Duration;

use clap::ValueEnum;

/// How the merged profile gets symbolized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SymbolizeMode {
    /// Leave addresses as they are.
    None,
    /// Symbolize mappings that carry no function information yet.
    #[default]
    Local,
    /// Re-symbolize every mapping that resolves to a local binary.
    Force,
}

/// What to fetch and how.
///
/// Every entry of `sources` contributes with scale +1 and every entry of
/// `base` with scale -1, so `sources - base` is what ends up merged.
#[derive(Debug, Clone, Default)]
pub struct Source {
    pub sources: Vec<String>,
    pub base: Vec<String>,
    /// Requested profiling duration for remote sources. Zero means unset.
    pub duration: Duration,
    /// Per-fetch timeout. Zero means derive one.
    pub timeout: Duration,
    pub symbolize: SymbolizeMode,
    /// Replaces the file name of the first (main executable) mapping.
    pub exec_name: Option<String>,
    /// Replaces the build id of the first (main executable) mapping.
    pub build_id: Option<String>,
}

impl Source {
    /// Total number of fetches this descriptor asks for.
    #[must_use]
    pub fn requested(&self) -> usize {
        self.sources.len() + self.base.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_counts_base() {
        let s = Source {
            sources: vec!["a".into(), "b".into()],
            base: vec!["c".into()],
            ..Source::default()
        };
        assert_eq!(s.requested(), 3);
    }

    #[test]
    fn test_symbolize_mode_from_str() {
        assert_eq!(SymbolizeMode::from_str("force", true).unwrap(), SymbolizeMode::Force);
        assert_eq!(SymbolizeMode::default(), SymbolizeMode::Local);
    }
}
