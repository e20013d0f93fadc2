//! Structured error types for profile decoding, validation and merging

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("empty input file")]
    Empty,

    #[error("decoding profile: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("string table index {index} out of range ({len} entries)")]
    StringIndex { index: i64, len: usize },

    #[error("malformed string table: first entry must be empty")]
    StringTable,

    #[error("invalid profile: {0}")]
    Invalid(String),

    #[error("incompatible {what}: {left} and {right}")]
    Incompatible { what: &'static str, left: String, right: String },

    #[error("inconsistent sample type count: {0} != {1}")]
    SampleTypeCount(usize, usize),

    #[error("{0} ratios for {1} sample types")]
    RatioCount(usize, usize),

    #[error("no profiles to merge")]
    NothingToMerge,

    #[error("invalid frame pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
