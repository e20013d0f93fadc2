//! # Profile container
//!
//! In-memory model of a pprof profile plus the operations the fetch pipeline
//! needs from it:
//!
//! - [`Profile::parse`] / [`Profile::write`]: gzip'd protobuf codec
//! - [`Profile::check_valid`]: structural validation
//! - [`Profile::scale`] / [`Profile::scale_n`]: weight rescaling (negative
//!   ratios implement baseline subtraction)
//! - [`measurement::scale_profiles`]: bring several profiles to common units
//! - [`merge`]: structural merge with deduplication
//! - [`Profile::remove_uninteresting`]: `drop_frames` / `keep_frames` pruning
//!
//! ```text
//!  bytes ──parse──▶ Profile ──check_valid──▶ scale ──┐
//!                                                    ├─ scale_profiles ─▶ merge ─▶ Profile
//!  bytes ──parse──▶ Profile ──check_valid──▶ scale ──┘
//! ```

mod codec;
pub mod error;
pub mod measurement;
mod merge;
mod profile;
pub mod proto;
mod prune;

#[cfg(test)]
mod testing;

pub use error::ProfileError;
pub use merge::merge;
pub use profile::{Function, Label, Line, Location, Mapping, Profile, Sample, ValueType};
