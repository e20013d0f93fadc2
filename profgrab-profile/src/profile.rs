//! In-memory profile representation
//!
//! Strings are resolved out of the wire string table and objects refer to each
//! other by id, the same ids carried on the wire. Ids are non-zero and unique
//! per object kind once [`Profile::check_valid`] has passed.

use std::collections::HashSet;
use std::fmt;

use crate::error::ProfileError;

/// A (type, unit) pair such as `cpu/nanoseconds` or `alloc_space/bytes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ValueType {
    pub kind: String,
    pub unit: String,
}

impl ValueType {
    pub fn new(kind: impl Into<String>, unit: impl Into<String>) -> Self {
        Self { kind: kind.into(), unit: unit.into() }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.unit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    pub key: String,
    pub str: String,
    pub num: i64,
    pub num_unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sample {
    /// Leaf first.
    pub location_ids: Vec<u64>,
    pub values: Vec<i64>,
    pub labels: Vec<Label>,
}

/// One binary image mapped into the profiled address space.
///
/// `mappings[0]` of a profile is the main executable by convention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    pub id: u64,
    pub start: u64,
    pub limit: u64,
    pub offset: u64,
    pub file: String,
    pub build_id: String,
    pub has_functions: bool,
    pub has_filenames: bool,
    pub has_line_numbers: bool,
    pub has_inline_frames: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Line {
    pub function_id: u64,
    pub line: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub id: u64,
    /// Zero when the location has no mapping.
    pub mapping_id: u64,
    pub address: u64,
    /// Innermost inlined frame first.
    pub lines: Vec<Line>,
    pub is_folded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Function {
    pub id: u64,
    pub name: String,
    pub system_name: String,
    pub filename: String,
    pub start_line: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub sample_types: Vec<ValueType>,
    pub default_sample_type: String,
    pub samples: Vec<Sample>,
    pub mappings: Vec<Mapping>,
    pub locations: Vec<Location>,
    pub functions: Vec<Function>,
    pub drop_frames: String,
    pub keep_frames: String,
    pub time_nanos: i64,
    pub duration_nanos: i64,
    pub period_type: Option<ValueType>,
    pub period: i64,
    pub comments: Vec<String>,
}

impl Profile {
    /// Check that the profile is internally consistent.
    ///
    /// # Errors
    /// Returns [`ProfileError::Invalid`] describing the first inconsistency found
    pub fn check_valid(&self) -> Result<(), ProfileError> {
        let types = self.sample_types.len();
        if types == 0 && !self.samples.is_empty() {
            return Err(invalid("missing sample type information"));
        }

        let mapping_ids = unique_ids("mapping", self.mappings.iter().map(|m| m.id))?;
        let function_ids = unique_ids("function", self.functions.iter().map(|f| f.id))?;
        let location_ids = unique_ids("location", self.locations.iter().map(|l| l.id))?;

        for (i, sample) in self.samples.iter().enumerate() {
            if sample.values.len() != types {
                return Err(invalid(format!(
                    "mismatch: sample {i} has {} values vs. {types} types",
                    sample.values.len()
                )));
            }
            if let Some(id) = sample.location_ids.iter().find(|id| !location_ids.contains(id)) {
                return Err(invalid(format!("sample {i} references unknown location {id}")));
            }
        }

        for loc in &self.locations {
            if loc.mapping_id != 0 && !mapping_ids.contains(&loc.mapping_id) {
                return Err(invalid(format!(
                    "location {} references unknown mapping {}",
                    loc.id, loc.mapping_id
                )));
            }
            for line in &loc.lines {
                if !function_ids.contains(&line.function_id) {
                    return Err(invalid(format!(
                        "location {} references unknown function {}",
                        loc.id, line.function_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Multiply every sample value by `ratio`.
    pub fn scale(&mut self, ratio: f64) {
        if (ratio - 1.0).abs() < f64::EPSILON {
            return;
        }
        let ratios = vec![ratio; self.sample_types.len()];
        // Arity matches by construction
        let _ = self.scale_n(&ratios);
    }

    /// Multiply each sample value by the ratio of its sample type.
    ///
    /// Values are rounded to the nearest integer. Samples left with only zero
    /// values are removed.
    ///
    /// # Errors
    /// Returns an error if `ratios` does not have one entry per sample type
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::float_cmp)]
    pub fn scale_n(&mut self, ratios: &[f64]) -> Result<(), ProfileError> {
        if ratios.len() != self.sample_types.len() {
            return Err(ProfileError::RatioCount(ratios.len(), self.sample_types.len()));
        }
        if ratios.iter().all(|r| *r == 1.0) {
            return Ok(());
        }
        self.samples.retain_mut(|sample| {
            for (value, ratio) in sample.values.iter_mut().zip(ratios) {
                if *ratio != 1.0 {
                    *value = (*value as f64 * ratio).round() as i64;
                }
            }
            sample.values.iter().any(|v| *v != 0)
        });
        Ok(())
    }

    /// Sum of every sample's value at `index`.
    #[must_use]
    pub fn total(&self, index: usize) -> i64 {
        self.samples.iter().filter_map(|s| s.values.get(index)).sum()
    }
}

fn invalid(msg: impl Into<String>) -> ProfileError {
    ProfileError::Invalid(msg.into())
}

fn unique_ids(
    kind: &str,
    ids: impl Iterator<Item = u64>,
) -> Result<HashSet<u64>, ProfileError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id == 0 {
            return Err(invalid(format!("found {kind} with reserved id 0")));
        }
        if !seen.insert(id) {
            return Err(invalid(format!("multiple {kind}s with id {id}")));
        }
    }
    Ok(seen)
}
