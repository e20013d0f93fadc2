//! Unit-aware rescaling across profiles
//!
//! Profiles collected by different agents may report the same quantity in
//! different units (`milliseconds` vs `nanoseconds`, `kilobytes` vs `bytes`).
//! Before merging, every profile is converted to the finest unit present for
//! each sample type.

use crate::error::ProfileError;
use crate::profile::{Profile, ValueType};

/// Conversion factors to the smallest unit of a family.
struct UnitFamily {
    units: &'static [(&'static [&'static str], f64)],
}

const TIME: UnitFamily = UnitFamily {
    units: &[
        (&["nanosecond", "ns"], 1.0),
        (&["microsecond", "us", "µs"], 1e3),
        (&["millisecond", "ms"], 1e6),
        (&["second", "s", "sec"], 1e9),
        (&["minute", "min"], 60e9),
        (&["hour", "h"], 3600e9),
        (&["day", "d"], 86_400e9),
        (&["week", "wk"], 604_800e9),
        (&["year", "yr"], 31_536_000e9),
    ],
};

const MEMORY: UnitFamily = UnitFamily {
    units: &[
        (&["byte", "b"], 1.0),
        (&["kilobyte", "kb"], 1024.0),
        (&["megabyte", "mb"], 1024.0 * 1024.0),
        (&["gigabyte", "gb"], 1024.0 * 1024.0 * 1024.0),
        (&["terabyte", "tb"], 1024.0 * 1024.0 * 1024.0 * 1024.0),
        (&["petabyte", "pb"], 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ],
};

impl UnitFamily {
    fn factor(&self, unit: &str) -> Option<f64> {
        let unit = unit.to_lowercase();
        let singular = unit.strip_suffix('s').filter(|u| !u.is_empty()).unwrap_or(&unit);
        self.units
            .iter()
            .find(|(names, _)| names.contains(&unit.as_str()) || names.contains(&singular))
            .map(|(_, factor)| *factor)
    }

    fn contains(&self, unit: &str) -> bool {
        self.factor(unit).is_some()
    }
}

/// Ratio that converts a value in `from` units to `to` units.
///
/// Units outside the known families (`count`, `samples`, ...) convert 1:1.
#[must_use]
pub fn ratio(from: &str, to: &str) -> f64 {
    for family in [&TIME, &MEMORY] {
        if let (Some(f), Some(t)) = (family.factor(from), family.factor(to)) {
            return f / t;
        }
    }
    1.0
}

fn compatible(a: &ValueType, b: &ValueType) -> bool {
    // Trailing 's' tolerated to permit minor mismatches
    if a.kind.trim_end_matches('s') != b.kind.trim_end_matches('s') {
        return false;
    }
    a.unit == b.unit
        || (TIME.contains(&a.unit) && TIME.contains(&b.unit))
        || (MEMORY.contains(&a.unit) && MEMORY.contains(&b.unit))
}

/// Finest of a set of compatible value types, or `None` when there is
/// nothing to reconcile.
///
/// # Errors
/// Returns [`ProfileError::Incompatible`] if two types cannot be reconciled
pub fn common_value_type(
    types: &[Option<&ValueType>],
) -> Result<Option<ValueType>, ProfileError> {
    let present: Vec<&ValueType> = types.iter().flatten().copied().collect();
    if present.len() <= 1 {
        return Ok(None);
    }
    let mut finest = present[0];
    for &vt in &present[1..] {
        if !compatible(finest, vt) {
            return Err(ProfileError::Incompatible {
                what: "types",
                left: finest.to_string(),
                right: vt.to_string(),
            });
        }
        if ratio(&vt.unit, &finest.unit) < 1.0 {
            finest = vt;
        }
    }
    Ok(Some(finest.clone()))
}

/// Convert all profiles to common units for their period and sample types.
///
/// # Errors
/// Returns an error if the profiles disagree on the number of sample types
/// or carry incompatible types at the same position
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn scale_profiles(profiles: &mut [Profile]) -> Result<(), ProfileError> {
    let Some(first) = profiles.first() else {
        return Ok(());
    };

    let period_types: Vec<Option<&ValueType>> =
        profiles.iter().map(|p| p.period_type.as_ref()).collect();
    let period_type = common_value_type(&period_types).map_err(|e| rename(e, "period types"))?;

    let count = first.sample_types.len();
    if let Some(p) = profiles.iter().find(|p| p.sample_types.len() != count) {
        return Err(ProfileError::SampleTypeCount(count, p.sample_types.len()));
    }
    let sample_types = (0..count)
        .map(|i| {
            let column: Vec<Option<&ValueType>> =
                profiles.iter().map(|p| Some(&p.sample_types[i])).collect();
            common_value_type(&column).map_err(|e| rename(e, "sample types"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for p in profiles.iter_mut() {
        if let (Some(own), Some(common)) = (p.period_type.as_mut(), period_type.as_ref()) {
            p.period = (p.period as f64 * ratio(&own.unit, &common.unit)) as i64;
            own.unit.clone_from(&common.unit);
        }
        let ratios: Vec<f64> = p
            .sample_types
            .iter_mut()
            .zip(&sample_types)
            .map(|(own, common)| match common {
                Some(common) => {
                    let r = ratio(&own.unit, &common.unit);
                    own.unit.clone_from(&common.unit);
                    r
                }
                None => 1.0,
            })
            .collect();
        p.scale_n(&ratios)?;
    }
    Ok(())
}

fn rename(err: ProfileError, what: &'static str) -> ProfileError {
    match err {
        ProfileError::Incompatible { left, right, .. } => {
            ProfileError::Incompatible { what, left, right }
        }
        other => other,
    }
}
