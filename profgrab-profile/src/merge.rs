//! Structural merge of several profiles into one
//!
//! Mappings, functions and locations are deduplicated across inputs and
//! renumbered; samples with the same stack and labels are folded by summing
//! their values. Inputs must already share sample types and units (see
//! [`crate::measurement::scale_profiles`]).

use std::collections::{HashMap, HashSet};

use crate::error::ProfileError;
use crate::profile::{Function, Label, Line, Location, Mapping, Profile, Sample, ValueType};

/// Mapping sizes are rounded up to this boundary before comparison so that
/// minor differences in reported limits do not split a binary in two.
const MAPSIZE_ROUNDING: u64 = 0x1000;

/// Merge `profiles` into a single new profile.
///
/// The first mapping of the first profile that has mappings stays first in
/// the result, preserving the main-executable convention.
///
/// # Errors
/// Returns an error for an empty input or when headers are incompatible
pub fn merge(profiles: &[Profile]) -> Result<Profile, ProfileError> {
    let mut merged = merge_once(profiles)?;
    if merged.samples.iter().any(is_zero_sample) {
        // Re-merge to drop zero samples along with anything only they referenced
        merged = merge_once(std::slice::from_ref(&merged))?;
    }
    Ok(merged)
}

fn merge_once(profiles: &[Profile]) -> Result<Profile, ProfileError> {
    let mut out = combine_headers(profiles)?;
    let mut merger = Merger::default();
    for src in profiles {
        merger.begin(src);
        if merger.mappings.is_empty() {
            if let Some(main) = src.mappings.first() {
                merger.map_mapping(src, main.id);
            }
        }
        for sample in src.samples.iter().filter(|s| !is_zero_sample(s)) {
            merger.map_sample(src, sample);
        }
    }
    out.samples = merger.samples;
    out.mappings = merger.mappings;
    out.locations = merger.locations;
    out.functions = merger.functions;
    Ok(out)
}

fn is_zero_sample(s: &Sample) -> bool {
    s.values.iter().all(|v| *v == 0)
}

fn combine_headers(profiles: &[Profile]) -> Result<Profile, ProfileError> {
    let (first, rest) = profiles.split_first().ok_or(ProfileError::NothingToMerge)?;
    for p in rest {
        compatible(first, p)?;
    }

    let mut out = Profile {
        sample_types: first.sample_types.clone(),
        period_type: first.period_type.clone(),
        drop_frames: first.drop_frames.clone(),
        keep_frames: first.keep_frames.clone(),
        ..Profile::default()
    };
    let mut seen_comments = HashSet::new();
    for p in profiles {
        if out.time_nanos == 0 || p.time_nanos < out.time_nanos {
            out.time_nanos = p.time_nanos;
        }
        out.duration_nanos += p.duration_nanos;
        out.period = out.period.max(p.period);
        for c in &p.comments {
            if seen_comments.insert(c.as_str()) {
                out.comments.push(c.clone());
            }
        }
        if out.default_sample_type.is_empty() {
            out.default_sample_type.clone_from(&p.default_sample_type);
        }
    }
    Ok(out)
}

fn compatible(a: &Profile, b: &Profile) -> Result<(), ProfileError> {
    if a.period_type != b.period_type {
        return Err(ProfileError::Incompatible {
            what: "period types",
            left: describe(a.period_type.as_ref()),
            right: describe(b.period_type.as_ref()),
        });
    }
    if a.sample_types != b.sample_types {
        return Err(ProfileError::Incompatible {
            what: "sample types",
            left: list(&a.sample_types),
            right: list(&b.sample_types),
        });
    }
    Ok(())
}

fn describe(vt: Option<&ValueType>) -> String {
    vt.map_or_else(|| "<none>".to_string(), ToString::to_string)
}

fn list(types: &[ValueType]) -> String {
    let names: Vec<String> = types.iter().map(ToString::to_string).collect();
    format!("[{}]", names.join(" "))
}

#[derive(PartialEq, Eq, Hash)]
struct MappingKey {
    size: u64,
    offset: u64,
    build_id_or_file: String,
}

impl MappingKey {
    fn of(m: &Mapping) -> Self {
        let size = m.limit.saturating_sub(m.start).div_ceil(MAPSIZE_ROUNDING) * MAPSIZE_ROUNDING;
        let build_id_or_file = if m.build_id.is_empty() { m.file.clone() } else { m.build_id.clone() };
        Self { size, offset: m.offset, build_id_or_file }
    }
}

#[derive(PartialEq, Eq, Hash)]
struct FunctionKey {
    start_line: i64,
    name: String,
    system_name: String,
    filename: String,
}

#[derive(PartialEq, Eq, Hash)]
struct LocationKey {
    mapping_id: u64,
    address: u64,
    lines: Vec<Line>,
    is_folded: bool,
}

#[derive(PartialEq, Eq, Hash)]
struct SampleKey {
    location_ids: Vec<u64>,
    labels: Vec<Label>,
}

/// Merged mapping plus the shift from source to merged address space.
#[derive(Clone, Copy)]
struct MappedMapping {
    id: u64,
    delta: i128,
}

#[derive(Default)]
struct Merger {
    samples: Vec<Sample>,
    mappings: Vec<Mapping>,
    locations: Vec<Location>,
    functions: Vec<Function>,

    sample_index: HashMap<SampleKey, usize>,
    mapping_keys: HashMap<MappingKey, usize>,
    location_keys: HashMap<LocationKey, u64>,
    function_keys: HashMap<FunctionKey, u64>,

    // Per-source id translation, reset by `begin`
    mappings_by_src: HashMap<u64, MappedMapping>,
    locations_by_src: HashMap<u64, u64>,
    functions_by_src: HashMap<u64, u64>,
    src_locations: HashMap<u64, usize>,
    src_functions: HashMap<u64, usize>,
    src_mappings: HashMap<u64, usize>,
}

impl Merger {
    fn begin(&mut self, src: &Profile) {
        self.mappings_by_src.clear();
        self.locations_by_src.clear();
        self.functions_by_src.clear();
        self.src_locations = src.locations.iter().enumerate().map(|(i, l)| (l.id, i)).collect();
        self.src_functions = src.functions.iter().enumerate().map(|(i, f)| (f.id, i)).collect();
        self.src_mappings = src.mappings.iter().enumerate().map(|(i, m)| (m.id, i)).collect();
    }

    fn map_sample(&mut self, src: &Profile, sample: &Sample) {
        let location_ids: Vec<u64> =
            sample.location_ids.iter().filter_map(|id| self.map_location(src, *id)).collect();
        let mut labels = sample.labels.clone();
        labels.sort();
        let key = SampleKey { location_ids, labels };

        if let Some(&i) = self.sample_index.get(&key) {
            for (acc, v) in self.samples[i].values.iter_mut().zip(&sample.values) {
                *acc += v;
            }
            return;
        }
        self.sample_index.insert(
            SampleKey { location_ids: key.location_ids.clone(), labels: key.labels.clone() },
            self.samples.len(),
        );
        self.samples.push(Sample {
            location_ids: key.location_ids,
            values: sample.values.clone(),
            labels: sample.labels.clone(),
        });
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn map_location(&mut self, src: &Profile, id: u64) -> Option<u64> {
        if let Some(&mapped) = self.locations_by_src.get(&id) {
            return Some(mapped);
        }
        let loc = &src.locations[*self.src_locations.get(&id)?];

        let (mapping_id, address) = match loc.mapping_id {
            0 => (0, loc.address),
            mid => {
                let mm = self.map_mapping(src, mid)?;
                (mm.id, (i128::from(loc.address) + mm.delta) as u64)
            }
        };
        let lines: Vec<Line> = loc
            .lines
            .iter()
            .filter_map(|ln| {
                Some(Line { function_id: self.map_function(src, ln.function_id)?, line: ln.line })
            })
            .collect();

        // Addresses are keyed relative to their mapping so that profiles
        // loaded at different bases still share locations.
        let relative = match mapping_id {
            0 => address,
            mid => address.wrapping_sub(self.mappings[(mid - 1) as usize].start),
        };
        let key = LocationKey { mapping_id, address: relative, lines, is_folded: loc.is_folded };
        if let Some(&existing) = self.location_keys.get(&key) {
            self.locations_by_src.insert(id, existing);
            return Some(existing);
        }

        let new_id = self.locations.len() as u64 + 1;
        self.locations.push(Location {
            id: new_id,
            mapping_id,
            address,
            lines: key.lines.clone(),
            is_folded: loc.is_folded,
        });
        self.location_keys.insert(key, new_id);
        self.locations_by_src.insert(id, new_id);
        Some(new_id)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn map_mapping(&mut self, src: &Profile, id: u64) -> Option<MappedMapping> {
        if let Some(&mm) = self.mappings_by_src.get(&id) {
            return Some(mm);
        }
        let m = &src.mappings[*self.src_mappings.get(&id)?];
        let key = MappingKey::of(m);

        let index = if let Some(&i) = self.mapping_keys.get(&key) {
            i
        } else {
            let i = self.mappings.len();
            self.mappings.push(Mapping { id: i as u64 + 1, ..m.clone() });
            self.mapping_keys.insert(key, i);
            i
        };
        let merged = &mut self.mappings[index];
        // Symbolization state is the union of what every source knew
        merged.has_functions |= m.has_functions;
        merged.has_filenames |= m.has_filenames;
        merged.has_line_numbers |= m.has_line_numbers;
        merged.has_inline_frames |= m.has_inline_frames;

        let mm = MappedMapping {
            id: merged.id,
            delta: i128::from(merged.start) - i128::from(m.start),
        };
        self.mappings_by_src.insert(id, mm);
        Some(mm)
    }

    fn map_function(&mut self, src: &Profile, id: u64) -> Option<u64> {
        if let Some(&mapped) = self.functions_by_src.get(&id) {
            return Some(mapped);
        }
        let f = &src.functions[*self.src_functions.get(&id)?];
        let key = FunctionKey {
            start_line: f.start_line,
            name: f.name.clone(),
            system_name: f.system_name.clone(),
            filename: f.filename.clone(),
        };
        let new_id = if let Some(&existing) = self.function_keys.get(&key) {
            existing
        } else {
            let new_id = self.functions.len() as u64 + 1;
            self.functions.push(Function { id: new_id, ..f.clone() });
            self.function_keys.insert(key, new_id);
            new_id
        };
        self.functions_by_src.insert(id, new_id);
        Some(new_id)
    }
}
