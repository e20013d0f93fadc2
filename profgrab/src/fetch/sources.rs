//! Mapping provenance for remote profiles

use std::collections::BTreeMap;

use profgrab_profile::Profile;
use serde::Serialize;

/// Where a mapping was seen: the origin URL and its start address there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingSource {
    pub source: String,
    pub start: u64,
}

/// Mapping key (build id, else file) to every origin that referenced it.
///
/// Entries only ever accumulate; merging registries appends per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MappingSources(BTreeMap<String, Vec<MappingSource>>);

impl MappingSources {
    /// Record every mapping of a profile fetched from `source`.
    ///
    /// A mapping with neither build id nor file gets `source` as its file so a
    /// later symbolization pass can still identify it.
    pub fn collect(profile: &mut Profile, source: &str) -> Self {
        let mut sources = Self::default();
        for m in &mut profile.mappings {
            let key = if !m.build_id.is_empty() {
                m.build_id.clone()
            } else if !m.file.is_empty() {
                m.file.clone()
            } else {
                m.file = source.to_string();
                source.to_string()
            };
            sources.0.entry(key).or_default().push(MappingSource {
                source: source.to_string(),
                start: m.start,
            });
        }
        sources
    }

    /// Append every entry of `other`, keeping `self`'s entries first.
    pub fn extend(&mut self, other: Self) {
        for (key, origins) in other.0 {
            self.0.entry(key).or_default().extend(origins);
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[MappingSource]> {
        self.0.get(key).map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MappingSource])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
