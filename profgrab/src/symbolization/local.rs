//! In-place symbolization of a profile against local binaries

use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};
use profgrab_profile::{Function, Line, Profile};

use super::Symbolizer;
use crate::binutils::ObjTool;
use crate::domain::SymbolizeMode;

/// Where a mapping's binary is and how its addresses translate.
struct Target {
    id: u64,
    path: String,
    base: u64,
}

/// Fill in function and line information for locations of mappings that
/// point at readable local binaries.
///
/// With [`SymbolizeMode::Local`] only mappings without function information
/// are touched, and only their locations without lines. [`SymbolizeMode::Force`]
/// redoes every location of every resolvable mapping. Failures are logged and
/// the affected mapping is skipped.
///
/// Returns the number of locations that gained lines.
pub fn symbolize(profile: &mut Profile, mode: SymbolizeMode, obj: &dyn ObjTool) -> usize {
    if mode == SymbolizeMode::None {
        return 0;
    }
    let force = mode == SymbolizeMode::Force;

    let targets: Vec<Target> = profile
        .mappings
        .iter()
        .filter(|m| force || !m.has_functions)
        .filter(|m| !m.file.is_empty() && Path::new(&m.file).is_file())
        .filter_map(|m| {
            let file = match obj.open(Path::new(&m.file), m.start, m.limit, m.offset) {
                Ok(f) => f,
                Err(e) => {
                    debug!("skipping {}: {e:#}", m.file);
                    return None;
                }
            };
            if !m.build_id.is_empty() && !file.build_id().is_empty() && file.build_id() != m.build_id
            {
                warn!(
                    "skipping {}: build-id mismatch ({} != {})",
                    m.file,
                    m.build_id,
                    file.build_id()
                );
                return None;
            }
            Some(Target { id: m.id, path: m.file.clone(), base: file.base() })
        })
        .collect();

    let mut functions = FunctionTable::new(&profile.functions);
    let mut symbolized = 0;

    for target in targets {
        let symbolizer = match Symbolizer::new(&target.path) {
            Ok(s) => s,
            Err(e) => {
                warn!("cannot symbolize {}: {e:#}", target.path);
                continue;
            }
        };

        let mut has_filenames = false;
        let mut has_line_numbers = false;
        let mut has_inline_frames = false;

        for loc in profile.locations.iter_mut().filter(|l| l.mapping_id == target.id) {
            if !force && !loc.lines.is_empty() {
                continue;
            }
            let frames = symbolizer.resolve(loc.address.wrapping_sub(target.base));
            if frames.is_empty() {
                continue;
            }

            has_inline_frames |= frames.len() > 1;
            loc.lines = frames
                .into_iter()
                .map(|frame| {
                    let filename = frame.file.unwrap_or_default();
                    has_filenames |= !filename.is_empty();
                    has_line_numbers |= frame.line.is_some();
                    Line {
                        function_id: functions.intern(frame.name, frame.system_name, filename),
                        line: frame.line.map_or(0, i64::from),
                    }
                })
                .collect();
            symbolized += 1;
        }

        if let Some(m) = profile.mappings.iter_mut().find(|m| m.id == target.id) {
            m.has_functions = true;
            m.has_filenames |= has_filenames;
            m.has_line_numbers |= has_line_numbers;
            m.has_inline_frames |= has_inline_frames;
        }
    }

    profile.functions.extend(functions.added);
    symbolized
}

/// Functions keyed by name and file, handing out fresh ids for new ones.
struct FunctionTable {
    ids: HashMap<(String, String), u64>,
    next_id: u64,
    added: Vec<Function>,
}

impl FunctionTable {
    fn new(existing: &[Function]) -> Self {
        let ids = existing.iter().map(|f| ((f.name.clone(), f.filename.clone()), f.id)).collect();
        let next_id = existing.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        Self { ids, next_id, added: Vec::new() }
    }

    fn intern(&mut self, name: String, system_name: String, filename: String) -> u64 {
        let key = (name, filename);
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.added.push(Function {
            id,
            name: key.0.clone(),
            system_name,
            filename: key.1.clone(),
            start_line: 0,
        });
        self.ids.insert(key, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binutils::{Inst, ObjFile};
    use anyhow::{bail, Result};
    use profgrab_profile::{Location, Mapping};

    struct NoObjects;

    impl ObjTool for NoObjects {
        fn open(&self, _: &Path, _: u64, _: u64, _: u64) -> Result<Box<dyn ObjFile>> {
            bail!("not an object")
        }
        fn disassemble(&self, _: &Path, _: u64, _: u64) -> Result<Vec<Inst>> {
            Ok(Vec::new())
        }
    }

    fn profile(file: &str) -> Profile {
        Profile {
            mappings: vec![Mapping { id: 1, start: 0x1000, limit: 0x2000, file: file.into(), ..Mapping::default() }],
            locations: vec![Location { id: 1, mapping_id: 1, address: 0x1010, ..Location::default() }],
            ..Profile::default()
        }
    }

    #[test]
    fn test_none_mode_does_nothing() {
        let mut p = profile("/bin/sh");
        let before = p.clone();
        assert_eq!(symbolize(&mut p, SymbolizeMode::None, &NoObjects), 0);
        assert_eq!(p, before);
    }

    #[test]
    fn test_unopenable_mapping_is_skipped() {
        let mut p = profile("/definitely/not/here");
        let before = p.clone();
        assert_eq!(symbolize(&mut p, SymbolizeMode::Force, &NoObjects), 0);
        assert_eq!(p, before);
    }

    #[test]
    fn test_function_table_reuses_existing_ids() {
        let existing = vec![Function {
            id: 7,
            name: "main".into(),
            system_name: "main".into(),
            filename: "main.c".into(),
            start_line: 1,
        }];
        let mut table = FunctionTable::new(&existing);

        assert_eq!(table.intern("main".into(), "main".into(), "main.c".into()), 7);
        assert_eq!(table.intern("work".into(), "work".into(), "work.c".into()), 8);
        assert_eq!(table.intern("work".into(), "work".into(), "work.c".into()), 8);
        assert_eq!(table.added.len(), 1);
    }
}
