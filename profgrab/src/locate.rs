//! Local binary resolution for profile mappings
//!
//! Every mapping is matched against the configured search path. A directory
//! per build id (`<path>/<build-id>/<name>`) is tried before a flat
//! `<path>/<name>` layout. Candidates whose build id disagrees with the
//! mapping's are skipped.

use std::path::{Path, PathBuf};

use log::debug;
use profgrab_profile::{Mapping, Profile};

use crate::binutils::ObjTool;
use crate::domain::Source;
use crate::ui::Ui;

/// Point each mapping's file at a matching local binary, when one exists.
///
/// The first mapping is taken to be the main executable and receives the
/// `exec_name` / `build_id` overrides of `source` before the search. Mappings
/// without a match are left as they are.
pub fn locate_binaries(
    profile: &mut Profile,
    source: &Source,
    search_path: &[PathBuf],
    obj: &dyn ObjTool,
    ui: &dyn Ui,
) {
    for (i, mapping) in profile.mappings.iter_mut().enumerate() {
        if i == 0 {
            if let Some(name) = source.exec_name.as_deref().filter(|n| !n.is_empty()) {
                mapping.file = name.to_string();
            }
            if let Some(id) = source.build_id.as_deref().filter(|id| !id.is_empty()) {
                mapping.build_id = id.to_string();
            }
        }

        if let Some(found) = find_binary(mapping, search_path, obj, ui) {
            debug!("mapping {} resolved to {}", mapping.id, found.display());
            mapping.file = found.to_string_lossy().into_owned();
        }
    }
}

fn find_binary(
    mapping: &Mapping,
    search_path: &[PathBuf],
    obj: &dyn ObjTool,
    ui: &dyn Ui,
) -> Option<PathBuf> {
    let base_name = Path::new(&mapping.file).file_name();

    for dir in search_path {
        for name in candidates(dir, &mapping.build_id, base_name) {
            let Ok(file) = obj.open(&name, mapping.start, mapping.limit, mapping.offset) else {
                continue;
            };
            let file_build_id = file.build_id();
            if !mapping.build_id.is_empty() && mapping.build_id != file_build_id {
                ui.print_err(&format!(
                    "Ignoring local file {}: build-id mismatch ({} != {file_build_id})",
                    name.display(),
                    mapping.build_id,
                ));
                continue;
            }
            return Some(name);
        }
    }

    None
}

fn candidates(dir: &Path, build_id: &str, base_name: Option<&std::ffi::OsStr>) -> Vec<PathBuf> {
    let mut names = Vec::new();

    if !build_id.is_empty() {
        let id_dir = dir.join(build_id);
        if let Some(base) = base_name {
            names.push(id_dir.join(base));
        }
        let pattern = format!(
            "{}/*",
            glob::Pattern::escape(&id_dir.to_string_lossy())
        );
        if let Ok(paths) = glob::glob(&pattern) {
            names.extend(paths.filter_map(Result::ok));
        }
    }
    if let Some(base) = base_name {
        names.push(dir.join(base));
    }

    names
}
