//! Frame pruning driven by the profile's own `drop_frames` / `keep_frames`

use std::collections::HashSet;

use regex::Regex;

use crate::error::ProfileError;
use crate::profile::Profile;

impl Profile {
    /// Remove frames the profile itself marked as uninteresting.
    ///
    /// Both patterns must match the whole function name.
    ///
    /// # Errors
    /// Returns an error if either pattern is not a valid regex
    pub fn remove_uninteresting(&mut self) -> Result<(), ProfileError> {
        if self.drop_frames.is_empty() {
            return Ok(());
        }
        let drop = Regex::new(&format!("^({})$", self.drop_frames))?;
        let keep = if self.keep_frames.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("^({})$", self.keep_frames))?)
        };
        self.prune(&drop, keep.as_ref());
        Ok(())
    }

    /// Remove every frame matching `drop` (and not `keep`) along with all
    /// frames beneath it towards the leaf.
    pub fn prune(&mut self, drop: &Regex, keep: Option<&Regex>) {
        let mut prune = HashSet::new();
        let mut prune_beneath = HashSet::new();

        let names: std::collections::HashMap<u64, &str> =
            self.functions.iter().map(|f| (f.id, f.name.as_str())).collect();

        for loc in &mut self.locations {
            // Lines run innermost first; scan from the outermost caller
            let hit = loc.lines.iter().rposition(|ln| {
                names.get(&ln.function_id).is_some_and(|name| {
                    !name.is_empty()
                        && drop.is_match(name)
                        && !keep.is_some_and(|k| k.is_match(name))
                })
            });
            let Some(i) = hit else { continue };

            prune_beneath.insert(loc.id);
            if i == loc.lines.len() - 1 {
                prune.insert(loc.id);
            } else {
                loc.lines.drain(..=i);
            }
        }

        for sample in &mut self.samples {
            // Walk from the root; never prune before the first user frame
            let mut found_user = false;
            for i in (0..sample.location_ids.len()).rev() {
                let id = sample.location_ids[i];
                if !prune.contains(&id) && !prune_beneath.contains(&id) {
                    found_user = true;
                    continue;
                }
                if !found_user {
                    continue;
                }
                if prune.contains(&id) {
                    sample.location_ids.drain(..=i);
                } else {
                    sample.location_ids.drain(..i);
                }
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::cpu_profile;

    #[test]
    fn test_no_drop_frames_is_noop() {
        let mut p = cpu_profile("/bin/app", "abc123");
        let before = p.clone();
        p.remove_uninteresting().unwrap();
        assert_eq!(p, before);
    }

    #[test]
    fn test_drop_leaf_frame() {
        // Stack of sample 0 is [work (leaf), main]
        let mut p = cpu_profile("/bin/app", "abc123");
        p.drop_frames = "work".to_string();
        p.remove_uninteresting().unwrap();
        assert_eq!(p.samples[0].location_ids, vec![2]);
        // Sample 1 has only `main`
        assert_eq!(p.samples[1].location_ids, vec![2]);
    }

    #[test]
    fn test_keep_frames_wins() {
        let mut p = cpu_profile("/bin/app", "abc123");
        p.drop_frames = "work|main".to_string();
        p.keep_frames = "work".to_string();
        p.remove_uninteresting().unwrap();
        // `main` is the root, there is no user frame above it to keep
        assert_eq!(p.samples[0].location_ids, vec![1, 2]);
    }

    #[test]
    fn test_invalid_pattern() {
        let mut p = cpu_profile("/bin/app", "abc123");
        p.drop_frames = "(".to_string();
        assert!(p.remove_uninteresting().is_err());
    }
}
