use profgrab_profile::{measurement, merge, Profile, ProfileError};

use super::sources::MappingSources;

/// Bring `profiles` to common units and merge them, concatenating their
/// mapping sources in input order.
///
/// # Errors
/// Returns an error if the profiles have incompatible sample or period types.
pub fn combine_profiles(
    mut profiles: Vec<Profile>,
    sources: Vec<MappingSources>,
) -> Result<(Profile, MappingSources), ProfileError> {
    measurement::scale_profiles(&mut profiles)?;

    let mut merged_sources = MappingSources::default();
    for s in sources {
        merged_sources.extend(s);
    }

    Ok((merge(&profiles)?, merged_sources))
}
