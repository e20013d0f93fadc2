//! Profile fixtures for unit tests

use crate::profile::{Function, Line, Location, Mapping, Profile, Sample, ValueType};

/// Two-frame CPU profile: `main` calls `work` inside one mapped binary.
///
/// Sample 0 is `[work, main]` with values `[2, 100]`, sample 1 is `[main]`
/// with values `[1, 50]`.
pub fn cpu_profile(file: &str, build_id: &str) -> Profile {
    Profile {
        sample_types: vec![ValueType::new("samples", "count"), ValueType::new("cpu", "nanoseconds")],
        samples: vec![
            Sample { location_ids: vec![1, 2], values: vec![2, 100], labels: vec![] },
            Sample { location_ids: vec![2], values: vec![1, 50], labels: vec![] },
        ],
        mappings: vec![Mapping {
            id: 1,
            start: 0x40_0000,
            limit: 0x48_0000,
            offset: 0,
            file: file.to_string(),
            build_id: build_id.to_string(),
            has_functions: true,
            ..Mapping::default()
        }],
        locations: vec![
            Location {
                id: 1,
                mapping_id: 1,
                address: 0x40_1100,
                lines: vec![Line { function_id: 2, line: 12 }],
                is_folded: false,
            },
            Location {
                id: 2,
                mapping_id: 1,
                address: 0x40_1200,
                lines: vec![Line { function_id: 1, line: 30 }],
                is_folded: false,
            },
        ],
        functions: vec![
            Function {
                id: 1,
                name: "main".to_string(),
                system_name: "main".to_string(),
                filename: "src/main.c".to_string(),
                start_line: 28,
            },
            Function {
                id: 2,
                name: "work".to_string(),
                system_name: "work".to_string(),
                filename: "src/work.c".to_string(),
                start_line: 10,
            },
        ],
        duration_nanos: 10_000_000_000,
        time_nanos: 1_700_000_000_000_000_000,
        period_type: Some(ValueType::new("cpu", "nanoseconds")),
        period: 10_000_000,
        ..Profile::default()
    }
}
