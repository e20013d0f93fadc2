//! Conversion between [`Profile`] and the gzip'd protobuf wire format

use std::collections::HashMap;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use prost::Message;

use crate::error::ProfileError;
use crate::profile::{Function, Label, Line, Location, Mapping, Profile, Sample, ValueType};
use crate::proto;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

impl Profile {
    /// Decode a profile, inflating it first if it is gzip-compressed.
    ///
    /// # Errors
    /// Returns an error on empty input, corrupt compression, undecodable
    /// protobuf or out-of-range string table references
    pub fn parse(data: &[u8]) -> Result<Self, ProfileError> {
        if data.is_empty() {
            return Err(ProfileError::Empty);
        }
        if data.starts_with(&GZIP_MAGIC) {
            let mut raw = Vec::new();
            GzDecoder::new(data).read_to_end(&mut raw)?;
            return Self::parse_uncompressed(&raw);
        }
        Self::parse_uncompressed(data)
    }

    /// Read a whole stream and decode it with [`Profile::parse`].
    ///
    /// # Errors
    /// Returns an error if reading fails or the data does not decode
    pub fn parse_reader<R: Read>(mut reader: R) -> Result<Self, ProfileError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::parse(&data)
    }

    fn parse_uncompressed(data: &[u8]) -> Result<Self, ProfileError> {
        if data.is_empty() {
            return Err(ProfileError::Empty);
        }
        let wire = proto::Profile::decode(data)?;
        Decoder::new(&wire.string_table)?.profile(&wire)
    }

    /// Encode the profile as uncompressed protobuf.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        Encoder::default().profile(self).encode_to_vec()
    }

    /// Write the profile gzip-compressed, the on-disk pprof format.
    ///
    /// # Errors
    /// Returns an error if writing to `w` fails
    pub fn write<W: Write>(&self, w: W) -> Result<(), ProfileError> {
        let mut gz = GzEncoder::new(w, Compression::default());
        gz.write_all(&self.encode())?;
        gz.finish()?.flush()?;
        Ok(())
    }
}

struct Decoder<'a> {
    strings: &'a [String],
}

impl<'a> Decoder<'a> {
    fn new(strings: &'a [String]) -> Result<Self, ProfileError> {
        if strings.first().is_some_and(|s| !s.is_empty()) {
            return Err(ProfileError::StringTable);
        }
        Ok(Self { strings })
    }

    fn str(&self, index: i64) -> Result<String, ProfileError> {
        if index == 0 && self.strings.is_empty() {
            return Ok(String::new());
        }
        usize::try_from(index)
            .ok()
            .and_then(|i| self.strings.get(i))
            .cloned()
            .ok_or(ProfileError::StringIndex { index, len: self.strings.len() })
    }

    fn value_type(&self, vt: &proto::ValueType) -> Result<ValueType, ProfileError> {
        Ok(ValueType { kind: self.str(vt.r#type)?, unit: self.str(vt.unit)? })
    }

    fn profile(&self, wire: &proto::Profile) -> Result<Profile, ProfileError> {
        let sample_types =
            wire.sample_type.iter().map(|vt| self.value_type(vt)).collect::<Result<_, _>>()?;

        let samples = wire
            .sample
            .iter()
            .map(|s| {
                let labels = s
                    .label
                    .iter()
                    .map(|l| {
                        Ok(Label {
                            key: self.str(l.key)?,
                            str: self.str(l.str)?,
                            num: l.num,
                            num_unit: self.str(l.num_unit)?,
                        })
                    })
                    .collect::<Result<_, ProfileError>>()?;
                Ok(Sample { location_ids: s.location_id.clone(), values: s.value.clone(), labels })
            })
            .collect::<Result<_, ProfileError>>()?;

        let mappings = wire
            .mapping
            .iter()
            .map(|m| {
                Ok(Mapping {
                    id: m.id,
                    start: m.memory_start,
                    limit: m.memory_limit,
                    offset: m.file_offset,
                    file: self.str(m.filename)?,
                    build_id: self.str(m.build_id)?,
                    has_functions: m.has_functions,
                    has_filenames: m.has_filenames,
                    has_line_numbers: m.has_line_numbers,
                    has_inline_frames: m.has_inline_frames,
                })
            })
            .collect::<Result<_, ProfileError>>()?;

        let locations = wire
            .location
            .iter()
            .map(|l| Location {
                id: l.id,
                mapping_id: l.mapping_id,
                address: l.address,
                lines: l
                    .line
                    .iter()
                    .map(|ln| Line { function_id: ln.function_id, line: ln.line })
                    .collect(),
                is_folded: l.is_folded,
            })
            .collect();

        let functions = wire
            .function
            .iter()
            .map(|f| {
                Ok(Function {
                    id: f.id,
                    name: self.str(f.name)?,
                    system_name: self.str(f.system_name)?,
                    filename: self.str(f.filename)?,
                    start_line: f.start_line,
                })
            })
            .collect::<Result<_, ProfileError>>()?;

        Ok(Profile {
            sample_types,
            default_sample_type: self.str(wire.default_sample_type)?,
            samples,
            mappings,
            locations,
            functions,
            drop_frames: self.str(wire.drop_frames)?,
            keep_frames: self.str(wire.keep_frames)?,
            time_nanos: wire.time_nanos,
            duration_nanos: wire.duration_nanos,
            period_type: wire.period_type.as_ref().map(|vt| self.value_type(vt)).transpose()?,
            period: wire.period,
            comments: wire.comment.iter().map(|c| self.str(*c)).collect::<Result<_, _>>()?,
        })
    }
}

/// Builds the string table while converting back to wire messages.
struct Encoder {
    strings: Vec<String>,
    index: HashMap<String, i64>,
}

impl Default for Encoder {
    fn default() -> Self {
        let mut index = HashMap::new();
        index.insert(String::new(), 0);
        Self { strings: vec![String::new()], index }
    }
}

impl Encoder {
    #[allow(clippy::cast_possible_wrap)]
    fn str(&mut self, s: &str) -> i64 {
        if let Some(i) = self.index.get(s) {
            return *i;
        }
        let i = self.strings.len() as i64;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), i);
        i
    }

    fn value_type(&mut self, vt: &ValueType) -> proto::ValueType {
        proto::ValueType { r#type: self.str(&vt.kind), unit: self.str(&vt.unit) }
    }

    fn profile(mut self, p: &Profile) -> proto::Profile {
        let sample_type = p.sample_types.iter().map(|vt| self.value_type(vt)).collect();
        let sample = p
            .samples
            .iter()
            .map(|s| proto::Sample {
                location_id: s.location_ids.clone(),
                value: s.values.clone(),
                label: s
                    .labels
                    .iter()
                    .map(|l| proto::Label {
                        key: self.str(&l.key),
                        str: self.str(&l.str),
                        num: l.num,
                        num_unit: self.str(&l.num_unit),
                    })
                    .collect(),
            })
            .collect();
        let mapping = p
            .mappings
            .iter()
            .map(|m| proto::Mapping {
                id: m.id,
                memory_start: m.start,
                memory_limit: m.limit,
                file_offset: m.offset,
                filename: self.str(&m.file),
                build_id: self.str(&m.build_id),
                has_functions: m.has_functions,
                has_filenames: m.has_filenames,
                has_line_numbers: m.has_line_numbers,
                has_inline_frames: m.has_inline_frames,
            })
            .collect();
        let location = p
            .locations
            .iter()
            .map(|l| proto::Location {
                id: l.id,
                mapping_id: l.mapping_id,
                address: l.address,
                line: l
                    .lines
                    .iter()
                    .map(|ln| proto::Line { function_id: ln.function_id, line: ln.line })
                    .collect(),
                is_folded: l.is_folded,
            })
            .collect();
        let function = p
            .functions
            .iter()
            .map(|f| proto::Function {
                id: f.id,
                name: self.str(&f.name),
                system_name: self.str(&f.system_name),
                filename: self.str(&f.filename),
                start_line: f.start_line,
            })
            .collect();
        let period_type = p.period_type.as_ref().map(|vt| self.value_type(vt));
        let comment = p.comments.iter().map(|c| self.str(c)).collect();
        let drop_frames = self.str(&p.drop_frames);
        let keep_frames = self.str(&p.keep_frames);
        let default_sample_type = self.str(&p.default_sample_type);

        proto::Profile {
            sample_type,
            sample,
            mapping,
            location,
            function,
            string_table: self.strings,
            drop_frames,
            keep_frames,
            time_nanos: p.time_nanos,
            duration_nanos: p.duration_nanos,
            period_type,
            period: p.period,
            comment,
            default_sample_type,
        }
    }
}
