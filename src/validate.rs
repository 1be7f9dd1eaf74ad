//! Dots-data validator – stimulus filtering, payload decode, field-bound check.

use crate::codec::StoreError;
use crate::store::EventFile;
use crate::types::{fields, Event, Schema, StimulusDescriptor, ValidationReport, Value};
use bytes::Buf;
use log::debug;
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal validation failures.
///
/// Each one aborts the run immediately; nothing is downgraded to a warning
/// or skipped over. Callers that need to distinguish outcomes match on the
/// variant rather than parsing messages.
#[derive(Debug, Error)]
pub enum ValidateError {
    /// The dot payload decoded to the wrong number of floats: payload
    /// corruption or a schema mismatch, never silently truncated or padded.
    #[error("dot payload holds {actual} floats, expected {expected}")]
    PayloadLengthMismatch { expected: usize, actual: usize },

    /// A dot landed outside its declared circular field: a correctness bug
    /// in the upstream stimulus generator.
    #[error("dot {index} lies outside the field: |p|^2 = {distance_sq} > r^2 = {limit_sq}")]
    BoundaryViolation {
        index: usize,
        distance_sq: f32,
        limit_sq: f32,
    },

    /// Full traversal matched nothing: an empty/wrong file or a filter
    /// that never fired, treated as failure rather than silent success.
    #[error("no events matched the stimulus filter")]
    NoMatchingEvents,

    /// An event matched the filter but a required descriptor field is
    /// absent or wrongly typed.
    #[error("stimulus descriptor field `{field}` is missing or has the wrong type")]
    MalformedDescriptor { field: &'static str },

    /// The event store failed mid-stream.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Validates recorded dot-stimulus events against their declared field.
///
/// Stateless across runs; each [`Validator::run`] consumes its sequence
/// exactly once, in arrival order, and stops at the first violation.
pub struct Validator {
    schema: Schema,
}

impl Validator {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Validate a sequence of events, returning how many matched.
    ///
    /// Non-matching events (wrong tag, non-mapping value, absent `dots` key
    /// under the current schema) are skipped without affecting the count.
    /// Zero matches after a full traversal is [`ValidateError::NoMatchingEvents`].
    pub fn run<I>(&self, events: I) -> Result<u64, ValidateError>
    where
        I: IntoIterator<Item = Result<Event, StoreError>>,
    {
        let mut matched = 0u64;

        for event in events {
            let event = event?;
            let Some(descriptor) = self.match_descriptor(&event.value)? else {
                continue;
            };

            check_dots(&descriptor)?;
            matched += 1;
            debug!(
                "Event {} ({}): {} dots within radius {}",
                matched, event.code, descriptor.num_dots, descriptor.field_radius,
            );
        }

        if matched == 0 {
            return Err(ValidateError::NoMatchingEvents);
        }
        Ok(matched)
    }

    /// Open `path` and validate every event on the `code` channel.
    ///
    /// The file handle is released on every exit path, failures included.
    pub fn validate_file(
        &self,
        path: impl AsRef<Path>,
        code: &str,
    ) -> Result<ValidationReport, ValidateError> {
        let mut file = EventFile::open(path).map_err(ValidateError::Store)?;
        let matched = self.run(file.events(&[code]))?;
        Ok(ValidationReport {
            matched,
            schema: self.schema,
        })
    }

    // -----------------------------------------------------------------------
    // Filtering
    // -----------------------------------------------------------------------

    /// Decide whether `value` is a stimulus announce for the active schema.
    ///
    /// `Ok(None)` means skip; `Ok(Some(_))` means the event matched and must
    /// now pass both invariants; `Err` means it matched but its descriptor
    /// is malformed.
    fn match_descriptor<'a>(
        &self,
        value: &'a Value,
    ) -> Result<Option<StimulusDescriptor<'a>>, ValidateError> {
        let Some(map) = value.as_map() else {
            return Ok(None);
        };
        let tag_matches = map
            .get(fields::STIM_TYPE)
            .and_then(Value::as_str)
            .is_some_and(|tag| tag == self.schema.stimulus_tag());
        if !tag_matches {
            return Ok(None);
        }

        match self.schema {
            Schema::Current => {
                // The tag alone is not sufficient: announce events without
                // recorded dot data carry no `dots` key and are not matches.
                let Some(dots_value) = map.get(fields::DOTS) else {
                    return Ok(None);
                };
                Ok(Some(StimulusDescriptor {
                    num_dots: require(map, fields::NUM_DOTS, Value::as_usize)?,
                    field_radius: require(map, fields::FIELD_RADIUS, Value::as_f64)?,
                    field_center_x: require(map, fields::FIELD_CENTER_X, Value::as_f64)?,
                    field_center_y: require(map, fields::FIELD_CENTER_Y, Value::as_f64)?,
                    dots: dots_value.as_bytes().ok_or(ValidateError::MalformedDescriptor {
                        field: fields::DOTS,
                    })?,
                }))
            }
            Schema::Legacy(params) => {
                // Legacy announces always carry dot data; a missing key is
                // corruption, not a non-match.
                Ok(Some(StimulusDescriptor {
                    num_dots: params.num_dots,
                    field_radius: params.field_radius,
                    field_center_x: 0.0,
                    field_center_y: 0.0,
                    dots: require(map, fields::DOTS, Value::as_bytes)?,
                }))
            }
        }
    }
}

fn require<'a, T>(
    map: &'a std::collections::HashMap<String, Value>,
    field: &'static str,
    get: impl Fn(&'a Value) -> Option<T>,
) -> Result<T, ValidateError> {
    map.get(field)
        .and_then(get)
        .ok_or(ValidateError::MalformedDescriptor { field })
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

/// Decode the packed dot payload and check both invariants.
///
/// The payload is little-endian f32 pairs, interleaved x/y. Length must be
/// exactly `2 * num_dots` floats, and every dot, after recentering, must
/// satisfy `x^2 + y^2 <= field_radius^2` (inclusive).
fn check_dots(descriptor: &StimulusDescriptor<'_>) -> Result<(), ValidateError> {
    let expected = 2 * descriptor.num_dots;
    let actual = descriptor.dots.len() / 4;
    if descriptor.dots.len() % 4 != 0 || actual != expected {
        return Err(ValidateError::PayloadLengthMismatch { expected, actual });
    }

    // Geometry in f32, matching the producer's payload precision.
    let radius = descriptor.field_radius as f32;
    let limit_sq = radius * radius;
    let center_x = descriptor.field_center_x as f32;
    let center_y = descriptor.field_center_y as f32;

    let mut payload = descriptor.dots;
    for index in 0..descriptor.num_dots {
        let x = payload.get_f32_le() - center_x;
        let y = payload.get_f32_le() - center_y;
        let distance_sq = x * x + y * y;
        if distance_sq > limit_sq {
            return Err(ValidateError::BoundaryViolation {
                index,
                distance_sq,
                limit_sq,
            });
        }
    }
    Ok(())
}
