//! Core data-model types shared across all modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Event values
// ---------------------------------------------------------------------------

/// A self-describing event value, as recorded by the experiment producer.
///
/// The producer announces structured mappings for stimulus events and plain
/// scalars (or byte payloads) on other channels, so consumers must branch on
/// the variant explicitly rather than probe fields blindly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(String),
    /// Raw binary payload (e.g. packed dot positions).
    Bytes(Vec<u8>),
    List(Vec<Value>),
    /// Keys are unique; insertion order carries no meaning.
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Numeric accessor accepting both integer and float encodings.
    ///
    /// The producer announces geometry as floats but is free to record a
    /// whole-valued radius as an integer.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Non-negative integer accessor (counts).
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Value::Integer(i) if *i >= 0 => Some(*i as usize),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A single recorded event. Immutable once read; the validator only ever
/// inspects events, never rewrites them.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Semantic channel name (e.g. [`codes::ANNOUNCE_STIMULUS`]).
    pub code: String,
    /// Producer timestamp in microseconds. Preserved by the store,
    /// ignored by the validator.
    pub time: i64,
    pub value: Value,
}

impl Event {
    pub fn new(code: impl Into<String>, time: i64, value: Value) -> Self {
        Self {
            code: code.into(),
            time,
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// Stimulus descriptors
// ---------------------------------------------------------------------------

/// The decoded parameters of one matching stimulus-announce event.
///
/// Built by the active [`Schema`] from the event's `Value::Map`; for the
/// legacy schema the count/radius come from [`LegacyParams`] and the center
/// is implicitly the origin.
#[derive(Debug, Clone)]
pub struct StimulusDescriptor<'a> {
    pub num_dots: usize,
    pub field_radius: f64,
    pub field_center_x: f64,
    pub field_center_y: f64,
    /// Packed little-endian f32 pairs, interleaved x/y.
    pub dots: &'a [u8],
}

// ---------------------------------------------------------------------------
// Schema selection
// ---------------------------------------------------------------------------

/// Compiled-in parameters of the legacy (fixed-field) recording format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LegacyParams {
    /// Dot count every announce event must carry.
    pub num_dots: usize,
    /// Field radius in degrees; boundary centered at the origin.
    pub field_radius: f64,
}

impl Default for LegacyParams {
    fn default() -> Self {
        Self {
            num_dots: 1000,
            field_radius: 10.0,
        }
    }
}

/// Which recording format the event file uses.
///
/// The two formats are one schema evolution apart: the legacy format
/// hardcodes the field geometry per experiment, the current one announces
/// it per event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "schema", content = "params")]
pub enum Schema {
    /// `type == "moving_dots"`, per-event geometry, `dots` key required.
    Current,
    /// `type == "dynamic_random_dots"`, fixed geometry, origin-centered.
    Legacy(LegacyParams),
}

impl Schema {
    /// The stimulus `type` tag this schema filters on.
    pub fn stimulus_tag(&self) -> &'static str {
        match self {
            Schema::Current => tags::MOVING_DOTS,
            Schema::Legacy(_) => tags::DYNAMIC_RANDOM_DOTS,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Successful validation summary, printed by the CLI (optionally as JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Events that matched the filter and passed both invariants.
    pub matched: u64,
    #[serde(flatten)]
    pub schema: Schema,
}

// ---------------------------------------------------------------------------
// Well-known names
// ---------------------------------------------------------------------------

/// Event-code names used by the producer, as constants.
pub mod codes {
    /// Channel on which stimulus draw data is announced.
    pub const ANNOUNCE_STIMULUS: &str = "#announceStimulus";
}

/// Stimulus `type` tags, one per schema generation.
pub mod tags {
    pub const MOVING_DOTS: &str = "moving_dots";
    pub const DYNAMIC_RANDOM_DOTS: &str = "dynamic_random_dots";
}

/// Descriptor field names within a stimulus-announce mapping.
pub mod fields {
    pub const STIM_TYPE: &str = "type";
    pub const NUM_DOTS: &str = "num_dots";
    pub const FIELD_RADIUS: &str = "field_radius";
    pub const FIELD_CENTER_X: &str = "field_center_x";
    pub const FIELD_CENTER_Y: &str = "field_center_y";
    pub const DOTS: &str = "dots";
}
