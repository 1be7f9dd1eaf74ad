//! Dots-Data Validator
//!
//! Checks recorded dot-stimulus events: every announced dot must lie inside
//! the circular field the stimulus declared.
//!
//! ## Architecture
//!
//! ```text
//! validate CLI  (bin/validate.rs)
//!   └── Validator  (validate.rs)   ← filter, decode, invariant checks
//!         └── EventFile  (store.rs) ← open / lazy iterate / release
//!               └── codec  (codec.rs) ← record framing, tagged values
//! ```
//!
//! Two recording formats are supported as [`Schema`] variants: the current
//! `moving_dots` format announces its field geometry per event, while the
//! legacy `dynamic_random_dots` format compiled it into the experiment.

pub mod codec;
pub mod store;
pub mod types;
pub mod validate;

// Convenience re-exports
pub use codec::StoreError;
pub use store::{EventFile, EventFileWriter, Events};
pub use types::{Event, LegacyParams, Schema, StimulusDescriptor, ValidationReport, Value};
pub use validate::{ValidateError, Validator};
