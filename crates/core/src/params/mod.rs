//! Encoder parameter parsing and validation.
//!
//! Callers hand in an untyped [`RawParams`] map (form fields, CLI flags) and
//! get back either an immutable [`EncoderConfig`] or a [`ValidationError`]
//! naming the offending parameter. Validation never touches I/O.

mod error;
mod types;
mod validator;

pub use error::ValidationError;
pub use types::{BitRateMode, EncoderConfig, Mp3Config, RawParams, WavConfig};
pub use validator::{parse_bool, validate};
