//! Wire format.
//!
//! - Integers and floats: fixed width, little-endian.
//! - `bool`: one byte, `0` or `1`.
//! - Strings and byte runs: `i32` length followed by the bytes; `-1` is absent.
//! - Sequences: `i32` length followed by each element; `-1` is nil.
//! - Records: their fields' encodings concatenated in declaration order.
//! - Replies: result encoding, then a presence byte and (when present) the
//!   application error message as a string.

mod decode_error;
mod decoder;
mod encoder;
mod marshal;
mod presence;

pub use decode_error::DecodeError;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use marshal::{Marshal, Unmarshal, optional_size_hint};
pub use presence::Presence;
