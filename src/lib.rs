//! Low-level binary codec shared by every stub in the workspace.
//!
//! Values carry no type tag on the wire; the reader must know the expected
//! shape from the method it is decoding for. See [`codec`] for the format.

pub mod codec;
pub mod constants;
pub mod utils;

pub use codec::{DecodeError, Decoder, Encoder, Marshal, Presence, Unmarshal};
