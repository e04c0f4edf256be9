use super::{Marshal, Presence};
use crate::constants::{DEFAULT_ENCODER_CAPACITY, NIL_LENGTH};
use std::fmt::Display;

/// Accumulates the wire encoding of a sequence of values.
///
/// Encoding never fails on well-formed input. Lengths that cannot be
/// represented by the 32-bit length header are a programming defect and
/// panic; stubs run encoding inside a fault boundary so such a panic is
/// surfaced as an error instead of tearing down the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ENCODER_CAPACITY)
    }

    /// Creates an encoder whose buffer is pre-sized to `capacity` bytes.
    ///
    /// Pre-sizing is purely an optimization: writes beyond `capacity` grow the
    /// buffer as usual.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Clears the buffer and ensures room for at least `capacity` bytes.
    pub fn reset(&mut self, capacity: usize) {
        self.buf.clear();
        self.buf.reserve(capacity);
    }

    /// The bytes encoded so far.
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    #[inline]
    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn i8(&mut self, v: i8) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    /// Writes a length header for a present string, byte run or sequence.
    ///
    /// # Panics
    ///
    /// Panics if `len` does not fit in an `i32`.
    pub fn len_header(&mut self, len: usize) {
        let len = i32::try_from(len)
            .unwrap_or_else(|_| panic!("length {len} cannot be represented in 32 bits"));
        self.i32(len);
    }

    /// Writes the nil marker used for an absent string or nil sequence.
    pub fn nil(&mut self) {
        self.i32(NIL_LENGTH);
    }

    pub fn presence(&mut self, presence: Presence) {
        self.u8(presence.into());
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn string(&mut self, s: &str) {
        self.len_header(s.len());
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Writes a string that may be absent; `None` is encoded as the nil length.
    pub fn opt_string(&mut self, s: Option<&str>) {
        match s {
            Some(s) => self.string(s),
            None => self.nil(),
        }
    }

    /// Writes a length-prefixed run of raw bytes.
    pub fn bytes(&mut self, b: &[u8]) {
        self.len_header(b.len());
        self.buf.extend_from_slice(b);
    }

    /// Appends bytes verbatim, without a length header.
    pub fn raw(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    /// Writes any marshalable value.
    pub fn put<T: Marshal + ?Sized>(&mut self, value: &T) {
        value.marshal(self);
    }

    /// Writes a presence byte followed by the value when present.
    pub fn option<T: Marshal>(&mut self, value: Option<&T>) {
        match value {
            Some(v) => {
                self.presence(Presence::Present);
                v.marshal(self);
            }
            None => self.presence(Presence::Absent),
        }
    }

    /// Writes a sequence that may be nil.
    ///
    /// `None` writes the nil length (`-1`); `Some(&[])` writes `0`.
    pub fn sequence<T: Marshal>(&mut self, items: Option<&[T]>) {
        match items {
            Some(items) => {
                self.len_header(items.len());
                for item in items {
                    item.marshal(self);
                }
            }
            None => self.nil(),
        }
    }

    /// Writes the trailing error slot of a reply.
    ///
    /// The slot is a presence byte, followed by the error's message when an
    /// error is present.
    pub fn error<E: Display + ?Sized>(&mut self, err: Option<&E>) {
        match err {
            Some(err) => {
                self.presence(Presence::Present);
                self.string(&err.to_string());
            }
            None => self.presence(Presence::Absent),
        }
    }
}
