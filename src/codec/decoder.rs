use super::{DecodeError, Presence, Unmarshal};
use crate::constants::NIL_LENGTH;

/// Reads values back out of a wire buffer.
///
/// The first failed read records a [`DecodeError`] and the decoder stays in
/// that state: every later read returns a zero value (`0`, `false`, an empty
/// string, `None`) without touching the buffer and without panicking. Callers
/// decode the whole expected shape and check [`Decoder::error`] once at the
/// end.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    error: Option<DecodeError>,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            error: None,
        }
    }

    /// The terminal error, if any read has failed.
    pub fn error(&self) -> Option<&DecodeError> {
        self.error.as_ref()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Records `err` unless an earlier error is already set.
    ///
    /// Exposed so that record implementations can reject values that decode
    /// cleanly but violate their own invariants.
    pub fn fail(&mut self, err: DecodeError) {
        if self.error.is_none() {
            tracing::trace!(offset = self.pos, error = %err, "decode failed");
            self.error = Some(err);
        }
    }

    /// Consumes the decoder, requiring that no error occurred and every byte
    /// was read.
    pub fn finish(self) -> Result<(), DecodeError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        match self.data.len() - self.pos {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.error.is_some() {
            return None;
        }
        let remaining = self.remaining();
        if n > remaining {
            self.fail(DecodeError::Truncated {
                wanted: n,
                remaining,
            });
            return None;
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Some(bytes)
    }

    #[inline]
    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        if let Some(bytes) = self.take(N) {
            out.copy_from_slice(bytes);
        }
        out
    }

    #[inline]
    pub fn u8(&mut self) -> u8 {
        self.array::<1>()[0]
    }

    #[inline]
    pub fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.array())
    }

    #[inline]
    pub fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.array())
    }

    #[inline]
    pub fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.array())
    }

    #[inline]
    pub fn i8(&mut self) -> i8 {
        i8::from_le_bytes(self.array())
    }

    #[inline]
    pub fn i16(&mut self) -> i16 {
        i16::from_le_bytes(self.array())
    }

    #[inline]
    pub fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.array())
    }

    #[inline]
    pub fn i64(&mut self) -> i64 {
        i64::from_le_bytes(self.array())
    }

    #[inline]
    pub fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.array())
    }

    #[inline]
    pub fn f64(&mut self) -> f64 {
        f64::from_le_bytes(self.array())
    }

    pub fn bool(&mut self) -> bool {
        match self.u8() {
            0 => false,
            1 => true,
            b => {
                self.fail(DecodeError::InvalidBool(b));
                false
            }
        }
    }

    pub fn presence(&mut self) -> Presence {
        if self.error.is_some() {
            return Presence::Absent;
        }
        let b = self.u8();
        match Presence::try_from(b) {
            Ok(p) => p,
            Err(_) => {
                self.fail(DecodeError::InvalidPresence(b));
                Presence::Absent
            }
        }
    }

    /// Reads a length header.
    ///
    /// Returns `None` for the nil marker. On error, returns `Some(0)` so that
    /// callers fall through to an empty value.
    pub fn len_header(&mut self) -> Option<usize> {
        if self.error.is_some() {
            return Some(0);
        }
        match self.i32() {
            NIL_LENGTH => None,
            n if n < 0 => {
                self.fail(DecodeError::InvalidLength(n));
                Some(0)
            }
            n => Some(n as usize),
        }
    }

    /// Reads the element count of a sequence or map.
    ///
    /// Every element takes at least one byte on the wire, so a count larger
    /// than the remaining input is truncated. Zero-sized elements are held to
    /// the same bound.
    pub fn count_header(&mut self) -> Option<usize> {
        let n = self.len_header()?;
        let remaining = self.remaining();
        if n > remaining && self.error.is_none() {
            self.fail(DecodeError::Truncated {
                wanted: n,
                remaining,
            });
            return Some(0);
        }
        Some(n)
    }

    /// Reads a string; an absent string decodes as empty.
    pub fn string(&mut self) -> String {
        self.opt_string().unwrap_or_default()
    }

    /// Reads a string that may be absent.
    pub fn opt_string(&mut self) -> Option<String> {
        let n = self.len_header()?;
        let bytes = self.take(n)?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Some(s.to_owned()),
            Err(_) => {
                self.fail(DecodeError::InvalidUtf8);
                Some(String::new())
            }
        }
    }

    /// Reads a length-prefixed run of raw bytes; an absent run decodes as empty.
    pub fn bytes(&mut self) -> Vec<u8> {
        match self.len_header() {
            Some(n) => self.take(n).map(<[u8]>::to_vec).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Reads `n` bytes verbatim.
    pub fn raw(&mut self, n: usize) -> &'a [u8] {
        self.take(n).unwrap_or(&[])
    }

    pub fn get<T: Unmarshal>(&mut self) -> T {
        T::unmarshal(self)
    }

    /// Reads a presence byte followed by the value when present.
    pub fn option<T: Unmarshal>(&mut self) -> Option<T> {
        match self.presence() {
            Presence::Present => Some(T::unmarshal(self)),
            Presence::Absent => None,
        }
    }

    /// Reads a sequence that may be nil.
    pub fn sequence<T: Unmarshal>(&mut self) -> Option<Vec<T>> {
        let n = self.count_header()?;
        let mut items = Vec::with_capacity(n);
        for _ in 0..n {
            let item = T::unmarshal(self);
            if self.error.is_some() {
                break;
            }
            items.push(item);
        }
        Some(items)
    }

    /// Reads the trailing error slot of a reply.
    pub fn error_slot(&mut self) -> Option<String> {
        match self.presence() {
            Presence::Present => Some(self.string()),
            Presence::Absent => None,
        }
    }
}
