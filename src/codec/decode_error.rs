use std::fmt;

/// The terminal error of a [`crate::Decoder`].
///
/// Once a decoder records one of these it stays in the error state; every
/// later read returns a zero value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A read needed more bytes than were left in the buffer.
    Truncated { wanted: usize, remaining: usize },

    /// A length header was negative (other than the nil marker where allowed).
    InvalidLength(i32),

    /// A string payload was not valid UTF-8.
    InvalidUtf8,

    /// A `bool` byte was neither `0` nor `1`.
    InvalidBool(u8),

    /// A presence byte was neither absent nor present.
    InvalidPresence(u8),

    /// Bytes were left over after the expected shape was fully decoded.
    TrailingBytes(usize),

    /// Raised by a record's own validation while unmarshaling.
    Invalid(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { wanted, remaining } => write!(
                f,
                "truncated input: wanted {wanted} bytes, {remaining} remaining"
            ),
            DecodeError::InvalidLength(n) => write!(f, "invalid length header: {n}"),
            DecodeError::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            DecodeError::InvalidBool(b) => write!(f, "invalid bool byte: {b:#04x}"),
            DecodeError::InvalidPresence(b) => write!(f, "invalid presence byte: {b:#04x}"),
            DecodeError::TrailingBytes(n) => write!(f, "{n} unread trailing bytes"),
            DecodeError::Invalid(msg) => write!(f, "invalid value: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}
