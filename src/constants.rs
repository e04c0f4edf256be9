/// Size in bytes of every length header (strings, byte runs, sequences, maps).
pub const LENGTH_HEADER_SIZE: usize = 4;

/// Length header value reserved for an absent string or a nil sequence.
///
/// Distinct from `0`, which denotes a present-but-empty value.
pub const NIL_LENGTH: i32 = -1;

/// Size in bytes of the presence marker preceding optional values and the
/// trailing error slot of a reply.
pub const PRESENCE_SIZE: usize = 1;

/// Capacity used by [`crate::Encoder::new`] when the caller has no size
/// prediction.
pub const DEFAULT_ENCODER_CAPACITY: usize = 64;
