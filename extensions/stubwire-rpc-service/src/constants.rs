/// The (major, minor) version of the stub contract implemented by this crate.
///
/// Hand-written or generated stubs record the version they were written
/// against in their `Registration`. A different major version is rejected at
/// registration time; minor versions are additive.
pub const CODEGEN_VERSION: (u32, u32) = (0, 1);

pub const METHOD_COUNT: &str = "stubwire_method_count";
pub const METHOD_ERROR_COUNT: &str = "stubwire_method_error_count";
pub const METHOD_LATENCY_MICROS: &str = "stubwire_method_latency_micros";
pub const METHOD_BYTES_REQUEST: &str = "stubwire_method_bytes_request";
pub const METHOD_BYTES_REPLY: &str = "stubwire_method_bytes_reply";

/// Upper bounds (inclusive) of the latency histogram buckets, in microseconds.
///
/// Samples above the last bound land in an implicit overflow bucket.
pub const LATENCY_BUCKETS_MICROS: &[f64] = &[
    10.0,
    50.0,
    100.0,
    250.0,
    500.0,
    1_000.0,
    2_500.0,
    5_000.0,
    10_000.0,
    25_000.0,
    50_000.0,
    100_000.0,
    250_000.0,
    500_000.0,
    1_000_000.0,
    5_000_000.0,
];

/// Upper bounds (inclusive) of the request/reply size histogram buckets, in bytes.
pub const BYTE_SIZE_BUCKETS: &[f64] = &[
    0.0,
    16.0,
    64.0,
    256.0,
    1_024.0,
    4_096.0,
    16_384.0,
    65_536.0,
    262_144.0,
    1_048_576.0,
    4_194_304.0,
];

/// Shard key meaning "no routing preference".
pub const NO_SHARD_KEY: u64 = 0;
