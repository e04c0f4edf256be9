use crate::ShardKey;
use stubwire::{Encoder, Marshal, constants::DEFAULT_ENCODER_CAPACITY};
use xxhash_rust::xxh3::xxh3_64;

/// Shard key for a routed call whose routing value encodes to `bytes`.
///
/// Never returns `0`, which is reserved for "no preference".
pub fn shard_key(bytes: &[u8]) -> ShardKey {
    match xxh3_64(bytes) {
        0 => 1,
        h => h,
    }
}

/// Encodes `value` and hashes its wire form, so the client and server sides
/// of a routed method derive the same key from the same argument.
pub fn route<T: Marshal + ?Sized>(value: &T) -> ShardKey {
    let mut enc = Encoder::with_capacity(value.size_hint().unwrap_or(DEFAULT_ENCODER_CAPACITY));
    enc.put(value);
    shard_key(enc.data())
}
