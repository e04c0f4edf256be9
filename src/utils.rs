mod increment_u64_id;
pub use increment_u64_id::increment_u64_id;
