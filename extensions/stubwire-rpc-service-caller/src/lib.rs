mod client_stub;
pub use client_stub::*;
