#[cfg(feature = "alloc-track")]
pub(crate) mod alloc_track;
pub(crate) mod core;
pub(crate) mod error;
