//! Raw pixel buffers and the color conversion pipeline.

/// Owned raw image buffers.
pub mod buffer;
/// Two-stage source -> YUV 4:2:0 -> codec format chain.
pub mod chain;
/// Single-stage scaling + color conversion contexts.
pub mod convert;
