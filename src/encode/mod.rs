//! Encoders, container writers and the session that drives them.

/// Send-frame / receive-packet encoders.
pub mod codec;
/// Container writer backed by a system `ffmpeg` process.
pub mod ffmpeg;
/// Animated GIF container writer.
pub mod gif;
/// Container contract, format detection and the in-memory null muxer.
pub mod muxer;
/// Stream configuration and encoded packets.
pub mod packet;
/// Encoder + muxer lifecycle for a single output.
pub mod session;
