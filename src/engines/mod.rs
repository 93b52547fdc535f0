//! Speech synthesis engines.
//!
//! This module contains implementations of text-to-speech engines.
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `kokoro` - Kokoro-82M (ONNX format, espeak-ng required), on by default
//! - `cuda` - Kokoro with the CUDA execution provider

#[cfg(feature = "kokoro")]
pub mod kokoro;
