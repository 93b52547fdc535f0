//! Kokoro-82M text-to-speech engine implementation.
//!
//! This module provides a Kokoro-based synthesis engine that runs the
//! Kokoro-82M v0.19 ONNX export through ONNX Runtime. Text is phonemized with
//! espeak-ng, mapped onto the model vocabulary and synthesized with a style
//! vector taken from a [`VoicePack`](crate::VoicePack).
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed on your system:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>
//!
//! # Asset Layout
//!
//! ```text
//! Kokoro-82M/
//! ├── kokoro-v0_19.onnx     # model weights
//! ├── config.json           # optional, vocabulary
//! └── voices/
//!     ├── af.pt             # one torch archive per voice
//!     └── ...
//! ```
//!
//! Everything is mirrored from <https://huggingface.co/hexgrad/Kokoro-82M>
//! by [`HttpFetcher`](crate::download::HttpFetcher).
//!
//! # Language Support
//!
//! | Voice prefix | Language | espeak-ng code |
//! |---|---|---|
//! | `a` | American English | `en-us` |
//! | anything else | British English | `en-gb` |
//!
//! # Example
//!
//! ```rust,no_run
//! use kokoro_setup::{Device, Language, SynthesisEngine, VoicePack};
//! use kokoro_setup::engines::kokoro::KokoroEngine;
//! use std::path::Path;
//!
//! let mut engine = KokoroEngine::new();
//! engine.load_model(Path::new("Kokoro-82M/kokoro-v0_19.onnx"), Device::Cpu)?;
//! let voice = VoicePack::load("af", Path::new("Kokoro-82M/voices/af.pt"))?;
//!
//! let result = engine.synthesize("Hello, world!", &voice, Language::AmericanEnglish, None)?;
//! println!("{} samples, phonemes: {}", result.samples.len(), result.phonemes);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;
pub mod model;
pub mod phonemizer;
pub mod vocab;

pub use engine::{KokoroEngine, KokoroInferenceParams};
pub use model::KokoroError;
