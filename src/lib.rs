//! # kokoro-setup
//!
//! Prepare a local Kokoro-82M text-to-speech installation and synthesize
//! speech with it.
//!
//! ## Features
//!
//! - **Asset fetching**: model weights and voice packs are downloaded from the
//!   Hugging Face mirror on first use and reused afterwards
//! - **espeak-ng configuration**: the phonemizer's library and executable are
//!   validated up front and handed to the engine explicitly
//! - **Device selection**: CUDA when the ONNX Runtime reports it, CPU otherwise
//! - **Kokoro TTS**: ONNX inference producing 24 kHz mono audio
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! kokoro-setup = { version = "2026.2", features = ["kokoro"] }
//! ```
//!
//! ```ignore
//! use kokoro_setup::{
//!     config::SetupConfig, download::HttpFetcher, engines::kokoro::KokoroEngine,
//!     espeak::EspeakConfig, pipeline,
//! };
//!
//! let config = SetupConfig::default();
//! let espeak = EspeakConfig::configure(&config.espeak_library, &config.espeak_executable)?;
//! let fetcher = HttpFetcher::new(&config.base_url, &config.assets_dir);
//! let wav = pipeline::run(&config, &fetcher, KokoroEngine::with_espeak(espeak))?;
//! println!("{}", wav.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod download;
pub mod engines;
pub mod error;
pub mod espeak;
pub mod pipeline;
pub mod voice;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::SetupError;
pub use voice::VoicePack;

/// The result of a synthesis (text-to-speech) operation.
///
/// Contains raw f32 audio samples, the sample rate of the output audio and
/// the phoneme sequence the model was fed.
#[derive(Debug)]
pub struct SynthesisResult {
    /// Raw audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio (24000 for Kokoro)
    pub sample_rate: u32,
    /// Phonemes actually synthesized, reconstructed from the model tokens
    pub phonemes: String,
}

impl SynthesisResult {
    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Which device the caller would like inference to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Use the accelerator when one is available, else the CPU.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

/// The compute device a model is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl Device {
    /// Resolve a preference against what the engine reports at call time.
    pub fn select(
        preference: DevicePreference,
        accelerator_available: bool,
    ) -> Result<Self, SetupError> {
        match (preference, accelerator_available) {
            (DevicePreference::Auto, true) | (DevicePreference::Cuda, true) => Ok(Device::Cuda),
            (DevicePreference::Auto, false) | (DevicePreference::Cpu, _) => Ok(Device::Cpu),
            (DevicePreference::Cuda, false) => Err(SetupError::DeviceUnavailable(Device::Cuda)),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda => f.write_str("cuda"),
        }
    }
}

/// Synthesis language, keyed by the first character of a voice name.
///
/// `a*` voices are American English and `b*` voices British English.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    AmericanEnglish,
    BritishEnglish,
}

impl Language {
    pub fn from_voice_name(voice: &str) -> Result<Self, SetupError> {
        match voice.chars().next() {
            Some('a') => Ok(Language::AmericanEnglish),
            Some('b') => Ok(Language::BritishEnglish),
            _ => Err(SetupError::UnknownVoice(voice.to_string())),
        }
    }

    /// espeak-ng voice code for this language.
    pub fn espeak_code(self) -> &'static str {
        match self {
            Language::AmericanEnglish => "en-us",
            Language::BritishEnglish => "en-gb",
        }
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// This trait defines the standard operations that all synthesis engines must support.
/// Each engine may have different parameter types for model loading and inference configuration.
pub trait SynthesisEngine {
    /// Parameters for configuring inference behavior (speed, etc.)
    type SynthesisParams;
    /// Parameters for configuring model loading (threads, etc.)
    type ModelParams: Default;

    /// Whether an accelerator is usable right now.
    fn accelerator_available(&self) -> bool {
        false
    }

    /// Load a model from the specified path using default parameters.
    fn load_model(
        &mut self,
        model_path: &Path,
        device: Device,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.load_model_with_params(model_path, device, Self::ModelParams::default())
    }

    /// Load a model from the specified path with custom parameters.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        device: Device,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Synthesize speech from the given text with a loaded voice pack.
    fn synthesize(
        &mut self,
        text: &str,
        voice: &VoicePack,
        language: Language,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>>;

    /// Synthesize speech from the given text and write to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `SynthesisResult::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        voice: &VoicePack,
        language: Language,
        wav_path: &Path,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>> {
        let result = self.synthesize(text, voice, language, params)?;
        result.write_wav(wav_path)?;
        Ok(result)
    }
}
