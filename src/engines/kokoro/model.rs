use std::collections::HashMap;
use std::path::Path;

use ndarray::Array2;
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch,
};
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use crate::espeak::EspeakConfig;
use crate::voice::STYLE_DIM;
use crate::{Device, Language, VoicePack};

use super::phonemizer::phonemize;
use super::vocab::ids_to_phonemes;

/// Maximum number of phoneme tokens per chunk (before padding).
pub const MAX_PHONEME_LEN: usize = 510;

/// Output sample rate from the Kokoro model.
pub const SAMPLE_RATE: u32 = 24000;

/// Crossfade (in samples) used when concatenating chunk audio.
const CHUNK_CROSSFADE_SAMPLES: usize = 240; // 10ms @ 24kHz

#[derive(thiserror::Error, Debug)]
pub enum KokoroError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("Phonemization failed: {0}")]
    PhonemizerFailed(String),
    #[error("Voice pack '{0}' holds no style vectors")]
    EmptyVoice(String),
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
    #[error("Invalid config.json: {0}")]
    Config(String),
    #[error("No phonemes produced for {0:?}")]
    NoPhonemes(String),
}

/// Internal Kokoro ONNX model state.
pub struct KokoroModel {
    session: Session,
    device: Device,
    vocab: HashMap<char, i64>,
    /// Detected input name: "input_ids" or "tokens"
    tokens_input_name: String,
    /// True if the speed input expects int32, false for float32
    speed_is_int32: bool,
}

impl KokoroModel {
    /// Load the Kokoro model from an `.onnx` file.
    ///
    /// A `config.json` next to the model supplies the vocabulary; without
    /// one the built-in table is used.
    pub fn load(onnx_path: &Path, device: Device) -> Result<Self, KokoroError> {
        if !onnx_path.is_file() {
            return Err(KokoroError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Model file not found at {}", onnx_path.display()),
            )));
        }
        log::info!(
            "Loading Kokoro model from {} on {device}",
            onnx_path.display()
        );

        let session = init_session(onnx_path, device)?;

        // Detect input names at load time
        let tokens_input_name = detect_tokens_input(&session);
        let speed_is_int32 = detect_speed_type(&session);

        log::info!(
            "Detected: tokens_input='{}', speed_is_int32={}",
            tokens_input_name,
            speed_is_int32
        );

        let config_path = onnx_path.with_file_name("config.json");
        let vocab = if config_path.exists() {
            log::info!("Loading vocab from config.json");
            super::vocab::load_vocab(&config_path)?
        } else {
            log::warn!("config.json not found, using hardcoded vocab");
            super::vocab::hardcoded_vocab()
        };

        Ok(Self {
            session,
            device,
            vocab,
            tokens_input_name,
            speed_is_int32,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Synthesize audio from text with the given voice and speed.
    ///
    /// Returns the samples and the phoneme string that was synthesized.
    pub fn synthesize_text(
        &mut self,
        text: &str,
        voice: &VoicePack,
        language: Language,
        speed: f32,
        style_idx_override: Option<usize>,
        espeak: &EspeakConfig,
    ) -> Result<(Vec<f32>, String), KokoroError> {
        let ids = phonemize(text, language.espeak_code(), &self.vocab, espeak)?;

        if ids.is_empty() {
            return Err(KokoroError::NoPhonemes(text.to_string()));
        }
        let phonemes = ids_to_phonemes(&ids, &self.vocab);

        // Split into chunks if needed. Keep a stable style index so adjacent chunks
        // don't change style/prosody based on chunk length.
        let style_idx = style_idx_override.unwrap_or(ids.len());
        let style = *voice
            .style(style_idx)
            .ok_or_else(|| KokoroError::EmptyVoice(voice.name().to_string()))?;
        let estimated_samples = ids.len() * 300;
        let chunks = if ids.len() > MAX_PHONEME_LEN {
            log::debug!(
                "Kokoro phoneme sequence exceeded limit ({} > {}), chunking",
                ids.len(),
                MAX_PHONEME_LEN
            );
            split_chunks(&ids)
        } else {
            vec![ids]
        };

        let mut combined = Vec::with_capacity(estimated_samples);

        for chunk_ids in chunks.iter() {
            let audio = self.synthesize_chunk(chunk_ids, &style, speed)?;
            if audio.is_empty() {
                continue;
            }

            if combined.is_empty() {
                combined.extend_from_slice(&audio);
            } else {
                append_with_crossfade(&mut combined, &audio, CHUNK_CROSSFADE_SAMPLES);
            }
        }

        Ok((combined, phonemes))
    }

    /// Run ONNX inference on a single chunk of phoneme token IDs.
    fn synthesize_chunk(
        &mut self,
        tokens: &[i64],
        style: &[f32; STYLE_DIM],
        speed: f32,
    ) -> Result<Vec<f32>, KokoroError> {
        let seq_len = tokens.len() + 2; // +2 for padding tokens

        // Build tokens tensor: [[0, t1..tN, 0]]
        let mut padded = vec![0i64; seq_len];
        padded[1..seq_len - 1].copy_from_slice(tokens);
        let tokens_arr = Array2::from_shape_vec((1, seq_len), padded)?;

        // Style tensor [[s0..s255]], viewed in place
        let style_view = ndarray::ArrayView2::from_shape((1, STYLE_DIM), style.as_slice())?;

        // Run session
        let output = if self.speed_is_int32 {
            let speed_arr = ndarray::arr1(&[speed as i32]);
            let inputs = inputs![
                self.tokens_input_name.as_str() => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ];
            self.session.run(inputs)?
        } else {
            let speed_arr = ndarray::arr1(&[speed]);
            let inputs = inputs![
                self.tokens_input_name.as_str() => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ];
            self.session.run(inputs)?
        };

        // Extract first output as waveform
        let first_output = output
            .iter()
            .next()
            .ok_or_else(|| KokoroError::Ort(ort::Error::new("No output from model")))?;
        let waveform = first_output.1.try_extract_array::<f32>()?;

        Ok(waveform.as_slice().unwrap_or(&[]).to_vec())
    }
}

/// Initialize an ONNX session bound to `device`.
fn init_session(onnx_path: &Path, device: Device) -> Result<Session, KokoroError> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_execution_providers(execution_providers(device))?
        .with_parallel_execution(true)?
        .commit_from_file(onnx_path)?;
    Ok(session)
}

/// CUDA first when requested; CPU always stays as the fallback provider.
fn execution_providers(device: Device) -> Vec<ExecutionProviderDispatch> {
    match device {
        Device::Cuda => vec![
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
        Device::Cpu => vec![CPUExecutionProvider::default().build()],
    }
}

/// Detect the token input name ("input_ids" or "tokens") from session inputs.
fn detect_tokens_input(session: &Session) -> String {
    for input in session.inputs() {
        if input.name() == "input_ids" || input.name() == "tokens" {
            return input.name().to_string();
        }
    }
    // Default to "input_ids" if neither is found
    "input_ids".to_string()
}

/// Detect whether the speed input expects int32 (true) or float32 (false).
fn detect_speed_type(session: &Session) -> bool {
    for input in session.inputs() {
        if input.name() == "speed" {
            // Check the type description
            let type_str = format!("{:?}", input.dtype());
            return type_str.contains("Int32") || type_str.contains("int32");
        }
    }
    // Default: the v0.19 export takes a float32 speed
    false
}

/// Split phoneme IDs into chunks of at most `MAX_PHONEME_LEN`, preferring punctuation.
fn split_chunks(ids: &[i64]) -> Vec<Vec<i64>> {
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < ids.len() {
        let end = (start + MAX_PHONEME_LEN).min(ids.len());
        if end == ids.len() {
            chunks.push(ids[start..end].to_vec());
            break;
        }

        // Try to find a good split point (last punctuation before `end`).
        // Punctuation IDs (hardcoded vocab): ';':1 ':':2 ',':3 '.':4 '!':5 '?':6
        const PUNCT_IDS: &[i64] = &[1, 2, 3, 4, 5, 6];
        let split = ids[start..end]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, &id)| PUNCT_IDS.contains(&id))
            .map(|(i, _)| start + i + 1)
            .unwrap_or(end);

        chunks.push(ids[start..split].to_vec());
        start = split;
    }

    chunks
}

fn append_with_crossfade(dst: &mut Vec<f32>, src: &[f32], crossfade_samples: usize) {
    let overlap = crossfade_samples.min(dst.len()).min(src.len());
    if overlap == 0 {
        dst.extend_from_slice(src);
        return;
    }

    let dst_start = dst.len() - overlap;
    for i in 0..overlap {
        let t = (i + 1) as f32 / (overlap as f32 + 1.0);
        let left = dst[dst_start + i] * (1.0 - t);
        let right = src[i] * t;
        dst[dst_start + i] = left + right;
    }

    dst.extend_from_slice(&src[overlap..]);
}
