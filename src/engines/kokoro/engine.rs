use std::path::{Path, PathBuf};

use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};

use crate::espeak::EspeakConfig;
use crate::{Device, Language, SynthesisEngine, SynthesisResult, VoicePack};

use super::model::{KokoroError, KokoroModel, SAMPLE_RATE};

/// Parameters for configuring a Kokoro synthesis request.
#[derive(Debug, Clone)]
pub struct KokoroInferenceParams {
    /// Speech speed multiplier. Range: 0.5–2.0, default 1.0.
    pub speed: f32,
    /// Override the style vector index. `None` = auto (uses phoneme token count).
    pub style_index: Option<usize>,
}

impl Default for KokoroInferenceParams {
    fn default() -> Self {
        Self {
            speed: 1.0,
            style_index: None,
        }
    }
}

/// Kokoro text-to-speech engine.
///
/// # Bundled espeak-ng
///
/// ```rust,no_run
/// use kokoro_setup::engines::kokoro::KokoroEngine;
/// use kokoro_setup::espeak::EspeakConfig;
///
/// let espeak = EspeakConfig::configure(
///     "/app/resources/espeak-ng/libespeak-ng.so.1",
///     "/app/resources/espeak-ng/espeak-ng",
/// )?
/// .with_data_dir("/app/resources/espeak-ng-data");
/// let engine = KokoroEngine::with_espeak(espeak);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct KokoroEngine {
    model: Option<KokoroModel>,
    model_path: Option<PathBuf>,
    espeak: EspeakConfig,
}

impl Default for KokoroEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl KokoroEngine {
    /// Create a new engine that uses `espeak-ng` from PATH.
    pub fn new() -> Self {
        Self::with_espeak(EspeakConfig::default())
    }

    /// Create a new engine with a validated espeak-ng installation.
    pub fn with_espeak(espeak: EspeakConfig) -> Self {
        Self {
            model: None,
            model_path: None,
            espeak,
        }
    }

    /// Path of the currently loaded model, if any.
    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    /// Device the loaded model runs on.
    pub fn device(&self) -> Option<Device> {
        self.model.as_ref().map(|m| m.device())
    }
}

impl Drop for KokoroEngine {
    fn drop(&mut self) {
        self.unload_model();
    }
}

impl SynthesisEngine for KokoroEngine {
    type SynthesisParams = KokoroInferenceParams;
    type ModelParams = ();

    fn accelerator_available(&self) -> bool {
        match CUDAExecutionProvider::default().is_available() {
            Ok(available) => available,
            Err(e) => {
                log::debug!("CUDA availability probe failed: {e}");
                false
            }
        }
    }

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        device: Device,
        _params: (),
    ) -> Result<(), Box<dyn std::error::Error>> {
        let model = KokoroModel::load(model_path, device)?;
        self.model = Some(model);
        self.model_path = Some(model_path.to_path_buf());
        Ok(())
    }

    fn unload_model(&mut self) {
        self.model = None;
        self.model_path = None;
    }

    fn synthesize(
        &mut self,
        text: &str,
        voice: &VoicePack,
        language: Language,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>> {
        let model = self.model.as_mut().ok_or(KokoroError::ModelNotLoaded)?;

        let p = params.unwrap_or_default();
        let (samples, phonemes) = model.synthesize_text(
            text,
            voice,
            language,
            p.speed,
            p.style_index,
            &self.espeak,
        )?;

        Ok(SynthesisResult {
            samples,
            sample_rate: SAMPLE_RATE,
            phonemes,
        })
    }
}
