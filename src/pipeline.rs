//! The setup-then-synthesize sequence.
//!
//! [`setup_tts`] makes sure the model and every configured voice pack are on
//! disk, loads the model on the best available device and loads the
//! requested voice by name. [`generate_speech`] turns text into a WAV file.

use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};

use crate::config::SetupConfig;
use crate::download::Fetch;
use crate::{Device, Language, SetupError, SynthesisEngine, SynthesisResult, VoicePack};

/// A model ready to synthesize with one voice.
pub struct LoadedTts<E> {
    pub engine: E,
    pub voice: VoicePack,
    pub device: Device,
}

/// Download every configured voice pack, keyed by voice name.
pub fn fetch_voices<F: Fetch>(
    voices: &[String],
    fetcher: &F,
) -> Result<HashMap<String, PathBuf>, SetupError> {
    voices
        .iter()
        .map(|voice| {
            let path = fetcher.fetch(&SetupConfig::voice_file(voice))?;
            Ok((voice.clone(), path))
        })
        .collect()
}

/// Fetch assets, load the model and the configured voice.
pub fn setup_tts<E, F>(
    config: &SetupConfig,
    fetcher: &F,
    mut engine: E,
) -> Result<LoadedTts<E>, Box<dyn Error>>
where
    E: SynthesisEngine,
    F: Fetch,
{
    let device = Device::select(config.device, engine.accelerator_available())?;
    println!("Using device: {device}");

    let model_path = fetcher.fetch(&config.model_file)?;
    engine.load_model(&model_path, device)?;

    let voice_paths = fetch_voices(&config.voices, fetcher)?;
    let voice_path = voice_paths
        .get(&config.voice)
        .ok_or_else(|| SetupError::UnknownVoice(config.voice.clone()))?;
    let voice = VoicePack::load(&config.voice, voice_path)?;
    println!("Loaded voice: {}", voice.name());

    Ok(LoadedTts {
        engine,
        voice,
        device,
    })
}

/// Synthesize `text` and write it to `output_path` as a WAV file.
///
/// The language comes from the first character of `voice_name`.
pub fn generate_speech<E: SynthesisEngine>(
    engine: &mut E,
    voice: &VoicePack,
    text: &str,
    voice_name: &str,
    output_path: &Path,
) -> Result<SynthesisResult, Box<dyn Error>> {
    let language = Language::from_voice_name(voice_name)?;
    log::debug!("Synthesizing {} chars as {language:?}", text.len());

    let result = engine.synthesize_to_file(text, voice, language, output_path, None)?;
    println!("Audio saved to {}", output_path.display());
    println!("Phonemes: {}", result.phonemes);
    Ok(result)
}

/// Run the whole pipeline once with `config.text`, returning the WAV path.
pub fn run<E, F>(config: &SetupConfig, fetcher: &F, engine: E) -> Result<PathBuf, Box<dyn Error>>
where
    E: SynthesisEngine,
    F: Fetch,
{
    let LoadedTts {
        mut engine, voice, ..
    } = setup_tts(config, fetcher, engine)?;

    let output_path = config.output_path()?;
    let result = generate_speech(
        &mut engine,
        &voice,
        &config.text,
        &config.voice,
        &output_path,
    )?;
    log::info!(
        "Synthesized {:.2}s of audio at {} Hz",
        result.duration_secs(),
        result.sample_rate
    );

    engine.unload_model();
    Ok(output_path)
}
