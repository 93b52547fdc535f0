//! Pipeline configuration.
//!
//! Every field has a default, so an empty JSON object (or no config file at
//! all) reproduces the stock setup: voice `af` from the Kokoro-82M
//! repository, synthesized to `output.wav` in the working directory.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::Deserialize;

use crate::download::RetryPolicy;
use crate::{espeak, DevicePreference, SetupError};

/// Remote repository the assets are mirrored from.
pub const DEFAULT_BASE_URL: &str = "https://huggingface.co/hexgrad/Kokoro-82M/resolve/main";
/// Local directory mirroring the remote layout.
pub const DEFAULT_ASSETS_DIR: &str = "Kokoro-82M";
pub const DEFAULT_MODEL_FILE: &str = "kokoro-v0_19.onnx";
/// 50-50 mix of Bella and Sarah.
pub const DEFAULT_VOICE: &str = "af";
pub const DEFAULT_OUTPUT_FILE: &str = "output.wav";
/// Names a JSON config file to load instead of the defaults.
pub const CONFIG_ENV_VAR: &str = "KOKORO_SETUP_CONFIG";

pub const SAMPLE_TEXT: &str = "How could I know? It's an unanswerable question. \
    Like asking an unborn child if they'll lead a good life. They haven't even been born.";

/// Voice packs published alongside the v0.19 weights.
pub const VOICE_NAMES: [&str; 11] = [
    "af",
    "af_bella",
    "af_nicole",
    "af_sarah",
    "af_sky",
    "am_adam",
    "am_michael",
    "bf_emma",
    "bf_isabella",
    "bm_george",
    "bm_lewis",
];

#[derive(Debug, Clone, Builder, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct SetupConfig {
    #[builder(setter(into))]
    pub base_url: String,
    #[builder(setter(into))]
    pub assets_dir: PathBuf,
    /// Model weights, relative to `assets_dir`.
    #[builder(setter(into))]
    pub model_file: String,
    /// Every voice to make sure is on disk.
    pub voices: Vec<String>,
    /// The voice to load; must be one of `voices`.
    #[builder(setter(into))]
    pub voice: String,
    pub device: DevicePreference,
    #[builder(setter(into))]
    pub espeak_library: PathBuf,
    #[builder(setter(into))]
    pub espeak_executable: PathBuf,
    #[builder(setter(into, strip_option))]
    pub espeak_data: Option<PathBuf>,
    /// Directory the WAV is written to.
    ///
    /// Defaults to the current working directory rather than the
    /// executable's directory, which is often a build or install tree.
    #[builder(setter(into, strip_option))]
    pub output_dir: Option<PathBuf>,
    #[builder(setter(into))]
    pub output_file: String,
    #[builder(setter(into))]
    pub text: String,
    pub retry: RetryPolicy,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            voices: VOICE_NAMES.iter().map(|v| v.to_string()).collect(),
            voice: DEFAULT_VOICE.to_string(),
            device: DevicePreference::Auto,
            espeak_library: PathBuf::from(espeak::DEFAULT_LIBRARY),
            espeak_executable: PathBuf::from(espeak::DEFAULT_EXECUTABLE),
            espeak_data: None,
            output_dir: None,
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            text: SAMPLE_TEXT.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SetupConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, SetupError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| SetupError::Config(format!("{}: {e}", path.display())))
    }

    /// Load from the file named by `KOKORO_SETUP_CONFIG`, or use defaults.
    pub fn load() -> Result<Self, SetupError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                let path = PathBuf::from(path);
                log::info!("Loading configuration from {}", path.display());
                Self::from_json_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Repository-relative filename of a voice pack.
    pub fn voice_file(voice: &str) -> String {
        format!("voices/{voice}.pt")
    }

    /// Absolute path the WAV will be written to.
    pub fn output_path(&self) -> Result<PathBuf, SetupError> {
        let dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        Ok(std::path::absolute(dir.join(&self.output_file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_setup() {
        let config = SetupConfig::default();
        assert_eq!(config.voice, "af");
        assert_eq!(config.voices.len(), 11);
        assert_eq!(config.voices.last().map(String::as_str), Some("bm_lewis"));
        assert_eq!(config.output_file, "output.wav");
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn builder_overrides_selected_fields() {
        let config = SetupConfigBuilder::default()
            .voice("bf_emma")
            .device(DevicePreference::Cpu)
            .output_dir("/tmp/out")
            .build()
            .unwrap();
        assert_eq!(config.voice, "bf_emma");
        assert_eq!(config.device, DevicePreference::Cpu);
        assert_eq!(config.model_file, DEFAULT_MODEL_FILE);
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "voice": "am_adam", "device": "cpu", "retry": { "max_attempts": 3 } }"#,
        )
        .unwrap();

        let config = SetupConfig::from_json_file(&path).unwrap();
        assert_eq!(config.voice, "am_adam");
        assert_eq!(config.device, DevicePreference::Cpu);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff_multiplier, 2);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ voice: ").unwrap();

        assert!(matches!(
            SetupConfig::from_json_file(&path),
            Err(SetupError::Config(_))
        ));
    }

    #[test]
    fn output_path_is_absolute() {
        let config = SetupConfig::default();
        let path = config.output_path().unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("output.wav"));
    }

    #[test]
    fn output_defaults_to_working_directory() {
        let config = SetupConfig::default();
        let cwd = std::path::absolute(std::env::current_dir().unwrap()).unwrap();
        assert_eq!(config.output_path().unwrap(), cwd.join("output.wav"));
    }

    #[test]
    fn voice_files_live_under_voices() {
        assert_eq!(SetupConfig::voice_file("af"), "voices/af.pt");
    }
}
