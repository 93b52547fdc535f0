//! End-to-end run of the setup pipeline against a mock model host.
//!
//! The mock serves all twelve assets; a stand-in engine replaces ONNX
//! inference so the run is independent of model weights and espeak-ng.

use std::error::Error;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use kokoro_setup::config::{SetupConfig, SetupConfigBuilder, VOICE_NAMES};
use kokoro_setup::download::HttpFetcher;
use kokoro_setup::pipeline;
use kokoro_setup::{
    Device, DevicePreference, Language, SynthesisEngine, SynthesisResult, VoicePack,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

const STYLE_DIM: usize = 256;

/// A `torch.save`-shaped archive whose every float is `marker`.
fn voice_archive(name: &str, marker: f32, rows: usize) -> Vec<u8> {
    let storage: Vec<u8> = std::iter::repeat(marker)
        .take(rows * STYLE_DIM)
        .flat_map(f32::to_le_bytes)
        .collect();
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file(format!("{name}/data.pkl"), opts).unwrap();
    zip.write_all(b"\x80\x02.").unwrap();
    zip.start_file(format!("{name}/byteorder"), opts).unwrap();
    zip.write_all(b"little").unwrap();
    zip.start_file(format!("{name}/data/0"), opts).unwrap();
    zip.write_all(&storage).unwrap();
    zip.finish().unwrap().into_inner()
}

/// Emits a short tone scaled by the voice's first style value.
#[derive(Default)]
struct ToneEngine {
    model: Option<PathBuf>,
}

impl SynthesisEngine for ToneEngine {
    type SynthesisParams = ();
    type ModelParams = ();

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        _device: Device,
        _params: (),
    ) -> Result<(), Box<dyn Error>> {
        assert_eq!(std::fs::read(model_path)?, b"onnx-weights");
        self.model = Some(model_path.to_path_buf());
        Ok(())
    }

    fn unload_model(&mut self) {
        self.model = None;
    }

    fn synthesize(
        &mut self,
        text: &str,
        voice: &VoicePack,
        language: Language,
        _params: Option<()>,
    ) -> Result<SynthesisResult, Box<dyn Error>> {
        assert!(self.model.is_some(), "model must be loaded first");
        let gain = voice.style(text.len()).map(|s| s[0]).unwrap_or(0.0);
        let samples = (0..2400)
            .map(|i| gain * (i as f32 * 0.05).sin())
            .collect();
        Ok(SynthesisResult {
            samples,
            sample_rate: 24000,
            phonemes: format!("{}:{}", language.espeak_code(), text.to_lowercase()),
        })
    }
}

async fn serve_assets(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/kokoro-v0_19.onnx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"onnx-weights".to_vec()))
        .expect(1)
        .mount(server)
        .await;

    for (i, voice) in VOICE_NAMES.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(format!("/voices/{voice}.pt")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(voice_archive(
                voice,
                0.1 * (i + 1) as f32,
                4,
            )))
            .expect(1)
            .mount(server)
            .await;
    }
}

fn config_for(server: &MockServer, root: &Path) -> SetupConfig {
    SetupConfigBuilder::default()
        .base_url(server.uri())
        .assets_dir(root.join("Kokoro-82M"))
        .device(DevicePreference::Cpu)
        .output_dir(root)
        .text("Hello world")
        .build()
        .unwrap()
}

#[tokio::test]
async fn hello_world_produces_a_24khz_wav() {
    let server = MockServer::start().await;
    serve_assets(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server, dir.path());
    let fetcher = HttpFetcher::new(&config.base_url, &config.assets_dir);

    let output = tokio::task::spawn_blocking(move || {
        pipeline::run(&config, &fetcher, ToneEngine::default()).map_err(|e| e.to_string())
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(output, dir.path().join("output.wav"));
    let mut reader = hound::WavReader::open(&output).unwrap();
    assert_eq!(reader.spec().sample_rate, 24000);
    let samples: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
    assert_eq!(samples.len(), 2400);
    assert!(samples.iter().any(|s| *s != 0.0));

    for voice in VOICE_NAMES {
        assert!(dir
            .path()
            .join(format!("Kokoro-82M/voices/{voice}.pt"))
            .is_file());
    }
}

#[tokio::test]
async fn loader_returns_the_af_voice_pack() {
    let server = MockServer::start().await;
    serve_assets(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server, dir.path());
    let fetcher = HttpFetcher::new(&config.base_url, &config.assets_dir);
    let assets = config.assets_dir.clone();

    let (name, source, marker, phonemes) = tokio::task::spawn_blocking(move || {
        let mut loaded = pipeline::setup_tts(&config, &fetcher, ToneEngine::default())
            .map_err(|e| e.to_string())?;
        let result = pipeline::generate_speech(
            &mut loaded.engine,
            &loaded.voice,
            &config.text,
            &config.voice,
            &config.output_path().map_err(|e| e.to_string())?,
        )
        .map_err(|e| e.to_string())?;
        Ok::<_, String>((
            loaded.voice.name().to_string(),
            loaded.voice.source().to_path_buf(),
            loaded.voice.style(0).map(|s| s[0]),
            result.phonemes,
        ))
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(name, "af");
    assert_eq!(source, assets.join("voices/af.pt"));
    assert_ne!(source, assets.join("voices/bm_lewis.pt"));
    assert_eq!(marker, Some(0.1));
    assert_eq!(phonemes, "en-us:hello world");
}
