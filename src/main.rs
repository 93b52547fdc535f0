use std::time::Instant;

use kokoro_setup::{
    config::SetupConfig,
    download::{HttpFetcher, Retrying},
    engines::kokoro::KokoroEngine,
    espeak::EspeakConfig,
    pipeline,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = SetupConfig::load()?;

    // espeak-ng has to be in place before anything touches the phonemizer.
    let mut espeak = EspeakConfig::configure(&config.espeak_library, &config.espeak_executable)?;
    if let Some(data_dir) = &config.espeak_data {
        espeak = espeak.with_data_dir(data_dir);
    }
    espeak.export();

    let fetcher = Retrying::new(
        HttpFetcher::new(&config.base_url, &config.assets_dir),
        config.retry,
    );

    let start = Instant::now();
    let output = pipeline::run(&config, &fetcher, KokoroEngine::with_espeak(espeak))?;
    log::info!("Wrote {} in {:.2?}", output.display(), start.elapsed());

    Ok(())
}
