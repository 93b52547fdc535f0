//! Asset download from the Kokoro-82M model host.
//!
//! [`HttpFetcher`] mirrors the remote repository layout under a local
//! directory, downloading a file only when it is not already on disk.
//! [`Retrying`] adds a bounded retry policy around any [`Fetch`].

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::SetupError;

/// Bytes read from the response and written to disk per iteration.
pub const CHUNK_SIZE: usize = 1024;

/// Resolve a repository-relative filename to a local file.
pub trait Fetch {
    /// Return the local path for `filename`, downloading it if needed.
    fn fetch(&self, filename: &str) -> Result<PathBuf, SetupError>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, filename: &str) -> Result<PathBuf, SetupError> {
        (**self).fetch(filename)
    }
}

/// Downloads `<base_url>/<filename>` into `<root>/<filename>`.
pub struct HttpFetcher {
    base_url: String,
    root: PathBuf,
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            root: root.into(),
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    /// Where `filename` lives (or will live) on disk.
    pub fn local_path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    pub fn url(&self, filename: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            filename.trim_start_matches('/')
        )
    }

    fn download(&self, url: &str, dest: &Path) -> Result<(), SetupError> {
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(status, _) => SetupError::Http {
                url: url.to_owned(),
                status,
            },
            ureq::Error::Transport(transport) => SetupError::Transport {
                url: url.to_owned(),
                message: transport.to_string(),
            },
        })?;

        if let Some(len) = response
            .header("content-length")
            .and_then(|v| v.parse::<u64>().ok())
        {
            log::debug!("{url}: {len} bytes");
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        // Stream into a sibling `.part` file so a broken transfer never
        // shows up at `dest`.
        let tmp = part_path(dest);
        let result = write_body(response.into_reader(), &tmp, url);
        if let Err(e) = result {
            fs::remove_file(&tmp).ok();
            return Err(e);
        }
        fs::rename(&tmp, dest)?;
        Ok(())
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, filename: &str) -> Result<PathBuf, SetupError> {
        let dest = self.local_path(filename);
        if dest.exists() {
            log::debug!("{filename} [cached]");
            return Ok(dest);
        }

        log::info!("Model file {filename} not found. Attempting to download...");
        let url = self.url(filename);
        self.download(&url, &dest)?;
        log::info!("Downloaded {filename} successfully!");
        Ok(dest)
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn write_body(mut reader: impl Read, path: &Path, url: &str) -> Result<u64, SetupError> {
    let mut file = File::create(path)?;
    let mut buf = [0u8; CHUNK_SIZE];
    let mut written: u64 = 0;
    loop {
        let n = reader.read(&mut buf).map_err(|e| SetupError::Transport {
            url: url.to_owned(),
            message: format!("read error: {e}"),
        })?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])?;
        written += n as u64;
    }
    file.flush()?;
    Ok(written)
}

/// Bounded retry with exponential backoff.
///
/// The default is a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 500,
            backoff_multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay before the zero-based `attempt`. The first attempt never waits.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = u64::from(self.backoff_multiplier).saturating_pow(attempt - 1);
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }
}

/// Wraps a [`Fetch`] with a [`RetryPolicy`].
pub struct Retrying<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: Fetch> Retrying<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: Fetch> Fetch for Retrying<F> {
    fn fetch(&self, filename: &str) -> Result<PathBuf, SetupError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            let delay = self.policy.delay_for_attempt(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            match self.inner.fetch(filename) {
                Ok(path) => return Ok(path),
                Err(err) if err.is_retryable() && attempt + 1 < attempts => {
                    log::warn!(
                        "fetching {filename} failed (attempt {}/{attempts}): {err}",
                        attempt + 1
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
