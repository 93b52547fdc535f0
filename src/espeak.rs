//! espeak-ng discovery and validation.
//!
//! The phonemizer needs the espeak-ng shared library and executable. Both
//! paths are checked once at startup and carried in an [`EspeakConfig`]
//! that the Kokoro engine uses to spawn espeak-ng.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::SetupError;

/// Environment variable naming the espeak-ng shared library.
pub const LIBRARY_ENV_VAR: &str = "PHONEMIZER_ESPEAK_LIBRARY";
/// Environment variable naming the espeak-ng executable.
pub const EXECUTABLE_ENV_VAR: &str = "PHONEMIZER_ESPEAK_PATH";

#[cfg(windows)]
pub const DEFAULT_LIBRARY: &str = r"C:\Program Files\eSpeak NG\libespeak-ng.dll";
#[cfg(windows)]
pub const DEFAULT_EXECUTABLE: &str = r"C:\Program Files\eSpeak NG\espeak-ng.exe";

#[cfg(not(windows))]
pub const DEFAULT_LIBRARY: &str = "/usr/lib/x86_64-linux-gnu/libespeak-ng.so.1";
#[cfg(not(windows))]
pub const DEFAULT_EXECUTABLE: &str = "/usr/bin/espeak-ng";

/// Where to find espeak-ng.
///
/// `Default` runs `espeak-ng` from PATH without a known library location;
/// [`EspeakConfig::configure`] is the validated form used by the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EspeakConfig {
    library: Option<PathBuf>,
    executable: PathBuf,
    data_dir: Option<PathBuf>,
}

impl Default for EspeakConfig {
    fn default() -> Self {
        Self {
            library: None,
            executable: PathBuf::from("espeak-ng"),
            data_dir: None,
        }
    }
}

impl EspeakConfig {
    /// Validate that both files exist and build a config from them.
    pub fn configure(
        library: impl Into<PathBuf>,
        executable: impl Into<PathBuf>,
    ) -> Result<Self, SetupError> {
        let library = library.into();
        let executable = executable.into();

        log::info!("{LIBRARY_ENV_VAR}: {}", library.display());
        log::info!("{EXECUTABLE_ENV_VAR}: {}", executable.display());

        if !library.exists() {
            return Err(SetupError::MissingDependency {
                what: "library",
                path: library,
            });
        }
        if !executable.exists() {
            return Err(SetupError::MissingDependency {
                what: "executable",
                path: executable,
            });
        }

        Ok(Self {
            library: Some(library),
            executable,
            data_dir: None,
        })
    }

    /// Point espeak-ng at a bundled `espeak-ng-data` directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn library(&self) -> Option<&Path> {
        self.library.as_deref()
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// The phonemizer environment variables this config implies.
    pub fn env_vars(&self) -> Vec<(&'static str, &OsStr)> {
        let mut vars = Vec::with_capacity(2);
        if let Some(library) = &self.library {
            vars.push((LIBRARY_ENV_VAR, library.as_os_str()));
        }
        vars.push((EXECUTABLE_ENV_VAR, self.executable.as_os_str()));
        vars
    }

    /// Export [`env_vars`](Self::env_vars) into the process environment.
    ///
    /// Process-wide and never undone. Call once from `main` before any
    /// other thread is started.
    pub fn export(&self) {
        for (key, value) in self.env_vars() {
            std::env::set_var(key, value);
        }
    }

    /// A `Command` for the espeak-ng executable with the environment and
    /// data directory applied.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.envs(self.env_vars());
        if let Some(data_dir) = &self.data_dir {
            cmd.arg(format!("--path={}", data_dir.display()));
        }
        cmd
    }
}
