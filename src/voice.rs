use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use crate::SetupError;

/// Style vector dimension for Kokoro.
pub const STYLE_DIM: usize = 256;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// One speaker's style vectors.
///
/// Row `i` is the style to use for an utterance of `i` phoneme tokens,
/// which keeps prosody consistent with the length of the input.
#[derive(Debug, Clone)]
pub struct VoicePack {
    name: String,
    source: PathBuf,
    styles: Vec<[f32; STYLE_DIM]>,
}

impl VoicePack {
    /// Load a voice pack from disk.
    ///
    /// Accepts a PyTorch `.pt` archive (a zip holding the tensor storage as
    /// `<archive>/data/0`) or a raw little-endian float32 `.bin` dump.
    pub fn load(name: &str, path: &Path) -> Result<Self, SetupError> {
        let bytes = fs::read(path)?;
        let floats = if bytes.starts_with(ZIP_MAGIC) {
            read_torch_storage(&bytes, path)?
        } else {
            bytes
        };
        let styles = parse_styles(&floats, &path.display().to_string())?;
        log::info!(
            "Loaded voice pack '{name}' from {} ({} styles)",
            path.display(),
            styles.len()
        );
        Ok(Self {
            name: name.to_string(),
            source: path.to_path_buf(),
            styles,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File this pack was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Get the style vector for the given token count.
    ///
    /// The index is clamped to the valid range; `None` only for an empty pack.
    pub fn style(&self, idx: usize) -> Option<&[f32; STYLE_DIM]> {
        let clamped = idx.min(self.styles.len().checked_sub(1)?);
        self.styles.get(clamped)
    }
}

/// Pull the raw tensor storage out of a `torch.save` zip archive.
fn read_torch_storage(bytes: &[u8], path: &Path) -> Result<Vec<u8>, SetupError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        SetupError::VoiceParse(format!("{}: failed to open archive: {e}", path.display()))
    })?;

    let mut storage = None;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| {
            SetupError::VoiceParse(format!("{}: failed to read entry {i}: {e}", path.display()))
        })?;
        let name = entry.name().to_string();
        if name.ends_with("/byteorder") {
            let mut order = String::new();
            entry.read_to_string(&mut order).map_err(|e| {
                SetupError::VoiceParse(format!("{}: {e}", path.display()))
            })?;
            if order.trim() != "little" {
                return Err(SetupError::VoiceParse(format!(
                    "{}: unsupported byte order '{}'",
                    path.display(),
                    order.trim()
                )));
            }
        } else if name.ends_with("/data/0") {
            storage = Some(i);
        }
    }

    let idx = storage.ok_or_else(|| {
        SetupError::VoiceParse(format!("{}: no tensor storage entry", path.display()))
    })?;
    let mut entry = zip.by_index(idx).map_err(|e| {
        SetupError::VoiceParse(format!("{}: failed to read storage: {e}", path.display()))
    })?;
    let mut data = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut data)
        .map_err(|e| SetupError::VoiceParse(format!("{}: {e}", path.display())))?;
    Ok(data)
}

/// Parse little-endian float32 data into style vectors.
fn parse_styles(data: &[u8], name: &str) -> Result<Vec<[f32; STYLE_DIM]>, SetupError> {
    if data.len() % 4 != 0 {
        return Err(SetupError::VoiceParse(format!(
            "{name}: float data length {} is not a multiple of 4",
            data.len()
        )));
    }

    let n_floats = data.len() / 4;
    if n_floats == 0 || n_floats % STYLE_DIM != 0 {
        return Err(SetupError::VoiceParse(format!(
            "{name}: float count {n_floats} is not a positive multiple of {STYLE_DIM}"
        )));
    }

    Ok(data
        .chunks_exact(STYLE_DIM * 4)
        .map(|row| {
            let mut vec = [0f32; STYLE_DIM];
            for (slot, bytes) in vec.iter_mut().zip(row.chunks_exact(4)) {
                *slot = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            vec
        })
        .collect())
}
