//! File plumbing for workshop data: format detection (RON/JSON/TOML), file
//! discovery, deserialization and name lookup helpers.

use petalcraft_core::config::ConfigError;
use petalcraft_core::registry::CatalogError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// No `{file}.ron`, `.toml` or `.json` in `dir`.
    #[error("no '{file}' data file in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("{file}: expected a .ron, .toml or .json extension")]
    UnsupportedFormat { file: PathBuf },

    /// The same layout exists in two formats and neither wins.
    #[error("both {a} and {b} exist; keep one")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("{file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A mapping names a prefab that was never declared.
    #[error("{file}: no {expected_kind} named '{name}'")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("{file}: '{name}' declared twice")]
    DuplicateName { file: PathBuf, name: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// `index` counts from zero within that station list.
    #[error("invalid {station} #{index}: {source}")]
    Config {
        station: &'static str,
        index: usize,
        source: ConfigError,
    },

    #[error("file declares {expected} baskets but {got} bodies were supplied")]
    BasketBodies { expected: usize, got: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    /// Probe order for [`find_data_file`].
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    Format::ALL
        .into_iter()
        .find(|f| Some(f.extension()) == ext)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Look for `{base_name}.ron`, `.toml` or `.json` in `dir`. At most one
/// of them may exist.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut present = Format::ALL
        .into_iter()
        .map(|f| dir.join(format!("{base_name}.{}", f.extension())))
        .filter(|candidate| candidate.exists());
    let Some(first) = present.next() else {
        return Ok(None);
    };
    match present.next() {
        Some(second) => Err(DataLoadError::ConflictingFormats { a: first, b: second }),
        None => Ok(Some(first)),
    }
}

pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Parse `path` with the deserializer its extension selects.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    tracing::debug!(file = %path.display(), ?format, bytes = content.len(), "parsing data file");

    let parsed = match format {
        Format::Ron => ron::from_str(&content).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|detail| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    })
}

// ===========================================================================
// Name lookup
// ===========================================================================

pub fn resolve_name<'a, V>(
    names: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    names.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_owned(),
        expected_kind,
    })
}

/// Fails if `name` is already taken.
pub fn check_duplicate<V>(
    names: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    match names.contains_key(name) {
        true => Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_owned(),
        }),
        false => Ok(()),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
