use std::{error::Error, fmt, fs, io, path::Path};

use endless_pipes_core::TileDefinition;
use serde::{Deserialize, Serialize};

/// Version tag accepted in catalog files.
pub(crate) const CATALOG_VERSION: u32 = 1;

/// Tile definitions loaded from a JSON catalog file.
///
/// ```json
/// { "version": 1, "tiles": [{ "name": "straight", "connectivity": ["top", "bottom"],
///   "orientations": [0, 1], "capacity": 128.0, "spawn_weight": 1.0 }] }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct CatalogFile {
    /// Format version of the file.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Tiles the level may spawn.
    pub tiles: Vec<TileDefinition>,
}

fn default_version() -> u32 {
    CATALOG_VERSION
}

impl CatalogFile {
    /// Reads and parses the catalog stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self, CatalogFileError> {
        let text = fs::read_to_string(path).map_err(CatalogFileError::Unreadable)?;
        Self::parse(&text)
    }

    /// Parses a catalog from its JSON text.
    pub(crate) fn parse(text: &str) -> Result<Self, CatalogFileError> {
        if text.trim().is_empty() {
            return Err(CatalogFileError::EmptyFile);
        }
        let file: Self = serde_json::from_str(text).map_err(CatalogFileError::InvalidPayload)?;
        if file.version != CATALOG_VERSION {
            return Err(CatalogFileError::UnsupportedVersion(file.version));
        }
        Ok(file)
    }
}

/// Errors that can occur while loading catalog files.
#[derive(Debug)]
pub(crate) enum CatalogFileError {
    /// The file could not be read.
    Unreadable(io::Error),
    /// The file was empty or contained only whitespace.
    EmptyFile,
    /// The file declared a format version this build does not understand.
    UnsupportedVersion(u32),
    /// The file contents could not be deserialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for CatalogFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(error) => write!(f, "could not read catalog file: {error}"),
            Self::EmptyFile => write!(f, "catalog file was empty"),
            Self::UnsupportedVersion(version) => {
                write!(f, "catalog version {version} is not supported")
            }
            Self::InvalidPayload(error) => write!(f, "could not parse catalog: {error}"),
        }
    }
}

impl Error for CatalogFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unreadable(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use endless_pipes_core::{Direction, TileCatalog};

    #[test]
    fn parses_a_minimal_catalog() {
        let text = r#"{
            "tiles": [
                {
                    "name": "straight",
                    "connectivity": ["top", "bottom"],
                    "orientations": [0, 1],
                    "capacity": 64.0,
                    "spawn_weight": 1.0
                }
            ]
        }"#;

        let file = CatalogFile::parse(text).expect("catalog parses");

        assert_eq!(file.version, CATALOG_VERSION);
        assert_eq!(file.tiles.len(), 1);
        assert!(file.tiles[0].connectivity.contains(Direction::Bottom));
        assert!((file.tiles[0].capacity - 64.0).abs() < f64::EPSILON);
    }

    #[test]
    fn standard_catalog_survives_a_json_round_trip() {
        let tiles: Vec<TileDefinition> = TileCatalog::standard().into();
        let file = CatalogFile {
            version: CATALOG_VERSION,
            tiles,
        };

        let text = serde_json::to_string(&file).expect("catalog serialises");

        assert_eq!(CatalogFile::parse(&text).expect("catalog parses"), file);
    }

    #[test]
    fn rejects_empty_and_unknown_versions() {
        assert!(matches!(
            CatalogFile::parse("  \n"),
            Err(CatalogFileError::EmptyFile)
        ));
        assert!(matches!(
            CatalogFile::parse(r#"{ "version": 7, "tiles": [] }"#),
            Err(CatalogFileError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn rejects_out_of_range_orientations() {
        let text = r#"{ "tiles": [{ "name": "bent", "connectivity": ["top"],
            "orientations": [4], "capacity": 1.0, "spawn_weight": 1.0 }] }"#;

        assert!(matches!(
            CatalogFile::parse(text),
            Err(CatalogFileError::InvalidPayload(_))
        ));
    }
}
