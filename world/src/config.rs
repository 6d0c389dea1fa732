//! Level parameters and the faults that reject them.

use endless_pipes_core::{CatalogError, Direction, TileCatalog};
use serde::{Deserialize, Serialize};

const DEFAULT_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Parameters controlling grid shape, inflow and scrolling of a level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Number of columns in every row.
    pub columns: u32,
    /// Number of rows visible at once; also the size of every growth batch.
    pub viewport_rows: u32,
    /// Column of the cell that receives fluid.
    pub entry_column: u32,
    /// Seed for row generation.
    pub seed: u64,
    /// Volume poured into the entry per second at the start of the session.
    pub inflow_rate: f64,
    /// Increase of the inflow rate per second.
    pub inflow_acceleration: f64,
    /// Rows scrolled per second at the start of the session.
    pub scroll_rate: f64,
    /// Increase of the scroll rate per second.
    pub scroll_acceleration: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            columns: 5,
            viewport_rows: 5,
            entry_column: 2,
            seed: DEFAULT_SEED,
            inflow_rate: 16.0,
            inflow_acceleration: 0.25,
            scroll_rate: 0.1,
            scroll_acceleration: 0.002,
        }
    }
}

impl LevelConfig {
    pub(crate) fn validate(&self, catalog: &TileCatalog) -> Result<(), ConfigError> {
        if self.columns == 0 {
            return Err(ConfigError::NoColumns);
        }
        if self.viewport_rows == 0 {
            return Err(ConfigError::NoRows);
        }
        if self.entry_column >= self.columns {
            return Err(ConfigError::EntryOutOfBounds {
                column: self.entry_column,
                columns: self.columns,
            });
        }
        let rates = [
            ("inflow_rate", self.inflow_rate),
            ("inflow_acceleration", self.inflow_acceleration),
            ("scroll_rate", self.scroll_rate),
            ("scroll_acceleration", self.scroll_acceleration),
        ];
        for (name, value) in rates {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidRate { name });
            }
        }
        let has_entry_tile = catalog
            .tiles()
            .iter()
            .any(|tile| tile.spawn_weight > 0.0 && tile.can_receive_through(Direction::Top));
        if !has_entry_tile {
            return Err(ConfigError::NoEntryTile);
        }
        Ok(())
    }
}

/// Configuration faults that prevent a level from being constructed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The tile catalog itself is invalid.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The grid has no columns.
    #[error("level needs at least one column")]
    NoColumns,
    /// The viewport has no rows.
    #[error("level needs at least one viewport row")]
    NoRows,
    /// The entry column lies outside the grid.
    #[error("entry column {column} lies outside a grid of {columns} columns")]
    EntryOutOfBounds {
        /// Requested entry column.
        column: u32,
        /// Number of columns in the grid.
        columns: u32,
    },
    /// A rate or acceleration is negative or not finite.
    #[error("`{name}` must be a finite, non-negative number")]
    InvalidRate {
        /// Name of the offending parameter.
        name: &'static str,
    },
    /// No spawnable tile can receive fluid from above while opening another port.
    #[error("no spawnable tile can serve as the entry")]
    NoEntryTile,
    /// A hand-authored row does not match the grid width.
    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth {
        /// Absolute index of the offending row.
        row: u32,
        /// Number of columns in the grid.
        expected: u32,
        /// Number of cells supplied.
        found: usize,
    },
    /// A hand-authored layout contains no rows.
    #[error("layout contains no rows")]
    EmptyLayout,
}
