#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Endless Pipes engine.
//!
//! This crate defines the vocabulary that connects adapters and the
//! authoritative level. Adapters submit [`Command`] values describing desired
//! mutations, the level executes those commands via its `apply` entry point,
//! and then reports [`Event`] values describing what happened. Tile shapes are
//! described by [`TileDefinition`] values gathered into an immutable
//! [`TileCatalog`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod catalog;

pub use catalog::{CatalogError, TileCatalog, TileDefinition};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Endless Pipes.";

/// Compass direction naming one of the four ports of a pipe segment.
///
/// Directions are numbered counter-clockwise starting at the top so that the
/// opposite direction is `(d + 2) mod 4` and one rotation step maps `d` to
/// `(d + 1) mod 4`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Port facing decreasing row indices.
    Top,
    /// Port facing decreasing column indices.
    Left,
    /// Port facing increasing row indices.
    Bottom,
    /// Port facing increasing column indices.
    Right,
}

impl Direction {
    /// All directions in ascending index order.
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Left,
        Direction::Bottom,
        Direction::Right,
    ];

    /// Numeric index of the direction in the range `0..4`.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Top => 0,
            Self::Left => 1,
            Self::Bottom => 2,
            Self::Right => 3,
        }
    }

    /// Resolves the direction for the provided index, wrapping modulo four.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        Self::from_index(self.index() + 2)
    }

    /// Applies the provided orientation, mapping a canonical port onto the
    /// absolute direction it faces once the tile is placed.
    #[must_use]
    pub const fn rotated(self, orientation: Orientation) -> Self {
        Self::from_index(self.index() + orientation.step() as usize)
    }

    /// Reverses [`Direction::rotated`], mapping an absolute direction back onto
    /// the canonical port of a tile placed with the provided orientation.
    #[must_use]
    pub const fn unrotated(self, orientation: Orientation) -> Self {
        Self::from_index(self.index() + 4 - orientation.step() as usize)
    }
}

/// Rotation step applied to a tile, measured in quarter turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Orientation(u8);

impl Orientation {
    /// Unrotated placement.
    pub const IDENTITY: Orientation = Orientation(0);

    /// Creates an orientation from a rotation step, rejecting steps outside `0..4`.
    #[must_use]
    pub const fn new(step: u8) -> Option<Self> {
        if step < 4 {
            Some(Self(step))
        } else {
            None
        }
    }

    /// Number of quarter turns applied by the orientation.
    #[must_use]
    pub const fn step(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Orientation {
    type Error = InvalidOrientation;

    fn try_from(step: u8) -> Result<Self, Self::Error> {
        Self::new(step).ok_or(InvalidOrientation(step))
    }
}

impl From<Orientation> for u8 {
    fn from(orientation: Orientation) -> Self {
        orientation.0
    }
}

/// Error produced when a rotation step lies outside `0..4`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("rotation step {0} is outside 0..4")]
pub struct InvalidOrientation(pub u8);

/// Compact set of directions describing the open ports of a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Direction>", into = "Vec<Direction>")]
pub struct PortSet(u8);

impl PortSet {
    /// Set containing no ports.
    pub const EMPTY: PortSet = PortSet(0);

    /// Builds a set from the provided directions.
    #[must_use]
    pub fn from_directions(directions: &[Direction]) -> Self {
        directions
            .iter()
            .fold(Self::EMPTY, |set, direction| set.with(*direction))
    }

    /// Returns a copy of the set with the provided direction added.
    #[must_use]
    pub const fn with(self, direction: Direction) -> Self {
        Self(self.0 | (1 << direction.index()))
    }

    /// Reports whether the set contains the provided direction.
    #[must_use]
    pub const fn contains(&self, direction: Direction) -> bool {
        self.0 & (1 << direction.index()) != 0
    }

    /// Reports whether the set is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of ports contained in the set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Rotates every port of the set by the provided orientation.
    #[must_use]
    pub fn rotated(self, orientation: Orientation) -> Self {
        self.iter()
            .fold(Self::EMPTY, |set, port| set.with(port.rotated(orientation)))
    }

    /// Iterates the contained directions in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = Direction> {
        let bits = self.0;
        Direction::ALL
            .into_iter()
            .filter(move |direction| bits & (1 << direction.index()) != 0)
    }
}

impl From<Vec<Direction>> for PortSet {
    fn from(directions: Vec<Direction>) -> Self {
        Self::from_directions(&directions)
    }
}

impl From<PortSet> for Vec<Direction> {
    fn from(set: PortSet) -> Self {
        set.iter().collect()
    }
}

/// Location of a single grid cell expressed as column and absolute row.
///
/// Rows are numbered from the first row ever generated, so a coordinate keeps
/// naming the same cell while the grid scrolls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Absolute row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Coordinate one step away in the provided direction.
    ///
    /// Returns `None` when the step would leave the non-negative quadrant;
    /// upper bounds are the grid's business.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        match direction {
            Direction::Top => self.row.checked_sub(1).map(|row| Self::new(self.column, row)),
            Direction::Left => self
                .column
                .checked_sub(1)
                .map(|column| Self::new(column, self.row)),
            Direction::Bottom => self.row.checked_add(1).map(|row| Self::new(self.column, row)),
            Direction::Right => self
                .column
                .checked_add(1)
                .map(|column| Self::new(column, self.row)),
        }
    }
}

/// Commands that express all permissible level mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Selects, deselects or swaps with the clicked cell.
    SelectCell {
        /// Cell the player clicked.
        cell: CellCoord,
    },
    /// Swaps the currently selected cell with the provided cell.
    SwapSelected {
        /// Cell that should trade places with the selection.
        cell: CellCoord,
    },
}

/// Events reported by the level after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Reports the volume poured into the entry cell during a tick.
    FluidInjected {
        /// Entry cell that received the fluid.
        cell: CellCoord,
        /// Volume poured through the entry port.
        volume: f64,
    },
    /// Announces that freshly generated rows were appended ahead of the frontier.
    RowsAppended {
        /// Absolute index of the first appended row.
        first_row: u32,
        /// Number of rows appended.
        count: u32,
    },
    /// Announces that rows scrolled behind the view were dropped.
    RowsRetired {
        /// Absolute index of the first retired row.
        first_row: u32,
        /// Number of rows retired.
        count: u32,
        /// Fluid that the retired cells held at the moment they were dropped.
        volume: f64,
    },
    /// Reports that fluid is now injected into a different cell.
    EntryMoved {
        /// New entry cell.
        cell: CellCoord,
    },
    /// Confirms that a cell became selected.
    CellSelected {
        /// Cell holding the selection marker.
        cell: CellCoord,
    },
    /// Confirms that a cell lost its selection marker.
    SelectionCleared {
        /// Cell that previously held the selection.
        cell: CellCoord,
    },
    /// Reports that a selection request was rejected.
    SelectionRejected {
        /// Cell the request targeted.
        cell: CellCoord,
        /// Specific reason the request failed.
        reason: InteractionError,
    },
    /// Confirms that two cells exchanged their tiles.
    CellsSwapped {
        /// First cell taking part in the swap.
        first: CellCoord,
        /// Second cell taking part in the swap.
        second: CellCoord,
    },
    /// Reports that a swap request was rejected.
    SwapRejected {
        /// First cell named by the request.
        first: CellCoord,
        /// Second cell named by the request.
        second: CellCoord,
        /// Specific reason the swap failed.
        reason: InteractionError,
    },
    /// Announces the terminal failure of the level.
    LevelFailed {
        /// Leak that ended the session.
        cause: FailureCause,
    },
}

/// Reasons a player interaction may be rejected by the level.
///
/// Rejections never change state and never fail the level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionError {
    /// The targeted cell already holds fluid.
    Filled,
    /// No live cell exists at the targeted coordinate.
    MissingCell,
    /// A swap was requested while nothing was selected.
    NothingSelected,
}

/// Describes how fluid escaped the pipe network.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum FailureCause {
    /// Fluid was pushed into a port that the receiving tile does not open.
    ClosedPort {
        /// Cell that refused the fluid.
        cell: CellCoord,
        /// Direction through which the fluid arrived.
        direction: Direction,
    },
    /// Overflow was shed through a port facing the edge of the grid.
    Boundary {
        /// Cell whose port faces the edge.
        cell: CellCoord,
        /// Direction of the port facing the edge.
        direction: Direction,
    },
    /// The network as a whole could not absorb the injected volume.
    Unabsorbed {
        /// Volume that found nowhere to go.
        remainder: f64,
    },
}
