//! Per-cell fluid state layered over an immutable tile definition.

use std::sync::Arc;

use endless_pipes_core::{Direction, Orientation, PortSet, TileDefinition};

/// Mutable simulation state bound to one grid position.
#[derive(Clone, Debug)]
pub struct Cell {
    tile: Arc<TileDefinition>,
    orientation: Orientation,
    fill: [f64; 4],
    throughput: [f64; 4],
    pub(crate) distributing: bool,
    dirty: bool,
}

impl Cell {
    /// Creates an empty cell holding the provided tile.
    #[must_use]
    pub fn new(tile: Arc<TileDefinition>, orientation: Orientation) -> Self {
        Self {
            tile,
            orientation,
            fill: [0.0; 4],
            throughput: [0.0; 4],
            distributing: false,
            dirty: true,
        }
    }

    /// Tile currently placed in the cell.
    #[must_use]
    pub fn tile(&self) -> &Arc<TileDefinition> {
        &self.tile
    }

    /// Rotation applied to the tile.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Volume currently occupying each port, indexed by [`Direction::index`].
    #[must_use]
    pub fn fill(&self) -> [f64; 4] {
        self.fill
    }

    /// Volume occupying the provided port.
    #[must_use]
    pub fn fill_at(&self, direction: Direction) -> f64 {
        self.fill[direction.index()]
    }

    /// Volume that entered through each port and stayed in the network.
    #[must_use]
    pub fn throughput(&self) -> [f64; 4] {
        self.throughput
    }

    /// Sum of the fill held by every port.
    #[must_use]
    pub fn total_fill(&self) -> f64 {
        self.fill.iter().sum()
    }

    /// Reports whether the cell holds no fluid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_fill() == 0.0
    }

    /// Maximum volume the cell holds.
    #[must_use]
    pub fn capacity(&self) -> f64 {
        self.tile.capacity
    }

    /// Reports whether the cell is mid-cascade.
    #[must_use]
    pub fn is_distributing(&self) -> bool {
        self.distributing
    }

    /// Reports whether the cell changed since the renderer last looked.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reports whether the absolute `direction` is an open port.
    #[must_use]
    pub fn connected(&self, direction: Direction) -> bool {
        self.tile.connected(self.orientation, direction)
    }

    /// Absolute directions of every open port.
    #[must_use]
    pub fn open_ports(&self) -> PortSet {
        self.tile.open_ports(self.orientation)
    }

    pub(crate) fn absorb(&mut self, direction: Direction, amount: f64) {
        if amount > 0.0 {
            self.fill[direction.index()] += amount;
            self.dirty = true;
        }
    }

    pub(crate) fn record_throughput(&mut self, direction: Direction, amount: f64) {
        self.throughput[direction.index()] += amount;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn replace_tile(&mut self, tile: Arc<TileDefinition>, orientation: Orientation) {
        self.tile = tile;
        self.orientation = orientation;
        self.dirty = true;
    }

    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}
