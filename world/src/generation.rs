//! Seeded generation of fresh rows and entry tiles.

use std::sync::Arc;

use endless_pipes_core::{Direction, Orientation, TileCatalog, TileDefinition};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::cell::Cell;

/// Seeded source of freshly rolled tiles.
#[derive(Clone, Debug)]
pub(crate) struct RowGenerator {
    catalog: TileCatalog,
    rng: ChaCha8Rng,
}

impl RowGenerator {
    pub(crate) fn new(catalog: TileCatalog, seed: u64) -> Self {
        Self {
            catalog,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub(crate) fn catalog(&self) -> &TileCatalog {
        &self.catalog
    }

    /// Picks a weighted tile and a uniformly chosen allowed orientation.
    pub(crate) fn roll(&mut self) -> (Arc<TileDefinition>, Orientation) {
        let tile = self.catalog.pick_random(&mut self.rng);
        let index = self.rng.gen_range(0..tile.orientations.len());
        let orientation = tile.orientations[index];
        (tile, orientation)
    }

    pub(crate) fn row(&mut self, columns: u32) -> Vec<Cell> {
        (0..columns)
            .map(|_| {
                let (tile, orientation) = self.roll();
                Cell::new(tile, orientation)
            })
            .collect()
    }

    /// Re-rolls `cell` until it receives through `direction` and opens at
    /// least one further port.
    ///
    /// Terminates only when the catalog holds a spawnable tile that qualifies,
    /// which level configuration checks up front.
    pub(crate) fn reroll_entry(&mut self, cell: &mut Cell, direction: Direction) {
        while !is_valid_entry(cell, direction) {
            let (tile, orientation) = self.roll();
            cell.replace_tile(tile, orientation);
        }
    }
}

pub(crate) fn is_valid_entry(cell: &Cell, direction: Direction) -> bool {
    cell.connected(direction) && cell.open_ports().len() > 1
}
