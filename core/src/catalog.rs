//! Immutable pipe segment definitions and weighted random selection.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Direction, Orientation, PortSet};

/// Shape, capacity and spawn weight of one kind of pipe segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    /// Identifier used by presentation layers.
    pub name: String,
    /// Ports open in the canonical, unrotated placement.
    pub connectivity: PortSet,
    /// Rotation steps the tile may be placed in.
    pub orientations: Vec<Orientation>,
    /// Maximum volume the segment holds before shedding to its open ports.
    pub capacity: f64,
    /// Relative weight used by [`TileCatalog::pick_random`].
    pub spawn_weight: f64,
}

impl TileDefinition {
    /// Creates a new tile definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        connectivity: &[Direction],
        orientations: &[Orientation],
        capacity: f64,
        spawn_weight: f64,
    ) -> Self {
        Self {
            name: name.into(),
            connectivity: PortSet::from_directions(connectivity),
            orientations: orientations.to_vec(),
            capacity,
            spawn_weight,
        }
    }

    /// Reports whether the absolute `direction` is open when placed with `orientation`.
    #[must_use]
    pub fn connected(&self, orientation: Orientation, direction: Direction) -> bool {
        self.connectivity.contains(direction.unrotated(orientation))
    }

    /// Absolute directions open when placed with `orientation`.
    #[must_use]
    pub fn open_ports(&self, orientation: Orientation) -> PortSet {
        self.connectivity.rotated(orientation)
    }

    /// Reports whether some allowed orientation opens `direction` alongside at
    /// least one other port.
    #[must_use]
    pub fn can_receive_through(&self, direction: Direction) -> bool {
        self.connectivity.len() > 1
            && self
                .orientations
                .iter()
                .any(|orientation| self.connected(*orientation, direction))
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.connectivity.is_empty() {
            return Err(CatalogError::EmptyConnectivity {
                name: self.name.clone(),
            });
        }
        if self.orientations.is_empty() {
            return Err(CatalogError::NoOrientations {
                name: self.name.clone(),
            });
        }
        if !self.capacity.is_finite() || self.capacity <= 0.0 {
            return Err(CatalogError::InvalidCapacity {
                name: self.name.clone(),
            });
        }
        if !self.spawn_weight.is_finite() || self.spawn_weight < 0.0 {
            return Err(CatalogError::InvalidWeight {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Configuration faults detected while assembling a catalog.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The catalog contains no tiles.
    #[error("tile catalog is empty")]
    Empty,
    /// Every tile carries a zero spawn weight.
    #[error("tile catalog has zero total spawn weight")]
    ZeroTotalWeight,
    /// The spawn weights sum to a value that is not finite.
    #[error("tile catalog spawn weights overflow to a non-finite total")]
    UnboundedTotalWeight,
    /// A tile carries a negative or non-finite spawn weight.
    #[error("tile `{name}` has an invalid spawn weight")]
    InvalidWeight {
        /// Name of the offending tile.
        name: String,
    },
    /// A tile carries a non-positive or non-finite capacity.
    #[error("tile `{name}` has an invalid capacity")]
    InvalidCapacity {
        /// Name of the offending tile.
        name: String,
    },
    /// A tile opens no ports at all.
    #[error("tile `{name}` has no open ports")]
    EmptyConnectivity {
        /// Name of the offending tile.
        name: String,
    },
    /// A tile allows no orientation.
    #[error("tile `{name}` allows no orientation")]
    NoOrientations {
        /// Name of the offending tile.
        name: String,
    },
}

/// Validated, immutable set of tile definitions fixed at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TileDefinition>", into = "Vec<TileDefinition>")]
pub struct TileCatalog {
    tiles: Vec<Arc<TileDefinition>>,
    total_weight: f64,
}

impl TileCatalog {
    /// Validates the provided definitions and assembles a catalog.
    pub fn new(tiles: Vec<TileDefinition>) -> Result<Self, CatalogError> {
        if tiles.is_empty() {
            return Err(CatalogError::Empty);
        }
        for tile in &tiles {
            tile.validate()?;
        }
        let total_weight: f64 = tiles.iter().map(|tile| tile.spawn_weight).sum();
        if !total_weight.is_finite() {
            return Err(CatalogError::UnboundedTotalWeight);
        }
        if total_weight <= 0.0 {
            return Err(CatalogError::ZeroTotalWeight);
        }
        Ok(Self {
            tiles: tiles.into_iter().map(Arc::new).collect(),
            total_weight,
        })
    }

    /// Five-piece set of straight, corner, tee, end and cross segments.
    #[must_use]
    pub fn standard() -> Self {
        use Direction::{Bottom, Left, Right, Top};

        let all = [0, 1, 2, 3].map(Orientation);
        let tiles = vec![
            TileDefinition::new("straight", &[Top, Bottom], &all[..2], 128.0, 1.0),
            TileDefinition::new("corner", &[Top, Left], &all, 128.0, 2.0),
            TileDefinition::new("tee", &[Top, Left, Right], &all, 128.0, 0.25),
            TileDefinition::new("end", &[Top], &all, 128.0, 0.25),
            TileDefinition::new("cross", &[Top, Left, Bottom, Right], &all[..1], 128.0, 0.05),
        ];
        let total_weight = tiles.iter().map(|tile| tile.spawn_weight).sum();
        Self {
            tiles: tiles.into_iter().map(Arc::new).collect(),
            total_weight,
        }
    }

    /// Tiles contained in the catalog in declaration order.
    #[must_use]
    pub fn tiles(&self) -> &[Arc<TileDefinition>] {
        &self.tiles
    }

    /// Looks up a tile by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<TileDefinition>> {
        self.tiles.iter().find(|tile| tile.name == name)
    }

    /// Sum of every tile's spawn weight.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Maps a draw in `[0, total_weight)` onto a tile by cumulative weight.
    ///
    /// Draws at or beyond the total resolve to the last tile with a positive
    /// weight so that rounding never yields a zero-weight tile.
    #[must_use]
    pub fn select(&self, draw: f64) -> &Arc<TileDefinition> {
        let mut remaining = draw;
        let mut fallback = &self.tiles[0];
        for tile in &self.tiles {
            if tile.spawn_weight <= 0.0 {
                continue;
            }
            if remaining < tile.spawn_weight {
                return tile;
            }
            remaining -= tile.spawn_weight;
            fallback = tile;
        }
        fallback
    }

    /// Picks a tile with probability proportional to its spawn weight.
    pub fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Arc<TileDefinition> {
        let draw = rng.gen_range(0.0..self.total_weight);
        Arc::clone(self.select(draw))
    }
}

impl TryFrom<Vec<TileDefinition>> for TileCatalog {
    type Error = CatalogError;

    fn try_from(tiles: Vec<TileDefinition>) -> Result<Self, Self::Error> {
        Self::new(tiles)
    }
}

impl From<TileCatalog> for Vec<TileDefinition> {
    fn from(catalog: TileCatalog) -> Self {
        catalog.tiles.into_iter().map(Arc::unwrap_or_clone).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn weighted(name: &str, weight: f64) -> TileDefinition {
        TileDefinition::new(name, &[Direction::Top], &[Orientation::IDENTITY], 10.0, weight)
    }

    #[test]
    fn select_follows_cumulative_weights() {
        let catalog =
            TileCatalog::new(vec![weighted("a", 1.0), weighted("b", 2.0), weighted("c", 1.0)])
                .expect("valid catalog");

        assert_eq!(catalog.select(0.0).name, "a");
        assert_eq!(catalog.select(0.999).name, "a");
        assert_eq!(catalog.select(1.0).name, "b");
        assert_eq!(catalog.select(2.5).name, "b");
        assert_eq!(catalog.select(3.5).name, "c");
        assert_eq!(catalog.select(4.0).name, "c", "overshoot resolves to last tile");
    }

    #[test]
    fn zero_weight_tiles_are_never_selected() {
        let catalog = TileCatalog::new(vec![
            weighted("a", 1.0),
            weighted("never", 0.0),
            weighted("b", 1.0),
        ])
        .expect("valid catalog");

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            assert_ne!(catalog.pick_random(&mut rng).name, "never");
        }
        assert_eq!(catalog.select(1.0).name, "b");
        assert_eq!(catalog.select(5.0).name, "b");
    }

    #[test]
    fn pick_random_is_deterministic_for_a_seed() {
        let catalog = TileCatalog::standard();
        let mut first = ChaCha8Rng::seed_from_u64(0x5eed);
        let mut second = ChaCha8Rng::seed_from_u64(0x5eed);

        let a: Vec<String> = (0..32).map(|_| catalog.pick_random(&mut first).name.clone()).collect();
        let b: Vec<String> = (0..32).map(|_| catalog.pick_random(&mut second).name.clone()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn configuration_faults_are_rejected() {
        assert_eq!(TileCatalog::new(Vec::new()), Err(CatalogError::Empty));
        assert_eq!(
            TileCatalog::new(vec![weighted("a", 0.0)]),
            Err(CatalogError::ZeroTotalWeight)
        );
        assert_eq!(
            TileCatalog::new(vec![weighted("a", -1.0)]),
            Err(CatalogError::InvalidWeight { name: "a".into() })
        );

        let mut closed = weighted("closed", 1.0);
        closed.connectivity = PortSet::EMPTY;
        assert_eq!(
            TileCatalog::new(vec![closed]),
            Err(CatalogError::EmptyConnectivity {
                name: "closed".into()
            })
        );

        let mut fixed = weighted("fixed", 1.0);
        fixed.orientations.clear();
        assert_eq!(
            TileCatalog::new(vec![fixed]),
            Err(CatalogError::NoOrientations {
                name: "fixed".into()
            })
        );

        let mut hollow = weighted("hollow", 1.0);
        hollow.capacity = 0.0;
        assert_eq!(
            TileCatalog::new(vec![hollow]),
            Err(CatalogError::InvalidCapacity {
                name: "hollow".into()
            })
        );
    }

    #[test]
    fn overflowing_weight_total_is_rejected() {
        let tiles = vec![weighted("a", 1e308), weighted("b", 1e308)];

        assert_eq!(
            TileCatalog::new(tiles),
            Err(CatalogError::UnboundedTotalWeight)
        );
    }

    #[test]
    fn standard_catalog_passes_validation() {
        let standard = TileCatalog::standard();
        let rebuilt = TileCatalog::new(Vec::from(standard.clone())).expect("valid catalog");
        assert_eq!(rebuilt, standard);
        assert!((standard.total_weight() - 3.55).abs() < 1e-9);
    }

    #[test]
    fn catalog_survives_bincode_and_revalidates() {
        let bytes = bincode::serialize(&TileCatalog::standard()).expect("serialize");
        let restored: TileCatalog = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, TileCatalog::standard());

        let invalid = bincode::serialize(&vec![weighted("a", 0.0)]).expect("serialize");
        assert!(bincode::deserialize::<TileCatalog>(&invalid).is_err());
    }

    #[test]
    fn only_multi_port_tiles_can_serve_as_entries() {
        let standard = TileCatalog::standard();
        let straight = standard.get("straight").expect("straight");
        let end = standard.get("end").expect("end");
        assert!(straight.can_receive_through(Direction::Top));
        assert!(!end.can_receive_through(Direction::Top));
    }
}
