use std::collections::HashMap;

use endless_pipes_core::{Direction, Orientation, TileDefinition};

/// Character drawn for the pipe body and every open port.
pub const PIPE: char = '#';

/// Character drawn for closed ports and glyph corners.
pub const BLANK: char = ' ';

/// Three by three character block depicting a rotated tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Glyph {
    rows: [[char; 3]; 3],
}

impl Glyph {
    /// Characters of the glyph, top row first.
    #[must_use]
    pub const fn rows(&self) -> &[[char; 3]; 3] {
        &self.rows
    }

    /// Single row of the glyph as a string.
    #[must_use]
    pub fn line(&self, row: usize) -> String {
        self.rows[row].iter().collect()
    }

    /// Copy of the glyph with its centre replaced by `marker`.
    #[must_use]
    pub fn with_centre(mut self, marker: char) -> Self {
        self.rows[1][1] = marker;
        self
    }
}

impl std::fmt::Display for Glyph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, row) in self.rows.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            for character in row {
                write!(f, "{character}")?;
            }
        }
        Ok(())
    }
}

/// Draws `tile` rotated by `orientation`, marking each open port on the
/// midpoint of the matching edge.
#[must_use]
pub fn glyph(tile: &TileDefinition, orientation: Orientation) -> Glyph {
    let mut rows = [[BLANK; 3]; 3];
    rows[1][1] = PIPE;
    for direction in tile.open_ports(orientation).iter() {
        let (row, column) = edge_midpoint(direction);
        rows[row][column] = PIPE;
    }
    Glyph { rows }
}

const fn edge_midpoint(direction: Direction) -> (usize, usize) {
    match direction {
        Direction::Top => (0, 1),
        Direction::Left => (1, 0),
        Direction::Bottom => (2, 1),
        Direction::Right => (1, 2),
    }
}

/// Glyphs memoised per tile name and orientation.
#[derive(Clone, Debug, Default)]
pub struct GlyphCache {
    glyphs: HashMap<(String, Orientation), Glyph>,
    hits: u64,
    misses: u64,
}

impl GlyphCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the glyph for `tile` in `orientation`, drawing it on first use.
    pub fn get(&mut self, tile: &TileDefinition, orientation: Orientation) -> Glyph {
        let key = (tile.name.clone(), orientation);
        if let Some(glyph) = self.glyphs.get(&key) {
            self.hits += 1;
            return *glyph;
        }
        self.misses += 1;
        let drawn = glyph(tile, orientation);
        let _ = self.glyphs.insert(key, drawn);
        drawn
    }

    /// Number of lookups served from the cache.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of lookups that had to draw a glyph.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Number of distinct glyphs held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Reports whether nothing has been drawn yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}
