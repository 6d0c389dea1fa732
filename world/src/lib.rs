#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative level state for Endless Pipes.
//!
//! The [`Level`] owns every live cell of a procedurally growing pipe grid. Each
//! tick it pours fluid into the entry cell, lets the overflow cascade through
//! connected neighbours, scrolls the view and appends fresh rows ahead of the
//! frontier. Any fluid that escapes the network ends the session for good.

mod cell;
mod config;
mod flow;
mod generation;
mod grid;

use endless_pipes_core::{
    CellCoord, Command, Direction, Event, FailureCause, InteractionError, TileCatalog,
    TileDefinition,
};
use log::{debug, info, trace};

pub use cell::Cell;
pub use config::{ConfigError, LevelConfig};
pub use flow::{flow, FlowReport, PipeNetwork};
pub use grid::Grid;

use generation::{is_valid_entry, RowGenerator};

/// Port through which the entry cell receives fluid.
pub const ENTRY_PORT: Direction = Direction::Top;

/// Lifecycle of a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LevelState {
    /// The level accepts ticks and interactions.
    Running,
    /// Fluid escaped; the level no longer changes.
    Failed,
}

/// Running totals of where the injected fluid went.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VolumeLedger {
    /// Volume poured into the entry since the session started.
    pub injected: f64,
    /// Volume held by live cells.
    pub stored: f64,
    /// Volume held by cells at the moment their rows were retired.
    pub retired: f64,
    /// Volume the network failed to absorb.
    pub spilled: f64,
}

/// Represents one continuous play session.
#[derive(Debug)]
pub struct Level {
    config: LevelConfig,
    grid: Grid,
    generator: RowGenerator,
    entry: CellCoord,
    selected: Option<CellCoord>,
    failure: Option<FailureCause>,
    elapsed: f64,
    inflow_rate: f64,
    scroll_rate: f64,
    scroll_offset: f64,
    scroll_since_growth: f64,
    injected: f64,
    retired: f64,
    spilled: f64,
}

impl Level {
    /// Generates a fresh level from the catalog.
    ///
    /// The initial grid holds the visible rows plus one batch ahead, and the
    /// entry cell is re-rolled until it receives fluid from above and opens at
    /// least one other port.
    pub fn new(catalog: TileCatalog, config: LevelConfig) -> Result<Self, ConfigError> {
        config.validate(&catalog)?;
        let mut generator = RowGenerator::new(catalog, config.seed);
        let mut grid = Grid::new(config.columns);
        for _ in 0..config.viewport_rows.saturating_mul(2) {
            grid.push_row(generator.row(config.columns));
        }
        let entry = CellCoord::new(config.entry_column, grid.first_row());
        if let Some(cell) = grid.cell_mut(entry) {
            generator.reroll_entry(cell, ENTRY_PORT);
        }
        Ok(Self::assemble(config, grid, generator, entry))
    }

    /// Validates raw tile definitions and generates a fresh level from them.
    pub fn with_tiles(tiles: Vec<TileDefinition>, config: LevelConfig) -> Result<Self, ConfigError> {
        Self::new(TileCatalog::new(tiles)?, config)
    }

    /// Builds a level around hand-authored rows starting at row zero.
    ///
    /// The layout is taken as is: the entry cell is not re-rolled. Rows
    /// appended later are still drawn from the catalog.
    pub fn from_rows(
        catalog: TileCatalog,
        config: LevelConfig,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self, ConfigError> {
        config.validate(&catalog)?;
        if rows.is_empty() {
            return Err(ConfigError::EmptyLayout);
        }
        let grid = Grid::from_rows(config.columns, 0, rows)?;
        let generator = RowGenerator::new(catalog, config.seed);
        let entry = CellCoord::new(config.entry_column, grid.first_row());
        Ok(Self::assemble(config, grid, generator, entry))
    }

    fn assemble(config: LevelConfig, grid: Grid, generator: RowGenerator, entry: CellCoord) -> Self {
        Self {
            inflow_rate: config.inflow_rate,
            scroll_rate: config.scroll_rate,
            config,
            grid,
            generator,
            entry,
            selected: None,
            failure: None,
            elapsed: 0.0,
            scroll_offset: 0.0,
            scroll_since_growth: 0.0,
            injected: 0.0,
            retired: 0.0,
            spilled: 0.0,
        }
    }

    /// Advances the simulation by `dt` seconds. Does nothing once failed.
    pub fn update(&mut self, dt: f64) {
        let mut events = Vec::new();
        self.advance(dt, &mut events);
    }

    /// Reports whether fluid has escaped the network.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LevelState {
        if self.failed() {
            LevelState::Failed
        } else {
            LevelState::Running
        }
    }

    /// Leak that ended the session, if any.
    #[must_use]
    pub fn failure(&self) -> Option<FailureCause> {
        self.failure
    }

    /// Handles a click on `cell`.
    ///
    /// Selects an empty cell when nothing is selected, clears the selection
    /// when the selected cell is clicked again, and otherwise swaps the
    /// selection with `cell`. Filled or missing cells are ignored.
    pub fn click_select(&mut self, cell: CellCoord) {
        let mut events = Vec::new();
        self.select(cell, &mut events);
    }

    /// Swaps the selected cell with `cell` when both are empty.
    pub fn swap_selected(&mut self, cell: CellCoord) {
        let mut events = Vec::new();
        self.swap_with_selection(cell, &mut events);
    }

    /// Exchanges the tiles of two empty cells.
    ///
    /// Returns `false` without touching either cell when one of them holds
    /// fluid, is not live, or the level has failed.
    pub fn swap(&mut self, first: CellCoord, second: CellCoord) -> bool {
        !self.failed() && self.try_swap(first, second).is_ok()
    }

    /// Returns the coordinates of cells changed since the previous call and
    /// marks them clean.
    pub fn take_dirty(&mut self) -> Vec<CellCoord> {
        self.grid
            .iter_mut()
            .filter_map(|(coord, cell)| cell.take_dirty().then_some(coord))
            .collect()
    }

    /// Read-only access to the live cells.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Cell currently receiving fluid.
    #[must_use]
    pub fn entry(&self) -> CellCoord {
        self.entry
    }

    /// Cell holding the selection marker, if any.
    #[must_use]
    pub fn selected(&self) -> Option<CellCoord> {
        self.selected
    }

    /// Seconds simulated so far.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Distance, in rows, the view has scrolled since the session started.
    #[must_use]
    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Volume currently poured into the entry per second.
    #[must_use]
    pub fn inflow_rate(&self) -> f64 {
        self.inflow_rate
    }

    /// Configuration the level was built with.
    #[must_use]
    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    fn advance(&mut self, dt: f64, out: &mut Vec<Event>) {
        if self.failed() {
            return;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.elapsed += dt;

        let acceleration = self.config.inflow_acceleration;
        let volume = self.inflow_rate * dt + 0.5 * acceleration * dt * dt;
        self.inflow_rate += acceleration * dt;

        let mut report = FlowReport::new();
        let remainder = flow(&mut self.grid, self.entry, ENTRY_PORT, volume, &mut report);
        self.injected += volume;
        self.spilled += remainder;
        out.push(Event::FluidInjected {
            cell: self.entry,
            volume,
        });
        self.release_wet_selection(out);

        if let Some(cause) = report.leak() {
            self.fail(cause, out);
            return;
        }
        if remainder > 0.0 {
            self.fail(FailureCause::Unabsorbed { remainder }, out);
            return;
        }

        self.scroll(dt, out);
    }

    fn fail(&mut self, cause: FailureCause, out: &mut Vec<Event>) {
        info!("level failed after {:.1}s: {cause:?}", self.elapsed);
        self.failure = Some(cause);
        out.push(Event::LevelFailed { cause });
    }

    fn release_wet_selection(&mut self, out: &mut Vec<Event>) {
        let Some(selected) = self.selected else {
            return;
        };
        let wet = self.grid.cell(selected).map_or(true, |cell| !cell.is_empty());
        if wet {
            self.selected = None;
            out.push(Event::SelectionCleared { cell: selected });
        }
    }

    fn scroll(&mut self, dt: f64, out: &mut Vec<Event>) {
        let acceleration = self.config.scroll_acceleration;
        let distance = self.scroll_rate * dt + 0.5 * acceleration * dt * dt;
        self.scroll_rate += acceleration * dt;
        self.scroll_offset += distance;
        self.scroll_since_growth += distance;

        let batch = f64::from(self.config.viewport_rows);
        while self.scroll_since_growth >= batch {
            self.scroll_since_growth -= batch;
            self.grow(out);
        }
    }

    fn grow(&mut self, out: &mut Vec<Event>) {
        let first_new = self.grid.end_row();
        let count = self.config.viewport_rows;
        for _ in 0..count {
            self.grid.push_row(self.generator.row(self.config.columns));
        }
        debug!("appended rows {first_new}..{}", first_new + count);
        out.push(Event::RowsAppended {
            first_row: first_new,
            count,
        });

        let view_top = self.scroll_offset.floor() as u32;
        let first_retired = self.grid.first_row();
        let mut retired_rows = 0;
        let mut volume = 0.0;
        while self.grid.first_row() < view_top && self.grid.row_count() > 1 {
            let Some(row) = self.grid.retire_front_row() else {
                break;
            };
            volume += row.iter().map(Cell::total_fill).sum::<f64>();
            retired_rows += 1;
        }
        if retired_rows == 0 {
            return;
        }

        self.retired += volume;
        debug!("retired {retired_rows} rows from {first_retired} holding {volume:.2}");
        out.push(Event::RowsRetired {
            first_row: first_retired,
            count: retired_rows,
            volume,
        });

        if let Some(selected) = self.selected {
            if selected.row() < self.grid.first_row() {
                self.selected = None;
                out.push(Event::SelectionCleared { cell: selected });
            }
        }
        self.move_entry(out);
    }

    fn move_entry(&mut self, out: &mut Vec<Event>) {
        let entry = CellCoord::new(self.config.entry_column, self.grid.first_row());
        if entry == self.entry {
            return;
        }
        self.entry = entry;
        if let Some(cell) = self.grid.cell_mut(entry) {
            if cell.is_empty() && !is_valid_entry(cell, ENTRY_PORT) {
                self.generator.reroll_entry(cell, ENTRY_PORT);
                // the selected tile is gone
                if self.selected == Some(entry) {
                    self.selected = None;
                    out.push(Event::SelectionCleared { cell: entry });
                }
            }
        }
        debug!("entry moved to {entry:?}");
        out.push(Event::EntryMoved { cell: entry });
    }

    fn select(&mut self, cell: CellCoord, out: &mut Vec<Event>) {
        if self.failed() {
            return;
        }
        match self.selected {
            Some(selected) if selected == cell => {
                self.selected = None;
                out.push(Event::SelectionCleared { cell });
            }
            Some(_) => self.swap_with_selection(cell, out),
            None => match self.grid.cell(cell) {
                None => out.push(Event::SelectionRejected {
                    cell,
                    reason: InteractionError::MissingCell,
                }),
                Some(target) if !target.is_empty() => out.push(Event::SelectionRejected {
                    cell,
                    reason: InteractionError::Filled,
                }),
                Some(_) => {
                    self.selected = Some(cell);
                    out.push(Event::CellSelected { cell });
                }
            },
        }
    }

    fn swap_with_selection(&mut self, cell: CellCoord, out: &mut Vec<Event>) {
        if self.failed() {
            return;
        }
        let Some(selected) = self.selected else {
            out.push(Event::SelectionRejected {
                cell,
                reason: InteractionError::NothingSelected,
            });
            return;
        };
        if selected == cell {
            self.selected = None;
            out.push(Event::SelectionCleared { cell });
            return;
        }

        match self.try_swap(selected, cell) {
            Ok(()) => {
                self.selected = None;
                out.push(Event::CellsSwapped {
                    first: selected,
                    second: cell,
                });
                out.push(Event::SelectionCleared { cell: selected });
            }
            Err(reason) => out.push(Event::SwapRejected {
                first: selected,
                second: cell,
                reason,
            }),
        }
    }

    fn try_swap(&mut self, first: CellCoord, second: CellCoord) -> Result<(), InteractionError> {
        let a = self.grid.cell(first).ok_or(InteractionError::MissingCell)?;
        let b = self.grid.cell(second).ok_or(InteractionError::MissingCell)?;
        if !a.is_empty() || !b.is_empty() {
            return Err(InteractionError::Filled);
        }
        if first != second {
            let swapped = self.grid.swap_cells(first, second);
            debug_assert!(swapped, "both cells were looked up above");
        }
        trace!("swapped {first:?} with {second:?}");
        Ok(())
    }
}

/// Applies the provided command to the level, mutating state deterministically.
///
/// Commands issued after the level failed are ignored and report nothing.
pub fn apply(level: &mut Level, command: Command, out_events: &mut Vec<Event>) {
    if level.failed() {
        return;
    }
    match command {
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            level.advance(dt.as_secs_f64(), out_events);
        }
        Command::SelectCell { cell } => level.select(cell, out_events),
        Command::SwapSelected { cell } => level.swap_with_selection(cell, out_events),
    }
}

/// Query functions that provide read-only access to the level state.
pub mod query {
    use std::ops::Range;

    use endless_pipes_core::{CellCoord, Direction, Orientation, TileCatalog, TileDefinition};

    use super::{Level, VolumeLedger};

    /// Read-only snapshot of one cell for presentation purposes.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct CellView<'a> {
        /// Location of the cell.
        pub coord: CellCoord,
        /// Tile placed in the cell.
        pub tile: &'a TileDefinition,
        /// Rotation applied to the tile.
        pub orientation: Orientation,
        /// Volume occupying each port.
        pub fill: [f64; 4],
        /// Volume that entered through each port and stayed in the network.
        pub throughput: [f64; 4],
        /// Whether fluid is injected into this cell.
        pub entry: bool,
        /// Whether the cell holds the selection marker.
        pub selected: bool,
    }

    impl CellView<'_> {
        /// Sum of the fill held by every port.
        #[must_use]
        pub fn total_fill(&self) -> f64 {
            self.fill.iter().sum()
        }

        /// Fraction of the capacity in use, in `0.0..=1.0`.
        #[must_use]
        pub fn fill_ratio(&self) -> f64 {
            (self.total_fill() / self.tile.capacity).clamp(0.0, 1.0)
        }

        /// Reports whether the absolute `direction` is an open port.
        #[must_use]
        pub fn connected(&self, direction: Direction) -> bool {
            self.tile.connected(self.orientation, direction)
        }
    }

    /// Catalog the level draws new rows from.
    #[must_use]
    pub fn catalog(level: &Level) -> &TileCatalog {
        level.generator.catalog()
    }

    /// Snapshot of the cell at `coord`, if it is live.
    #[must_use]
    pub fn cell(level: &Level, coord: CellCoord) -> Option<CellView<'_>> {
        level.grid.cell(coord).map(|cell| CellView {
            coord,
            tile: cell.tile(),
            orientation: cell.orientation(),
            fill: cell.fill(),
            throughput: cell.throughput(),
            entry: coord == level.entry,
            selected: Some(coord) == level.selected,
        })
    }

    /// Absolute rows currently inside the viewport.
    #[must_use]
    pub fn visible_rows(level: &Level) -> Range<u32> {
        let first = level.grid.first_row();
        let end = level.grid.end_row();
        let top = (level.scroll_offset.floor() as u32).clamp(first, end);
        top..top.saturating_add(level.config.viewport_rows).min(end)
    }

    /// Snapshots of every cell inside the viewport in row-major order.
    pub fn visible_cells(level: &Level) -> impl Iterator<Item = CellView<'_>> {
        let rows = visible_rows(level);
        let columns = level.grid.columns();
        rows.flat_map(move |row| (0..columns).map(move |column| CellCoord::new(column, row)))
            .filter_map(move |coord| cell(level, coord))
    }

    /// Where every unit of injected fluid ended up.
    #[must_use]
    pub fn ledger(level: &Level) -> VolumeLedger {
        VolumeLedger {
            injected: level.injected,
            stored: level.grid.iter().map(|(_, cell)| cell.total_fill()).sum(),
            retired: level.retired,
            spilled: level.spilled,
        }
    }
}
