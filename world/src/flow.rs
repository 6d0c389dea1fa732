//! Recursive overflow cascade through the pipe network.
//!
//! A cell absorbs incoming fluid until it reaches capacity and sheds the excess
//! evenly across its open ports that are still dry. Neighbours that cannot take
//! their share hand the shortfall back, and the next round spreads it over the
//! neighbours that did take theirs. Fluid is only ever stored in a cell or
//! returned to the caller as an unabsorbed remainder.

use endless_pipes_core::{CellCoord, Direction, FailureCause};

use crate::cell::Cell;

/// Coordinate-based access to the cells of a pipe network.
///
/// The cascade never holds on to a cell across a recursive call; it looks
/// cells up again by coordinate, which keeps cyclic pipe layouts free of
/// aliasing.
pub trait PipeNetwork {
    /// Returns mutable access to the cell at the provided coordinate.
    fn cell_mut(&mut self, at: CellCoord) -> Option<&mut Cell>;

    /// Resolves the neighbour reached through `direction` and the port through
    /// which it receives fluid, or `None` when the port faces the edge.
    fn get_from(&self, at: CellCoord, direction: Direction) -> Option<(Direction, CellCoord)>;
}

/// Leaks observed while a cascade ran.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlowReport {
    leak: Option<FailureCause>,
}

impl FlowReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First leak recorded during the cascade, if any.
    #[must_use]
    pub fn leak(&self) -> Option<FailureCause> {
        self.leak
    }

    fn record(&mut self, cause: FailureCause) {
        if self.leak.is_none() {
            self.leak = Some(cause);
        }
    }
}

/// Pours `amount` into the cell at `at` through its `source` port.
///
/// Returns the volume that neither the cell nor anything downstream could
/// absorb. Fluid pushed into a closed port, or shed through a port facing the
/// edge of the network, is recorded as a leak in `report`.
pub fn flow<N>(
    network: &mut N,
    at: CellCoord,
    source: Direction,
    amount: f64,
    report: &mut FlowReport,
) -> f64
where
    N: PipeNetwork + ?Sized,
{
    let Some(cell) = network.cell_mut(at) else {
        report.record(FailureCause::Boundary {
            cell: at,
            direction: source,
        });
        return amount;
    };

    if !cell.connected(source) {
        if amount > 0.0 {
            report.record(FailureCause::ClosedPort {
                cell: at,
                direction: source,
            });
        }
        return amount;
    }
    if cell.distributing {
        return amount;
    }

    let held = cell.total_fill();
    let capacity = cell.capacity();
    if held + amount <= capacity {
        cell.absorb(source, amount);
        cell.record_throughput(source, amount);
        return 0.0;
    }

    let mut outgoing: Vec<Direction> = cell
        .open_ports()
        .iter()
        .filter(|port| *port != source && cell.fill_at(*port) == 0.0)
        .collect();
    cell.distributing = true;
    cell.absorb(source, capacity - held);
    let mut overflow = held + amount - capacity;

    while overflow > 0.0 && !outgoing.is_empty() {
        let share = overflow / outgoing.len() as f64;
        let mut unabsorbed = 0.0;
        let mut viable = Vec::with_capacity(outgoing.len());

        for port in outgoing {
            let Some((entry, neighbor)) = network.get_from(at, port) else {
                report.record(FailureCause::Boundary {
                    cell: at,
                    direction: port,
                });
                unabsorbed += share;
                continue;
            };

            let remainder = flow(network, neighbor, entry, share, report);
            if remainder > 0.0 {
                unabsorbed += remainder;
            } else {
                viable.push(port);
            }
        }

        overflow = unabsorbed;
        outgoing = viable;
    }

    if let Some(cell) = network.cell_mut(at) {
        cell.distributing = false;
        cell.record_throughput(source, amount - overflow);
    }
    overflow
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use endless_pipes_core::{Orientation, TileDefinition};

    use super::*;
    use crate::grid::Grid;

    const EPSILON: f64 = 1e-9;

    fn tile(name: &str, ports: &[Direction], capacity: f64) -> Arc<TileDefinition> {
        Arc::new(TileDefinition::new(
            name,
            ports,
            &[Orientation::IDENTITY],
            capacity,
            1.0,
        ))
    }

    fn cell(tile: &Arc<TileDefinition>, step: u8) -> Cell {
        Cell::new(Arc::clone(tile), Orientation::new(step).expect("valid step"))
    }

    fn stored(grid: &Grid) -> f64 {
        grid.iter().map(|(_, cell)| cell.total_fill()).sum()
    }

    #[test]
    fn capacity_boundary_absorbs_exactly() {
        let end = tile("end", &[Direction::Top], 100.0);
        let mut grid = Grid::from_rows(1, 0, vec![vec![cell(&end, 0)]]).expect("valid rows");
        let mut report = FlowReport::new();

        let remainder = flow(&mut grid, CellCoord::new(0, 0), Direction::Top, 100.0, &mut report);

        assert_eq!(remainder, 0.0);
        assert!(report.leak().is_none());
        let entry = grid.cell(CellCoord::new(0, 0)).expect("cell");
        assert_eq!(entry.fill_at(Direction::Top), 100.0);
        assert_eq!(entry.throughput()[Direction::Top.index()], 100.0);
    }

    #[test]
    fn disconnected_injection_returns_everything() {
        let straight = tile("straight", &[Direction::Top, Direction::Bottom], 100.0);
        let mut grid = Grid::from_rows(1, 0, vec![vec![cell(&straight, 0)]]).expect("valid rows");
        let mut report = FlowReport::new();

        let remainder = flow(&mut grid, CellCoord::new(0, 0), Direction::Left, 12.5, &mut report);

        assert_eq!(remainder, 12.5);
        assert_eq!(
            report.leak(),
            Some(FailureCause::ClosedPort {
                cell: CellCoord::new(0, 0),
                direction: Direction::Left,
            })
        );
        assert!(grid.cell(CellCoord::new(0, 0)).expect("cell").is_empty());
    }

    #[test]
    fn boundary_leak_returns_exact_excess() {
        let straight = tile("straight", &[Direction::Top, Direction::Bottom], 100.0);
        let mut grid = Grid::from_rows(1, 0, vec![vec![cell(&straight, 0)]]).expect("valid rows");
        let mut report = FlowReport::new();

        let remainder = flow(&mut grid, CellCoord::new(0, 0), Direction::Top, 130.0, &mut report);

        assert!((remainder - 30.0).abs() < EPSILON);
        assert_eq!(
            report.leak(),
            Some(FailureCause::Boundary {
                cell: CellCoord::new(0, 0),
                direction: Direction::Bottom,
            })
        );
        let entry = grid.cell(CellCoord::new(0, 0)).expect("cell");
        assert_eq!(entry.total_fill(), 100.0);
        assert!(!entry.is_distributing());
    }

    #[test]
    fn overflow_fans_out_evenly() {
        let tee = tile("tee", &[Direction::Top, Direction::Left, Direction::Right], 100.0);
        let end = tile("end", &[Direction::Top], 100.0);
        let mut grid = Grid::from_rows(
            3,
            0,
            vec![vec![cell(&end, 3), cell(&tee, 0), cell(&end, 1)]],
        )
        .expect("valid rows");
        let centre = CellCoord::new(1, 0);
        let mut report = FlowReport::new();

        assert_eq!(flow(&mut grid, centre, Direction::Top, 90.0, &mut report), 0.0);
        let remainder = flow(&mut grid, centre, Direction::Top, 20.0, &mut report);

        assert_eq!(remainder, 0.0);
        assert!(report.leak().is_none());
        let tee_cell = grid.cell(centre).expect("tee");
        assert!((tee_cell.fill_at(Direction::Top) - 100.0).abs() < EPSILON);
        let left = grid.cell(CellCoord::new(0, 0)).expect("left");
        let right = grid.cell(CellCoord::new(2, 0)).expect("right");
        assert!((left.fill_at(Direction::Right) - 5.0).abs() < EPSILON);
        assert!((right.fill_at(Direction::Left) - 5.0).abs() < EPSILON);
    }

    #[test]
    fn shortfall_moves_to_neighbours_that_took_their_share() {
        let tee = tile("tee", &[Direction::Top, Direction::Left, Direction::Right], 100.0);
        let small = tile("small", &[Direction::Top], 2.0);
        let end = tile("end", &[Direction::Top], 100.0);
        let mut grid = Grid::from_rows(
            3,
            0,
            vec![vec![cell(&small, 3), cell(&tee, 0), cell(&end, 1)]],
        )
        .expect("valid rows");
        let mut report = FlowReport::new();

        let remainder = flow(&mut grid, CellCoord::new(1, 0), Direction::Top, 120.0, &mut report);

        assert_eq!(remainder, 0.0);
        assert!(report.leak().is_none());
        let left = grid.cell(CellCoord::new(0, 0)).expect("left");
        let right = grid.cell(CellCoord::new(2, 0)).expect("right");
        assert!((left.total_fill() - 2.0).abs() < EPSILON);
        assert!((right.total_fill() - 18.0).abs() < EPSILON);
    }

    #[test]
    fn partially_filled_ports_are_not_offered() {
        let tee = tile("tee", &[Direction::Top, Direction::Left, Direction::Right], 100.0);
        let end = tile("end", &[Direction::Top], 100.0);
        let mut grid = Grid::from_rows(
            3,
            0,
            vec![vec![cell(&end, 3), cell(&tee, 0), cell(&end, 1)]],
        )
        .expect("valid rows");
        let centre = CellCoord::new(1, 0);
        let mut report = FlowReport::new();

        assert_eq!(flow(&mut grid, centre, Direction::Left, 50.0, &mut report), 0.0);
        let remainder = flow(&mut grid, centre, Direction::Top, 60.0, &mut report);

        assert_eq!(remainder, 0.0);
        let left = grid.cell(CellCoord::new(0, 0)).expect("left");
        let right = grid.cell(CellCoord::new(2, 0)).expect("right");
        assert!(left.is_empty(), "wet port must not receive overflow");
        assert!((right.fill_at(Direction::Left) - 10.0).abs() < EPSILON);
    }

    #[test]
    fn closed_loop_terminates_with_correct_remainder() {
        let corner = tile("corner", &[Direction::Top, Direction::Left], 100.0);
        let mut grid = Grid::from_rows(
            2,
            0,
            vec![
                vec![cell(&corner, 2), cell(&corner, 1)],
                vec![cell(&corner, 3), cell(&corner, 0)],
            ],
        )
        .expect("valid rows");
        let mut report = FlowReport::new();

        let remainder = flow(&mut grid, CellCoord::new(0, 0), Direction::Right, 500.0, &mut report);

        assert!((remainder - 100.0).abs() < EPSILON);
        assert!(report.leak().is_none(), "a sealed loop never leaks");
        for (coord, cell) in grid.iter() {
            assert!(!cell.is_distributing(), "{coord:?} left mid-cascade");
            assert!((cell.total_fill() - 100.0).abs() < EPSILON);
        }
    }

    #[test]
    fn volume_is_conserved_across_repeated_injections() {
        let straight = tile("straight", &[Direction::Top, Direction::Bottom], 40.0);
        let tee = tile("tee", &[Direction::Top, Direction::Left, Direction::Right], 30.0);
        let corner = tile("corner", &[Direction::Top, Direction::Left], 25.0);
        let end = tile("end", &[Direction::Top], 35.0);
        let mut grid = Grid::from_rows(
            3,
            0,
            vec![
                vec![cell(&corner, 2), cell(&tee, 0), cell(&corner, 1)],
                vec![cell(&straight, 0), cell(&end, 0), cell(&straight, 0)],
                vec![cell(&end, 2), cell(&end, 0), cell(&corner, 0)],
            ],
        )
        .expect("valid rows");

        let mut injected = 0.0;
        let mut returned = 0.0;
        for amount in [7.5, 19.25, 33.0, 0.0, 41.125, 64.0, 12.0, 90.0] {
            let mut report = FlowReport::new();
            injected += amount;
            returned += flow(&mut grid, CellCoord::new(1, 0), Direction::Top, amount, &mut report);
            assert!((stored(&grid) + returned - injected).abs() < EPSILON);
        }
        for (_, cell) in grid.iter() {
            assert!(cell.total_fill() <= cell.capacity() + EPSILON);
            assert!(!cell.is_distributing());
        }
    }
}
