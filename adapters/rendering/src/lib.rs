#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Text presentation of Endless Pipes levels.

mod glyph;

use std::fmt::Write as _;

use anyhow::Result as AnyResult;
use endless_pipes_core::{Direction, FailureCause};
use endless_pipes_world::{query, Level};

pub use glyph::{glyph, Glyph, GlyphCache, BLANK, PIPE};

/// Centre marker of a cell holding some fluid.
pub const WET: char = '~';

/// Centre marker of a cell filled to capacity.
pub const FULL: char = '@';

/// Width in characters of one rendered cell, markers included.
pub const CELL_WIDTH: usize = 5;

/// Renders the visible part of a level as plain text.
#[derive(Clone, Debug, Default)]
pub struct TextRenderer {
    glyphs: GlyphCache,
}

impl TextRenderer {
    /// Creates a renderer with an empty glyph cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Glyph cache shared by every frame drawn with this renderer.
    #[must_use]
    pub fn glyphs(&self) -> &GlyphCache {
        &self.glyphs
    }

    /// Draws every visible row followed by a status line.
    ///
    /// Each grid row becomes three glyph lines and one line of fill
    /// percentages. The entry cell is framed by `>`/`<` and the selected cell
    /// by `[`/`]`.
    pub fn render_frame(&mut self, level: &Level) -> String {
        let columns = level.grid().columns() as usize;
        let mut frame = String::new();

        for row in query::visible_rows(level) {
            let cells: Vec<_> = query::visible_cells(level)
                .filter(|view| view.coord.row() == row)
                .collect();
            let mut lines = [
                String::with_capacity(columns * CELL_WIDTH),
                String::with_capacity(columns * CELL_WIDTH),
                String::with_capacity(columns * CELL_WIDTH),
            ];
            let mut gauge = String::with_capacity(columns * CELL_WIDTH);

            for view in &cells {
                let mut drawn = self.glyphs.get(view.tile, view.orientation);
                let ratio = view.fill_ratio();
                if ratio >= 1.0 {
                    drawn = drawn.with_centre(FULL);
                } else if view.total_fill() > 0.0 {
                    drawn = drawn.with_centre(WET);
                }
                let (open, close) = markers(view.entry, view.selected);
                for (index, line) in lines.iter_mut().enumerate() {
                    let (left, right) = if index == 1 { (open, close) } else { (BLANK, BLANK) };
                    line.push(left);
                    line.push_str(&drawn.line(index));
                    line.push(right);
                }
                let percent = (ratio * 100.0).round() as u32;
                let _ = write!(gauge, "{percent:>3}% ");
            }

            for line in &lines {
                let _ = writeln!(frame, "{row:>4} {}", line.trim_end());
            }
            let _ = writeln!(frame, "     {}", gauge.trim_end());
        }

        frame.push_str(&status_line(level));
        frame
    }
}

fn markers(entry: bool, selected: bool) -> (char, char) {
    if selected {
        ('[', ']')
    } else if entry {
        ('>', '<')
    } else {
        (BLANK, BLANK)
    }
}

/// One-line summary of elapsed time, inflow and level state.
#[must_use]
pub fn status_line(level: &Level) -> String {
    let rows = query::visible_rows(level);
    let mut status = format!(
        "t={:.1}s inflow={:.1}/s rows {}..{}",
        level.elapsed(),
        level.inflow_rate(),
        rows.start,
        rows.end
    );
    if let Some(cause) = level.failure() {
        let _ = write!(status, " FAILED: {}", describe_failure(cause));
    }
    status
}

/// Human readable explanation of why a level failed.
#[must_use]
pub fn describe_failure(cause: FailureCause) -> String {
    match cause {
        FailureCause::ClosedPort { cell, direction } => format!(
            "fluid hit the closed {} side of ({}, {})",
            direction_name(direction),
            cell.column(),
            cell.row()
        ),
        FailureCause::Boundary { cell, direction } => format!(
            "fluid ran off the {} edge at ({}, {})",
            direction_name(direction),
            cell.column(),
            cell.row()
        ),
        FailureCause::Unabsorbed { remainder } => {
            format!("the network overflowed by {remainder:.1}")
        }
    }
}

const fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Top => "top",
        Direction::Left => "left",
        Direction::Bottom => "bottom",
        Direction::Right => "right",
    }
}

/// Destination for rendered frames.
pub trait RenderingBackend {
    /// Presents one fully drawn frame.
    fn present(&mut self, frame: &str) -> AnyResult<()>;
}
