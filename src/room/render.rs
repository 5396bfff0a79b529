//! Pure rendering projections of a room state: a draw-ordered tile grid for
//! graphical frontends and a console glyph grid for quick diagnostics.
//! Actual drawing is left to external consumers.

use super::{RoomEnv, RoomState};

/// A drawable object occupying a cell, in back-to-front draw order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Rug,
    Door,
    Vase,
    Pieces,
    Agent,
}

impl Tile {
    fn glyph(self) -> char {
        match self {
            Tile::Rug => '~',
            Tile::Door => '+',
            Tile::Vase => 'V',
            Tile::Pieces => 'x',
            Tile::Agent => 'A',
        }
    }
}

impl RoomEnv {
    /// Project a state onto a `grid[y][x]` of object lists, ordered
    /// back-to-front for drawing
    pub fn render_layers(&self, state: &RoomState) -> Vec<Vec<Vec<Tile>>> {
        let mut grid =
            vec![vec![Vec::new(); self.width() as usize]; self.height() as usize];

        for &(x, y) in &self.carpet_locations {
            grid[y as usize][x as usize].push(Tile::Rug);
        }
        for &(x, y) in &self.feature_locations {
            grid[y as usize][x as usize].push(Tile::Door);
        }
        for (&(x, y), &intact) in &state.vase_states {
            grid[y as usize][x as usize].push(if intact { Tile::Vase } else { Tile::Pieces });
        }
        let (x, y) = state.agent_pos;
        grid[y as usize][x as usize].push(Tile::Agent);

        grid
    }

    /// Render a state as a console glyph grid, one character per cell with
    /// the topmost tile winning: `A` agent, `V` vase, `x` pieces, `+`
    /// feature cell, `~` carpet, `.` empty
    pub fn render_text(&self, state: &RoomState) -> String {
        let layers = self.render_layers(state);
        let mut out = String::new();
        for (y, row) in layers.iter().enumerate() {
            if y > 0 {
                out.push('\n');
            }
            for (x, cell) in row.iter().enumerate() {
                if x > 0 {
                    out.push(' ');
                }
                out.push(cell.last().map_or('.', |tile| tile.glyph()));
            }
        }
        out
    }
}
