use strum::{EnumIter, FromRepr, VariantArray};

/// Grid coordinates `(x, y)`, with `y = 0` at the top row
pub type Pos = (i32, i32);

/// The five movement actions available to the agent
///
/// The discriminants are the canonical action numbering used by the dense
/// transition matrices, so `Direction::from_repr` decodes a numeric action
/// code and `dir as usize` encodes one.
#[derive(EnumIter, VariantArray, FromRepr, Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Direction {
    North = 0,
    South = 1,
    East = 2,
    West = 3,
    Stay = 4,
}

impl Direction {
    /// Movement delta `(dx, dy)` for this action
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::Stay => (0, 0),
        }
    }

    /// The position reached by moving from `pos` in this direction, ignoring
    /// any grid bounds
    pub fn step(self, pos: Pos) -> Pos {
        let (dx, dy) = self.delta();
        (pos.0 + dx, pos.1 + dy)
    }
}
