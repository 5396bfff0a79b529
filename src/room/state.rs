use std::{collections::BTreeMap, fmt};

use crate::direction::Pos;

/// The state of a room: where the agent stands and which vases are intact
///
/// Vase flags live in a `BTreeMap` keyed by location, so derived equality
/// and hashing traverse locations in sorted order regardless of how the map
/// was populated — two states with identical logical content always compare
/// and hash identically. The set of keys is fixed by the environment; only
/// the booleans (true = intact) vary between states.
///
/// States are values: once constructed they are never mutated. Transitions
/// derive a successor by cloning the vase map and building a fresh state.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoomState {
    /// The agent's `(x, y)` cell
    pub agent_pos: Pos,
    /// Intact flag for every vase location
    pub vase_states: BTreeMap<Pos, bool>,
}

impl RoomState {
    pub fn new(agent_pos: Pos, vase_states: BTreeMap<Pos, bool>) -> Self {
        Self {
            agent_pos,
            vase_states,
        }
    }

    /// Number of vases whose flag is broken
    pub fn broken_vases(&self) -> usize {
        self.vase_states.values().filter(|&&intact| !intact).count()
    }

    /// Whether the agent stands on a vase that is still intact
    ///
    /// True marks the state invalid: entering a vase cell breaks the vase in
    /// the same step, so no reachable state ever satisfies this.
    pub fn agent_on_intact_vase(&self) -> bool {
        self.vase_states.get(&self.agent_pos).copied().unwrap_or(false)
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Agent: {:?}, Vases: {{", self.agent_pos)?;
        for (i, (pos, intact)) in self.vase_states.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{:?}: {}",
                pos,
                if *intact { "intact" } else { "broken" }
            )?;
        }
        write!(f, "}}>")
    }
}
