use thiserror::Error;

use crate::direction::Pos;

/// Errors surfaced by environment construction and tabular-model lookups
///
/// None of these are recoverable: every operation in the crate is pure and
/// deterministic, so a failure reproduces exactly and indicates either a bug
/// in state-space coverage or a caller contract violation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    /// A state was not found in the enumerated index tables. The state space
    /// is closed under the transition function by construction, so this
    /// indicates an enumeration-coverage bug, never a recoverable condition.
    #[error("state not present in the enumerated state space: {0}")]
    UnknownState(String),

    /// A numeric action code outside the canonical action numbering
    #[error("action code {action} out of range (num_actions = {num_actions})")]
    ActionOutOfRange { action: usize, num_actions: usize },

    /// A dense state index outside `[0, num_states)`
    #[error("state index {index} out of range (num_states = {num_states})")]
    StateIndexOutOfRange { index: usize, num_states: usize },

    /// An initial state placing the agent on an intact vase, which the
    /// transition function can never produce and enumeration never emits
    #[error("initial state places the agent on an intact vase at {0:?}")]
    AgentOnIntactVase(Pos),

    /// An initial state with the agent or a vase outside the grid
    #[error("{what} at {pos:?} is outside the {width}x{height} grid")]
    OutOfBounds {
        what: &'static str,
        pos: Pos,
        width: i32,
        height: i32,
    },

    /// A query that requires the precomputed matrices on an environment
    /// built without them
    #[error("transition matrices were not computed for this environment")]
    MatricesNotComputed,
}
