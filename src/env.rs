use std::{collections::HashMap, fmt::Debug, hash::Hash, mem};

use ndarray::Array1;

/// Represents a deterministic Markov decision process with finite state and
/// action spaces that can be enumerated exhaustively up front.
///
/// This is the contract consumed by [`TabularMdp::build`](crate::mdp::TabularMdp::build):
/// the implementor supplies the state space, the canonical action numbering,
/// a total single-step transition function, and a feature projection, and the
/// builder memoizes the latter two over the whole space as dense matrices.
///
/// ### Requirements
/// - `next_state` must be pure and total: every `(state, action)` pair drawn
///   from `enumerate_states` × `actions` has exactly one successor, and that
///   successor must itself be in the enumerated set (closure).
/// - `actions` must return the full action set in canonical numbering order,
///   so that `actions()[i]` is the action with numeric code `i`.
pub trait DeterministicEnv {
    /// A state of the environment, usable as a dictionary key
    type State: Clone + Eq + Hash + Debug;

    /// An action an agent can take, with a canonical numeric code
    type Action: Copy;

    /// The full action set, ordered by numeric code
    fn actions(&self) -> Vec<Self::Action>;

    /// Exhaustively enumerate every valid state, assigning dense indices
    fn enumerate_states(&self) -> StateIndex<Self::State>;

    /// The unique successor of `state` under `action`
    fn next_state(&self, state: &Self::State, action: Self::Action) -> Self::State;

    /// The feature vector of `state`; length must equal `num_features` for
    /// every state
    fn features(&self, state: &Self::State) -> Array1<f64>;

    /// Dimensionality of the feature vectors
    fn num_features(&self) -> usize;
}

/// A dense bidirectional mapping between states and contiguous indices
///
/// Indices are assigned sequentially from 0 in insertion order, so after
/// enumeration the index set is exactly `{0, ..., len - 1}`. The map is
/// append-only while it is being built and read-only once handed to the
/// matrix builder.
#[derive(Debug, Clone, Default)]
pub struct StateIndex<S> {
    by_state: HashMap<S, usize>,
    by_index: Vec<S>,
}

impl<S: Clone + Eq + Hash> StateIndex<S> {
    pub fn new() -> Self {
        Self {
            by_state: HashMap::new(),
            by_index: Vec::new(),
        }
    }

    /// Insert a state, assigning it the next dense index unless it is
    /// already present. Returns the state's index either way.
    pub fn insert(&mut self, state: S) -> usize {
        if let Some(&ix) = self.by_state.get(&state) {
            return ix;
        }
        let ix = self.by_index.len();
        self.by_state.insert(state.clone(), ix);
        self.by_index.push(state);
        ix
    }

    /// Look up the dense index of a state
    pub fn get(&self, state: &S) -> Option<usize> {
        self.by_state.get(state).copied()
    }

    /// Look up the state at a dense index
    pub fn state(&self, index: usize) -> Option<&S> {
        self.by_index.get(index)
    }

    /// Number of states indexed so far
    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    /// Iterate over `(index, state)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &S)> {
        self.by_index.iter().enumerate()
    }
}

/// A running tally of named episode metrics, reset on [`take`](Report::take)
#[derive(Debug, Clone, Default)]
pub struct Report {
    entries: HashMap<&'static str, f64>,
}

impl Report {
    /// Initialize a report tracking the given metric names at 0
    pub fn new(keys: Vec<&'static str>) -> Self {
        Self {
            entries: keys.into_iter().map(|k| (k, 0.0)).collect(),
        }
    }

    /// Access a metric entry for in-place updates
    pub fn entry(
        &mut self,
        key: &'static str,
    ) -> std::collections::hash_map::Entry<'_, &'static str, f64> {
        self.entries.entry(key)
    }

    /// Read a metric value
    pub fn get(&self, key: &str) -> Option<&f64> {
        self.entries.get(key)
    }

    /// Take the accumulated metrics, resetting all entries to 0
    pub fn take(&mut self) -> HashMap<&'static str, f64> {
        let keys = self.entries.keys().copied().collect();
        mem::replace(self, Self::new(keys)).entries
    }
}
