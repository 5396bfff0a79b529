use std::{fmt::Debug, hash::Hash};

use log::{debug, info};
use ndarray::{Array2, ArrayView1};

use crate::{
    env::{DeterministicEnv, StateIndex},
    error::EnvError,
};

/// The fully materialized model of a [`DeterministicEnv`]: the index↔state
/// bijection plus dense transition and feature matrices over the whole
/// state × action space.
///
/// `transitions[[s, a]]` is the dense index of the unique successor of state
/// `s` under action code `a`; `features.row(s)` is the feature vector of
/// state `s`. Both are built once by [`build`](TabularMdp::build) and never
/// mutated, so planning code can borrow the raw arrays freely.
#[derive(Debug, Clone)]
pub struct TabularMdp<S> {
    index: StateIndex<S>,
    transitions: Array2<usize>,
    features: Array2<f64>,
}

impl<S: Clone + Eq + Hash + Debug> TabularMdp<S> {
    /// Enumerate `env`'s state space and memoize its transition and feature
    /// functions into dense matrices.
    ///
    /// The enumerated set must be closed under the transition function; a
    /// successor missing from the index tables means enumeration did not
    /// cover the reachable space and surfaces as [`EnvError::UnknownState`]
    /// rather than silently widening the space.
    pub fn build<E>(env: &E) -> Result<Self, EnvError>
    where
        E: DeterministicEnv<State = S>,
    {
        let index = env.enumerate_states();
        let actions = env.actions();
        let num_states = index.len();
        let num_actions = actions.len();
        let num_features = env.num_features();

        info!(
            "building dense matrices: {} states x {} actions, {} features",
            num_states, num_actions, num_features
        );

        let mut transitions = Array2::<usize>::zeros((num_states, num_actions));
        let mut features = Array2::<f64>::zeros((num_states, num_features));

        for (s_ix, state) in index.iter() {
            for (a_ix, &action) in actions.iter().enumerate() {
                let successor = env.next_state(state, action);
                let ns_ix = index
                    .get(&successor)
                    .ok_or_else(|| EnvError::UnknownState(format!("{successor:?}")))?;
                transitions[[s_ix, a_ix]] = ns_ix;
            }
            features.row_mut(s_ix).assign(&env.features(state));
        }

        debug!("dense matrices built");

        Ok(Self {
            index,
            transitions,
            features,
        })
    }

    pub fn num_states(&self) -> usize {
        self.index.len()
    }

    pub fn num_actions(&self) -> usize {
        self.transitions.ncols()
    }

    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    /// The index↔state bijection backing the matrices
    pub fn index(&self) -> &StateIndex<S> {
        &self.index
    }

    /// The raw `[num_states × num_actions]` successor-index matrix
    pub fn transitions(&self) -> &Array2<usize> {
        &self.transitions
    }

    /// The raw `[num_states × num_features]` feature matrix
    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    /// Dense index of `state`, failing loudly if it was never enumerated
    pub fn index_of(&self, state: &S) -> Result<usize, EnvError> {
        self.index
            .get(state)
            .ok_or_else(|| EnvError::UnknownState(format!("{state:?}")))
    }

    /// State at a dense index
    pub fn state(&self, index: usize) -> Result<&S, EnvError> {
        self.index
            .state(index)
            .ok_or(EnvError::StateIndexOutOfRange {
                index,
                num_states: self.num_states(),
            })
    }

    /// Successor index for `(state index, action code)`, bounds-checked
    pub fn transition(&self, state: usize, action: usize) -> Result<usize, EnvError> {
        if state >= self.num_states() {
            return Err(EnvError::StateIndexOutOfRange {
                index: state,
                num_states: self.num_states(),
            });
        }
        if action >= self.num_actions() {
            return Err(EnvError::ActionOutOfRange {
                action,
                num_actions: self.num_actions(),
            });
        }
        Ok(self.transitions[[state, action]])
    }

    /// Feature vector for a state index, bounds-checked
    pub fn feature_row(&self, state: usize) -> Result<ArrayView1<'_, f64>, EnvError> {
        if state >= self.num_states() {
            return Err(EnvError::StateIndexOutOfRange {
                index: state,
                num_states: self.num_states(),
            });
        }
        Ok(self.features.row(state))
    }
}
