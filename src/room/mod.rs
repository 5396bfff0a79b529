pub mod render;
pub mod state;

pub use render::Tile;
pub use state::RoomState;

use std::collections::{BTreeMap, HashSet};

use log::{debug, info};
use ndarray::Array1;
use rand::seq::IteratorRandom;
use strum::{IntoEnumIterator, VariantArray};

use crate::{
    direction::{Direction, Pos},
    env::{DeterministicEnv, Report, StateIndex},
    error::EnvError,
    mdp::TabularMdp,
};

/// Static description of a room, consumed by [`RoomEnv::new`]
///
/// Vase locations are not supplied separately; they are the keys of
/// `init_state.vase_states` and stay fixed for the lifetime of the
/// environment.
#[derive(Debug, Clone)]
pub struct RoomSpec {
    /// Grid height; y coordinates are in `[0, height)`
    pub height: i32,
    /// Grid width; x coordinates are in `[0, width)`
    pub width: i32,
    /// Starting state, also the source of the vase-location set
    pub init_state: RoomState,
    /// Cells that raise the carpet feature indicator
    pub carpet_locations: HashSet<Pos>,
    /// Cells that each contribute one indicator to the feature vector
    pub feature_locations: Vec<Pos>,
}

/// A bounded gridworld with breakable vases, modeled as an exact finite MDP
///
/// The agent moves in the four cardinal directions or stays put; walking into
/// a wall leaves it in place, and entering a vase cell breaks that vase
/// permanently. [`RoomEnv::new`] enumerates every valid state and memoizes
/// the transition and feature functions into dense matrices (see
/// [`TabularMdp`]); [`RoomEnv::without_matrices`] skips that precomputation
/// for callers that only need on-demand simulation.
pub struct RoomEnv {
    height: i32,
    width: i32,
    init_state: RoomState,
    vase_locations: Vec<Pos>,
    carpet_locations: HashSet<Pos>,
    feature_locations: Vec<Pos>,
    mdp: Option<TabularMdp<RoomState>>,
    s: RoomState,
    pub report: Report,
}

impl RoomEnv {
    /// Build the environment and precompute its dense matrices
    ///
    /// Fails fast on an initial state that could never be produced by the
    /// dynamics (agent standing on an intact vase) or that lies outside the
    /// grid, and on any enumeration-coverage bug surfaced by the matrix
    /// build.
    pub fn new(spec: RoomSpec) -> Result<Self, EnvError> {
        let mut env = Self::without_matrices(spec)?;
        env.mdp = Some(TabularMdp::build(&env)?);
        Ok(env)
    }

    /// Build the environment without enumerating its state space
    ///
    /// Single-step simulation (`reset`/`step`/`rollout`) works as usual;
    /// index and matrix queries return [`EnvError::MatricesNotComputed`].
    pub fn without_matrices(spec: RoomSpec) -> Result<Self, EnvError> {
        let RoomSpec {
            height,
            width,
            init_state,
            carpet_locations,
            feature_locations,
        } = spec;

        let in_bounds = |(x, y): Pos| 0 <= x && x < width && 0 <= y && y < height;
        if !in_bounds(init_state.agent_pos) {
            return Err(EnvError::OutOfBounds {
                what: "agent",
                pos: init_state.agent_pos,
                width,
                height,
            });
        }
        if let Some(&pos) = init_state.vase_states.keys().find(|&&p| !in_bounds(p)) {
            return Err(EnvError::OutOfBounds {
                what: "vase",
                pos,
                width,
                height,
            });
        }
        if init_state.agent_on_intact_vase() {
            return Err(EnvError::AgentOnIntactVase(init_state.agent_pos));
        }

        // BTreeMap keys iterate sorted, fixing the vase ordering for good
        let vase_locations: Vec<Pos> = init_state.vase_states.keys().copied().collect();

        info!(
            "room {}x{}: {} vases, {} carpets, {} feature locations",
            width,
            height,
            vase_locations.len(),
            carpet_locations.len(),
            feature_locations.len()
        );

        Ok(Self {
            height,
            width,
            s: init_state.clone(),
            init_state,
            vase_locations,
            carpet_locations,
            feature_locations,
            mdp: None,
            report: Report::new(vec!["steps", "vases_broken"]),
        })
    }

    fn in_bounds(&self, (x, y): Pos) -> bool {
        0 <= x && x < self.width && 0 <= y && y < self.height
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    /// Vase locations in their fixed, sorted order
    pub fn vase_locations(&self) -> &[Pos] {
        &self.vase_locations
    }

    pub fn num_vases(&self) -> usize {
        self.vase_locations.len()
    }

    pub fn num_actions(&self) -> usize {
        Direction::VARIANTS.len()
    }

    /// The precomputed model, if this environment was built with matrices
    pub fn mdp(&self) -> Result<&TabularMdp<RoomState>, EnvError> {
        self.mdp.as_ref().ok_or(EnvError::MatricesNotComputed)
    }

    /// Number of enumerated valid states
    pub fn num_states(&self) -> Result<usize, EnvError> {
        Ok(self.mdp()?.num_states())
    }

    /// Dense index of `state`, failing loudly if it was never enumerated
    pub fn state_index(&self, state: &RoomState) -> Result<usize, EnvError> {
        self.mdp()?.index_of(state)
    }

    /// State at a dense index
    pub fn state_at(&self, index: usize) -> Result<&RoomState, EnvError> {
        self.mdp()?.state(index)
    }

    /// The current simulation state
    pub fn current(&self) -> &RoomState {
        &self.s
    }

    /// Reset the simulation to the initial state
    pub fn reset(&mut self) -> RoomState {
        self.s = self.init_state.clone();
        self.s.clone()
    }

    /// Advance the simulation by one action, returning the new state
    pub fn step(&mut self, action: Direction) -> RoomState {
        self.report.entry("steps").and_modify(|x| *x += 1.0);

        let next = self.next_state(&self.s, action);
        let newly_broken = next.broken_vases() - self.s.broken_vases();
        self.report
            .entry("vases_broken")
            .and_modify(|x| *x += newly_broken as f64);

        self.s = next;
        self.s.clone()
    }

    /// Advance the simulation by a numeric action code
    pub fn step_by_code(&mut self, action: usize) -> Result<RoomState, EnvError> {
        let dir = Direction::from_repr(action).ok_or(EnvError::ActionOutOfRange {
            action,
            num_actions: self.num_actions(),
        })?;
        Ok(self.step(dir))
    }

    /// Reset and follow `actions`, returning every visited state starting
    /// with the initial one
    pub fn rollout(&mut self, actions: &[Direction]) -> Vec<RoomState> {
        let mut states = Vec::with_capacity(actions.len() + 1);
        states.push(self.reset());
        for &action in actions {
            states.push(self.step(action));
        }
        states
    }

    /// A uniformly random action
    pub fn random_action(&self) -> Direction {
        Direction::iter()
            .choose(&mut rand::thread_rng())
            .expect("Iterator is not empty")
    }
}

impl DeterministicEnv for RoomEnv {
    type State = RoomState;
    type Action = Direction;

    fn actions(&self) -> Vec<Direction> {
        Direction::VARIANTS.to_vec()
    }

    /// Every boolean assignment over the fixed vase-location set, crossed
    /// with every agent position that does not sit on an intact vase.
    ///
    /// Candidate layouts are read off the bits of a counter instead of a
    /// materialized product, so peak memory stays at one layout even though
    /// the enumeration itself is exponential in the vase count (an accepted
    /// scaling limit of exact modeling).
    fn enumerate_states(&self) -> StateIndex<RoomState> {
        let mut index = StateIndex::new();

        // bit i set = vase i broken
        for mask in 0u64..(1u64 << self.vase_locations.len()) {
            let vase_states: BTreeMap<Pos, bool> = self
                .vase_locations
                .iter()
                .enumerate()
                .map(|(i, &loc)| (loc, mask & (1 << i) == 0))
                .collect();

            for y in 0..self.height {
                for x in 0..self.width {
                    let pos = (x, y);
                    if vase_states.get(&pos).copied().unwrap_or(false) {
                        // Can't have the agent on an intact vase
                        continue;
                    }
                    index.insert(RoomState::new(pos, vase_states.clone()));
                }
            }
        }

        debug!("enumerated {} valid states", index.len());
        index
    }

    fn next_state(&self, state: &RoomState, action: Direction) -> RoomState {
        let candidate = action.step(state.agent_pos);
        let new_pos = if self.in_bounds(candidate) {
            candidate
        } else {
            // Walls clamp, they never wrap
            state.agent_pos
        };

        let mut vase_states = state.vase_states.clone();
        if let Some(intact) = vase_states.get_mut(&new_pos) {
            // Break the vase; already-broken stays broken
            *intact = false;
        }

        RoomState::new(new_pos, vase_states)
    }

    /// `[broken-vase count, on-carpet indicator, one indicator per feature
    /// location]`, in that order
    fn features(&self, state: &RoomState) -> Array1<f64> {
        let mut features = Vec::with_capacity(self.num_features());
        features.push(state.broken_vases() as f64);
        features.push(f64::from(u8::from(
            self.carpet_locations.contains(&state.agent_pos),
        )));
        for fpos in &self.feature_locations {
            features.push(f64::from(u8::from(state.agent_pos == *fpos)));
        }
        Array1::from(features)
    }

    fn num_features(&self) -> usize {
        2 + self.feature_locations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(
        width: i32,
        height: i32,
        agent: Pos,
        vases: &[Pos],
        carpets: &[Pos],
        features: &[Pos],
    ) -> RoomEnv {
        let init_state = RoomState::new(agent, vases.iter().map(|&v| (v, true)).collect());
        RoomEnv::new(RoomSpec {
            height,
            width,
            init_state,
            carpet_locations: carpets.iter().copied().collect(),
            feature_locations: features.to_vec(),
        })
        .unwrap()
    }

    /// Independent count of (position, layout) pairs satisfying the
    /// validity rule, without going through the enumerator
    fn brute_force_count(width: i32, height: i32, vases: &[Pos]) -> usize {
        let mut count = 0;
        for mask in 0u64..(1u64 << vases.len()) {
            for y in 0..height {
                for x in 0..width {
                    let on_intact = vases
                        .iter()
                        .enumerate()
                        .any(|(i, &v)| v == (x, y) && mask & (1 << i) == 0);
                    if !on_intact {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    #[test]
    fn enumeration_matches_brute_force_count() {
        let cases: &[(i32, i32, &[Pos])] = &[
            (2, 2, &[(1, 1)]),
            (3, 2, &[(1, 0), (2, 1)]),
            (4, 3, &[(0, 0), (1, 1), (3, 2)]),
            (2, 2, &[]),
        ];
        for &(w, h, vases) in cases {
            // The top-right corner is vase-free in every case above
            let agent = (w - 1, 0);
            let env = room(w, h, agent, vases, &[], &[]);
            assert_eq!(
                env.num_states().unwrap(),
                brute_force_count(w, h, vases),
                "state count for {w}x{h} with {} vases",
                vases.len()
            );
        }
    }

    #[test]
    fn no_vases_degenerates_to_grid_cells() {
        let env = room(3, 2, (0, 0), &[], &[], &[]);
        assert_eq!(env.num_states().unwrap(), 6, "one state per cell");
    }

    #[test]
    fn index_tables_are_a_bijection() {
        let env = room(3, 2, (0, 0), &[(1, 0), (2, 1)], &[], &[]);
        let mdp = env.mdp().unwrap();
        for ix in 0..mdp.num_states() {
            let state = mdp.state(ix).unwrap().clone();
            assert_eq!(mdp.index_of(&state).unwrap(), ix, "index round-trips");
        }
        for (ix, state) in mdp.index().iter() {
            assert_eq!(mdp.index().get(state), Some(ix), "state round-trips");
        }
    }

    #[test]
    fn no_enumerated_state_has_agent_on_intact_vase() {
        let env = room(3, 3, (0, 0), &[(1, 1), (2, 0)], &[], &[]);
        let mdp = env.mdp().unwrap();
        for (_, state) in mdp.index().iter() {
            assert!(!state.agent_on_intact_vase(), "invalid state enumerated: {state}");
        }
    }

    #[test]
    fn boundary_moves_clamp_at_the_corner() {
        let env = room(2, 2, (0, 0), &[], &[], &[]);
        let start = env.current().clone();
        for action in [Direction::West, Direction::North] {
            let next = env.next_state(&start, action);
            assert_eq!(next.agent_pos, (0, 0), "{action:?} clamps at (0, 0)");
        }
    }

    #[test]
    fn entering_a_vase_cell_breaks_the_vase() {
        let mut env = room(2, 1, (0, 0), &[(1, 0)], &[], &[]);
        let next = env.step(Direction::East);
        assert_eq!(next.agent_pos, (1, 0), "agent moved east");
        assert_eq!(next.vase_states[&(1, 0)], false, "vase broke on entry");
        assert_eq!(
            *env.report.get("vases_broken").unwrap(),
            1.0,
            "report counted the break"
        );
    }

    #[test]
    fn breaking_is_idempotent() {
        let env = room(2, 1, (0, 0), &[(1, 0)], &[], &[]);
        let broken = RoomState::new((0, 0), BTreeMap::from([((1, 0), false)]));
        let next = env.next_state(&broken, Direction::East);
        assert_eq!(next.agent_pos, (1, 0), "agent moved onto the pieces");
        assert_eq!(next.vase_states[&(1, 0)], false, "flag stays broken");
        let again = env.next_state(&next, Direction::Stay);
        assert_eq!(again, next, "stay on pieces changes nothing");
    }

    #[test]
    fn stay_routes_through_the_delta_path() {
        let env = room(2, 2, (1, 1), &[(0, 0)], &[], &[]);
        let state = env.current().clone();
        let next = env.next_state(&state, Direction::Stay);
        assert_eq!(next, state, "stay is the identity on a valid state");
    }

    #[test]
    fn state_space_is_closed_under_transitions() {
        let env = room(3, 2, (0, 0), &[(1, 0), (1, 1)], &[], &[]);
        let mdp = env.mdp().unwrap();
        for (_, state) in mdp.index().iter() {
            for action in env.actions() {
                let successor = env.next_state(state, action);
                assert!(
                    mdp.index().get(&successor).is_some(),
                    "orphan successor {successor} from {state} via {action:?}"
                );
            }
        }
    }

    #[test]
    fn transition_matrix_agrees_with_single_steps() {
        let mut env = room(2, 2, (0, 0), &[(1, 1)], &[], &[]);
        let start_ix = env.state_index(env.current()).unwrap();

        let east_ix = env.mdp().unwrap().transition(start_ix, Direction::East as usize).unwrap();
        let stepped = env.step(Direction::East);
        assert_eq!(
            env.state_index(&stepped).unwrap(),
            east_ix,
            "matrix entry matches on-demand step"
        );
    }

    #[test]
    fn feature_vector_layout_and_bounds() {
        let env = room(
            3,
            3,
            (0, 0),
            &[(1, 1)],
            &[(0, 1), (2, 2)],
            &[(2, 0), (0, 2)],
        );
        assert_eq!(env.num_features(), 4, "2 + one per feature location");

        let mdp = env.mdp().unwrap();
        for (ix, state) in mdp.index().iter() {
            let row = mdp.feature_row(ix).unwrap();
            assert_eq!(row.len(), 4, "feature length is fixed");
            assert!(
                row[0] >= 0.0 && row[0] <= env.num_vases() as f64,
                "broken count within [0, num_vases]"
            );
            for &indicator in row.iter().skip(1) {
                assert!(indicator == 0.0 || indicator == 1.0, "indicators are 0/1");
            }
            assert_eq!(row[0], state.broken_vases() as f64, "broken count first");
        }

        let on_carpet = RoomState::new((0, 1), env.current().vase_states.clone());
        let f = env.features(&on_carpet);
        assert_eq!(f[1], 1.0, "carpet indicator fires on carpet");
        assert_eq!(f[2], 0.0, "feature indicator off elsewhere");

        let on_feature = RoomState::new((2, 0), env.current().vase_states.clone());
        let f = env.features(&on_feature);
        assert_eq!(f[1], 0.0, "carpet indicator off a carpet");
        assert_eq!(f[2], 1.0, "first feature-location indicator fires");
        assert_eq!(f[3], 0.0, "second feature-location indicator off");
    }

    #[test]
    fn two_by_two_scenario() {
        let mut env = room(2, 2, (0, 0), &[(1, 1)], &[], &[]);

        // Agent can't be at (1, 1) while the vase is intact: 3 positions with
        // the vase intact, 4 with it broken.
        assert_eq!(env.num_states().unwrap(), 7, "validity rule shapes the count");

        let states = env.rollout(&[Direction::East, Direction::South]);
        let last = states.last().unwrap();
        assert_eq!(last.agent_pos, (1, 1), "east then south lands on the vase");
        assert_eq!(last.vase_states[&(1, 1)], false, "and breaks it");
    }

    #[test]
    fn invalid_initial_states_fail_fast() {
        let on_vase = RoomState::new((1, 1), BTreeMap::from([((1, 1), true)]));
        let result = RoomEnv::new(RoomSpec {
            height: 2,
            width: 2,
            init_state: on_vase,
            carpet_locations: HashSet::new(),
            feature_locations: vec![],
        });
        assert_eq!(
            result.err().map(|e| e.to_string()).unwrap(),
            "initial state places the agent on an intact vase at (1, 1)",
            "agent on intact vase is rejected"
        );

        let outside = RoomState::new((2, 0), BTreeMap::new());
        let result = RoomEnv::new(RoomSpec {
            height: 2,
            width: 2,
            init_state: outside,
            carpet_locations: HashSet::new(),
            feature_locations: vec![],
        });
        assert!(
            matches!(result, Err(EnvError::OutOfBounds { what: "agent", .. })),
            "out-of-grid agent is rejected"
        );
    }

    #[test]
    fn matrix_free_env_still_simulates() {
        let init_state = RoomState::new((0, 0), BTreeMap::from([((1, 0), true)]));
        let mut env = RoomEnv::without_matrices(RoomSpec {
            height: 1,
            width: 3,
            init_state,
            carpet_locations: HashSet::new(),
            feature_locations: vec![],
        })
        .unwrap();

        assert_eq!(
            env.num_states(),
            Err(EnvError::MatricesNotComputed),
            "index queries fail loudly without matrices"
        );

        let next = env.step(Direction::East);
        assert_eq!(next.agent_pos, (1, 0), "on-demand stepping works");
        assert_eq!(next.vase_states[&(1, 0)], false, "vase broke");
    }

    #[test]
    fn numeric_action_codes_are_checked() {
        let mut env = room(2, 2, (0, 0), &[], &[], &[]);
        assert!(env.step_by_code(Direction::East as usize).is_ok(), "valid code");
        assert_eq!(
            env.step_by_code(9),
            Err(EnvError::ActionOutOfRange {
                action: 9,
                num_actions: 5
            }),
            "out-of-range code is a contract violation"
        );
    }

    #[test]
    fn reset_restores_the_initial_state() {
        let mut env = room(2, 2, (0, 0), &[(1, 1)], &[], &[]);
        env.step(Direction::East);
        env.step(Direction::South);
        assert_eq!(env.current().broken_vases(), 1, "vase broke along the way");

        let state = env.reset();
        assert_eq!(state.agent_pos, (0, 0), "agent back at the start");
        assert_eq!(state.broken_vases(), 0, "vases restored");
    }
}
