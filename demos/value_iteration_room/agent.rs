use ndarray::Array1;
use roomworld::{mdp::TabularMdp, room::RoomState};

/// A value iteration planner
///
/// This agent is a pure consumer of the precomputed dense matrices: it never
/// calls the transition function itself, it only indexes into the
/// `[num_states × num_actions]` successor table and a per-state reward
/// vector derived from the feature matrix.
pub struct ValueIterationAgent {
    values: Array1<f64>,
    policy: Vec<usize>,
    gamma: f64,
}

impl ValueIterationAgent {
    pub fn new(gamma: f64) -> Self {
        Self {
            values: Array1::zeros(0),
            policy: Vec::new(),
            gamma,
        }
    }

    /// Sweep value backups until convergence, then extract a greedy policy
    pub fn learn(&mut self, mdp: &TabularMdp<RoomState>, rewards: &Array1<f64>) {
        let num_states = mdp.num_states();
        let num_actions = mdp.num_actions();
        let transitions = mdp.transitions();

        self.values = Array1::zeros(num_states);
        let mut delta = f64::INFINITY;
        while delta > 1e-8 {
            delta = 0.0;
            for s in 0..num_states {
                let new_value = (0..num_actions)
                    .map(|a| {
                        let ns = transitions[[s, a]];
                        rewards[ns] + self.gamma * self.values[ns]
                    })
                    .fold(f64::NEG_INFINITY, f64::max);
                delta = delta.max((new_value - self.values[s]).abs());
                self.values[s] = new_value;
            }
        }

        self.policy = (0..num_states)
            .map(|s| {
                (0..num_actions)
                    .max_by(|&a, &b| {
                        let va = self.action_value(transitions[[s, a]], rewards);
                        let vb = self.action_value(transitions[[s, b]], rewards);
                        va.partial_cmp(&vb).expect("values are finite")
                    })
                    .expect("There is always at least one action available")
            })
            .collect();
    }

    fn action_value(&self, next_state: usize, rewards: &Array1<f64>) -> f64 {
        rewards[next_state] + self.gamma * self.values[next_state]
    }

    /// Greedy action code for a state index
    pub fn action(&self, state: usize) -> usize {
        self.policy[state]
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }
}
