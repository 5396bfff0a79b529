use std::{
    collections::{BTreeMap, HashSet},
    error::Error,
};

use agent::ValueIterationAgent;
use ndarray::array;
use roomworld::room::{RoomEnv, RoomSpec, RoomState};

mod agent;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // A 4x3 room: two vases between the agent and a goal door, one carpet.
    let init_state = RoomState::new((0, 0), BTreeMap::from([((1, 1), true), ((2, 1), true)]));
    let mut env = RoomEnv::new(RoomSpec {
        height: 3,
        width: 4,
        init_state,
        carpet_locations: HashSet::from([(1, 2)]),
        feature_locations: vec![(3, 2)],
    })?;

    println!(
        "Enumerated {} states, {} actions, {} features",
        env.num_states()?,
        env.num_actions(),
        env.mdp()?.num_features()
    );

    // Linear reward on the feature vector: each broken vase costs 1,
    // standing at the door earns 1, carpets are neutral.
    let weights = array![-1.0, 0.0, 1.0];
    let rewards = env.mdp()?.features().dot(&weights);

    let mut agent = ValueIterationAgent::new(0.9);
    agent.learn(env.mdp()?, &rewards);

    println!("\nGreedy rollout:");
    let mut state = env.reset();
    println!("{}\n", env.render_text(&state));
    for _ in 0..8 {
        let action = agent.action(env.state_index(&state)?);
        state = env.step_by_code(action)?;
        println!("{}\n", env.render_text(&state));
    }

    let report = env.report.take();
    println!(
        "steps: {}, vases broken: {}",
        report["steps"], report["vases_broken"]
    );

    Ok(())
}
