/// Action set and movement deltas
pub mod direction;

/// Deterministic-MDP contract, state indexing, and episode metrics
pub mod env;

/// Error types
pub mod error;

/// Dense transition and feature matrices
pub mod mdp;

/// The room gridworld with breakable vases
pub mod room;
