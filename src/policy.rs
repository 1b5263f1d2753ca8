use anyhow::Result;

use crate::pos::Dir;

/// Number of discrete actions a policy chooses between.
pub const ACTIONS: usize = 4;

/// The contract any decision agent has to satisfy, whether it is a learned
/// agent, a human command source, or anything else that can pick a move.
///
/// Protocol, per tick the agent drives:
/// 1. `act` is handed the flattened grid observation (see
///    [`crate::world::GridWorld::sample_grid_state`]) and returns an action
///    index. Indices outside `0..ACTIONS` mean "no direction change"; a
///    reversal is silently ignored downstream. Selection may be stochastic.
/// 2. `receive_reward` is called exactly once with the scalar outcome of
///    that action, in the order actions were issued. Never batched.
///
/// `snapshot`/`restore` carry the learned state as an opaque blob so the
/// host can persist it; the simulation core never looks inside.
pub trait Policy {
    fn act(&mut self, observation: &[f32]) -> usize;

    fn receive_reward(&mut self, reward: f32);

    fn snapshot(&self) -> Result<Vec<u8>>;

    fn restore(&mut self, blob: &[u8]) -> Result<()>;
}

/// Pass-through adapter: turns an externally supplied directional command
/// into the policy contract. Rewards are discarded and there is no state
/// worth persisting.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    dir: Dir,
}

impl CommandPolicy {
    pub fn new() -> Self {
        Self { dir: Dir::Right }
    }

    pub fn set_command(&mut self, dir: Dir) {
        self.dir = dir;
    }
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for CommandPolicy {
    fn act(&mut self, _observation: &[f32]) -> usize {
        self.dir.action_index()
    }

    fn receive_reward(&mut self, _reward: f32) {}

    fn snapshot(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn restore(&mut self, _blob: &[u8]) -> Result<()> {
        Ok(())
    }
}
