use std::hash::{Hash, Hasher};

use ahash::{AHashMap, AHasher};
use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::policy::{ACTIONS, Policy};

/// Tabular Q-learning agent over hashed observations.
///
/// Observations are quantized and hashed into a state key; the table maps
/// each key to one Q value per action. Learning happens lazily: the reward
/// delivered after an action is folded into the table on the *next* `act`,
/// once the successor state is known. The agent never sees an explicit
/// terminal flag; the death penalty itself is what the table learns from.
#[derive(Clone, Serialize, Deserialize)]
pub struct QAgent {
    q: AHashMap<u64, [f32; ACTIONS]>,
    epsilon: f32,
    min_epsilon: f32,
    decay: f32,
    alpha: f32,
    gamma: f32,
    steps: u64,
    #[serde(skip, default = "entropy_rng")]
    rng: SmallRng,
    #[serde(skip)]
    last: Option<Transition>,
}

#[derive(Clone, Copy)]
struct Transition {
    state: u64,
    action: usize,
    reward: f32,
}

fn entropy_rng() -> SmallRng {
    SmallRng::from_entropy()
}

fn state_key(observation: &[f32]) -> u64 {
    let mut hasher = AHasher::default();
    for &value in observation {
        // Cells only ever hold -1, 0 or 1.
        (value as i8).hash(&mut hasher);
    }
    hasher.finish()
}

impl QAgent {
    pub fn new() -> Self {
        Self::with_rng(entropy_rng())
    }

    pub fn with_rng(rng: SmallRng) -> Self {
        Self {
            q: AHashMap::new(),
            epsilon: 0.3,
            min_epsilon: 0.05,
            decay: 0.9999,
            alpha: 0.4,
            gamma: 0.7,
            steps: 0,
            rng,
            last: None,
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn states_seen(&self) -> usize {
        self.q.len()
    }

    fn qs(&mut self, state: u64) -> &mut [f32; ACTIONS] {
        self.q.entry(state).or_insert([0.0; ACTIONS])
    }

    fn greedy(&mut self, state: u64) -> usize {
        let qs = *self.qs(state);
        let mut best = 0;
        for action in 1..ACTIONS {
            if qs[action] > qs[best] {
                best = action;
            }
        }
        best
    }

    fn learn(&mut self, state: u64, action: usize, reward: f32, next_state: u64) {
        let next_max = self
            .q
            .get(&next_state)
            .map(|qs| qs.iter().copied().fold(f32::NEG_INFINITY, f32::max))
            .unwrap_or(0.0);
        let (alpha, gamma) = (self.alpha, self.gamma);
        let qsa = self.qs(state);
        let target = reward + gamma * next_max;
        qsa[action] += alpha * (target - qsa[action]);
    }
}

impl Default for QAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for QAgent {
    fn act(&mut self, observation: &[f32]) -> usize {
        let state = state_key(observation);

        if let Some(prev) = self.last.take() {
            self.learn(prev.state, prev.action, prev.reward, state);
            self.epsilon = (self.epsilon * self.decay).max(self.min_epsilon);
        }

        let action = if self.rng.r#gen::<f32>() < self.epsilon {
            self.rng.gen_range(0..ACTIONS)
        } else {
            self.greedy(state)
        };

        self.last = Some(Transition {
            state,
            action,
            reward: 0.0,
        });
        self.steps += 1;
        action
    }

    fn receive_reward(&mut self, reward: f32) {
        if let Some(prev) = self.last.as_mut() {
            prev.reward = reward;
        }
    }

    fn snapshot(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .context("encode q-table")
    }

    fn restore(&mut self, blob: &[u8]) -> Result<()> {
        let (agent, _) =
            bincode::serde::decode_from_slice::<QAgent, _>(blob, bincode::config::standard())
                .context("decode q-table")?;
        *self = agent;
        Ok(())
    }
}
