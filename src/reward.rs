use crate::config::Config;

/// Per-tick reward bookkeeping. Each contribution is set independently while
/// the tick runs; `consume` hands back the sum and zeroes all three, so the
/// next tick starts clean. Apple and death contributions are mutually
/// exclusive within a tick because a colliding head never reaches the apple
/// check.
#[derive(Debug, Clone)]
pub struct RewardTally {
    alive_value: f32,
    apple_value: f32,
    death_value: f32,
    alive: f32,
    apple: f32,
    dead: f32,
}

impl RewardTally {
    pub fn new(config: &Config) -> Self {
        Self {
            alive_value: config.alive_reward,
            apple_value: config.apple_reward,
            death_value: config.death_penalty,
            alive: 0.0,
            apple: 0.0,
            dead: 0.0,
        }
    }

    pub fn record_alive(&mut self) {
        self.alive = self.alive_value;
    }

    pub fn record_apple(&mut self) {
        self.apple = self.apple_value;
    }

    pub fn record_death(&mut self) {
        self.dead = self.death_value;
    }

    /// Sum of everything recorded this tick; resets the tally.
    pub fn consume(&mut self) -> f32 {
        let total = self.alive + self.apple + self.dead;
        self.alive = 0.0;
        self.apple = 0.0;
        self.dead = 0.0;
        total
    }
}
