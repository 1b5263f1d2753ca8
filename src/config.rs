use serde::{Deserialize, Serialize};

/// Simulation configuration. Reward values and the save cadence are plain
/// data here rather than constants; defaults match the reference behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Grid width in cells.
    pub grid_width: i32,
    /// Grid height in cells.
    pub grid_height: i32,
    /// Trail length at the start of every episode.
    pub initial_tail: usize,

    /// Reward for surviving a tick.
    pub alive_reward: f32,
    /// Reward for capturing an apple.
    pub apple_reward: f32,
    /// Reward for dying (wall or self collision).
    pub death_penalty: f32,

    /// Persist the policy every this many ticks (0 disables persistence).
    pub save_every: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_width: 40,
            grid_height: 30,
            initial_tail: 5,
            alive_reward: 1.0,
            apple_reward: 10.0,
            death_penalty: -10.0,
            save_every: 1000,
        }
    }
}

impl Config {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            grid_width: width,
            grid_height: height,
            ..Default::default()
        }
    }

    /// A 10x10 grid, handy in tests.
    pub fn small() -> Self {
        Self::new(10, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_values() {
        let config = Config::default();
        assert_eq!(config.initial_tail, 5);
        assert_eq!(config.alive_reward, 1.0);
        assert_eq!(config.apple_reward, 10.0);
        assert_eq!(config.death_penalty, -10.0);
        assert_eq!(config.save_every, 1000);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = Config::small();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.grid_width, 10);
        assert_eq!(back.grid_height, 10);
    }
}
