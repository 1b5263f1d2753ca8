use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::persist::{PolicyStore, SavedPolicy};
use crate::policy::Policy;
use crate::pos::Dir;
use crate::reward::RewardTally;
use crate::world::{GridWorld, TickOutcome};

/// What one effective tick produced, for callers that want to watch the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub outcome: TickOutcome,
    pub reward: f32,
}

/// Owns the world, the reward tally, and an optional attached policy, and
/// sequences one full tick per `step` call. Death is rewarded and reset
/// inside the same call, so from the outside the session only ever looks
/// "running".
pub struct Session {
    pub world: GridWorld,
    rewards: RewardTally,
    policy: Option<Box<dyn Policy>>,
    store: Option<PolicyStore>,
    paused: bool,
    bypass: bool,
    iterations: u64,
    episodes: u64,
    pending: Option<Dir>,
    save_every: u64,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self::with_world(config, GridWorld::new(config))
    }

    /// Build around a pre-made world (e.g. one with a seeded RNG).
    pub fn with_world(config: &Config, world: GridWorld) -> Self {
        Self {
            world,
            rewards: RewardTally::new(config),
            policy: None,
            store: None,
            paused: false,
            bypass: false,
            iterations: 0,
            episodes: 0,
            pending: None,
            save_every: config.save_every,
        }
    }

    pub fn attach_policy(&mut self, policy: Box<dyn Policy>) {
        self.policy = Some(policy);
    }

    pub fn attach_store(&mut self, store: PolicyStore) {
        self.store = Some(store);
    }

    /// Ticks completed since the session (or its restored predecessor)
    /// started. Gates the save cadence.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Episodes completed, i.e. terminal ticks seen.
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn bypassed(&self) -> bool {
        self.bypass
    }

    /// While bypassed, buffered commands drive the world and the attached
    /// policy neither acts, learns, nor persists. Its state is untouched.
    pub fn set_bypass(&mut self, on: bool) {
        self.bypass = on;
    }

    pub fn toggle_bypass(&mut self) {
        self.bypass = !self.bypass;
    }

    /// Buffer a directional command for the next tick. A command also lifts
    /// pause, mirroring how the original keyboard surface behaved.
    pub fn command(&mut self, dir: Dir) {
        self.pending = Some(dir);
        self.paused = false;
    }

    /// Run one tick. Returns `None` while paused: nothing moves, nothing is
    /// counted, no reward is produced.
    ///
    /// When a policy is attached and not bypassed it is the sole direction
    /// source for the tick (a buffered command is consumed but ignored), it
    /// receives the tick's reward, and it is snapshotted to the store every
    /// `save_every` iterations.
    pub fn step(&mut self) -> Result<Option<StepReport>> {
        if self.paused {
            return Ok(None);
        }
        self.iterations += 1;

        let command = self.pending.take();
        let mut acted = false;
        let dir = if self.bypass {
            command
        } else if let Some(policy) = self.policy.as_mut() {
            let observation = self.world.sample_grid_state();
            acted = true;
            Dir::from_action(policy.act(&observation))
        } else {
            command
        };

        let outcome = self.world.tick(dir);
        match outcome {
            TickOutcome::Moved => self.rewards.record_alive(),
            TickOutcome::AppleCaptured => {
                self.rewards.record_alive();
                self.rewards.record_apple();
            }
            TickOutcome::OutOfBounds | TickOutcome::SelfCollision => {
                self.rewards.record_death();
                self.world.reset_growth();
                self.world.reset();
                self.episodes += 1;
            }
        }

        let reward = self.rewards.consume();
        if acted {
            if let Some(policy) = self.policy.as_mut() {
                policy.receive_reward(reward);
            }
            if self.save_every > 0 && self.iterations % self.save_every == 0 {
                self.persist()?;
            }
        }

        Ok(Some(StepReport { outcome, reward }))
    }

    /// Pull prior state from the store, if both a store and a policy are
    /// attached. Missing or unreadable state degrades to "start fresh";
    /// it never fails the session.
    pub fn restore(&mut self) {
        let (Some(policy), Some(store)) = (self.policy.as_mut(), self.store.as_ref()) else {
            return;
        };
        match store.load() {
            Ok(Some(saved)) => match policy.restore(&saved.blob) {
                Ok(()) => {
                    self.iterations = saved.iterations;
                    info!(iterations = saved.iterations, "restored policy state");
                }
                Err(err) => warn!("ignoring saved policy state: {err:#}"),
            },
            Ok(None) => {}
            Err(err) => warn!("ignoring saved policy state: {err:#}"),
        }
    }

    fn persist(&mut self) -> Result<()> {
        let (Some(policy), Some(store)) = (self.policy.as_ref(), self.store.as_ref()) else {
            return Ok(());
        };
        let blob = policy.snapshot().context("snapshot policy state")?;
        store.save(&SavedPolicy {
            iterations: self.iterations,
            blob,
        })?;
        debug!(iterations = self.iterations, "saved policy state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pos::Pos;
    use anyhow::Result;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Policy double that always answers with a fixed action and records
    /// what the session tells it.
    struct ScriptedPolicy {
        action: usize,
        acts: Rc<RefCell<u64>>,
        rewards: Rc<RefCell<Vec<f32>>>,
    }

    impl ScriptedPolicy {
        fn new(action: usize) -> (Self, Rc<RefCell<u64>>, Rc<RefCell<Vec<f32>>>) {
            let acts = Rc::new(RefCell::new(0));
            let rewards = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    action,
                    acts: Rc::clone(&acts),
                    rewards: Rc::clone(&rewards),
                },
                acts,
                rewards,
            )
        }
    }

    impl Policy for ScriptedPolicy {
        fn act(&mut self, _observation: &[f32]) -> usize {
            *self.acts.borrow_mut() += 1;
            self.action
        }

        fn receive_reward(&mut self, reward: f32) {
            self.rewards.borrow_mut().push(reward);
        }

        fn snapshot(&self) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        fn restore(&mut self, _blob: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    fn test_session() -> Session {
        let config = Config::small();
        let mut world = GridWorld::with_rng(&config, SmallRng::seed_from_u64(7));
        world.apple = Pos::new(0, 0);
        Session::with_world(&config, world)
    }

    #[test]
    fn paused_step_is_a_no_op() {
        let mut session = test_session();
        session.toggle_pause();
        let head_before = session.world.head();

        let report = session.step().unwrap();

        assert!(report.is_none());
        assert_eq!(session.iterations(), 0);
        assert_eq!(session.world.head(), head_before);
    }

    #[test]
    fn command_lifts_pause_and_steers() {
        let mut session = test_session();
        session.toggle_pause();
        session.command(Dir::Down);
        assert!(!session.paused());

        let report = session.step().unwrap().unwrap();
        assert_eq!(report.outcome, TickOutcome::Moved);
        assert_eq!(session.world.head(), Pos::new(5, 6));
    }

    #[test]
    fn alive_tick_pays_the_alive_reward() {
        let mut session = test_session();
        let report = session.step().unwrap().unwrap();
        assert_eq!(report.outcome, TickOutcome::Moved);
        assert_eq!(report.reward, 1.0);
    }

    #[test]
    fn capture_tick_pays_alive_plus_apple() {
        let mut session = test_session();
        session.world.apple = Pos::new(6, 5);
        let report = session.step().unwrap().unwrap();
        assert_eq!(report.outcome, TickOutcome::AppleCaptured);
        assert_eq!(report.reward, 11.0);
        assert_eq!(session.world.target_len, 6);
    }

    #[test]
    fn death_pays_the_penalty_alone_and_resets() {
        let mut session = test_session();
        session.world.pos = Pos::new(9, 5);
        session.world.target_len = 8;

        let report = session.step().unwrap().unwrap();

        assert_eq!(report.outcome, TickOutcome::OutOfBounds);
        assert_eq!(report.reward, -10.0);
        assert_eq!(session.episodes(), 1);
        // Same-call reset: the observable state is a fresh episode.
        assert_eq!(session.world.head(), Pos::new(5, 5));
        assert_eq!(session.world.dir, Dir::Right);
        assert!(session.world.trail.is_empty());
        assert_eq!(session.world.target_len, 5);
    }

    #[test]
    fn policy_drives_and_gets_exactly_one_reward_per_act() {
        let mut session = test_session();
        let (policy, acts, rewards) = ScriptedPolicy::new(Dir::Down.action_index());
        session.attach_policy(Box::new(policy));

        for _ in 0..3 {
            session.step().unwrap();
        }

        assert_eq!(*acts.borrow(), 3);
        assert_eq!(rewards.borrow().len(), 3);
        assert_eq!(session.world.head(), Pos::new(5, 8));
    }

    #[test]
    fn policy_outranks_a_buffered_command() {
        let mut session = test_session();
        let (policy, _, _) = ScriptedPolicy::new(Dir::Down.action_index());
        session.attach_policy(Box::new(policy));
        session.command(Dir::Up);

        session.step().unwrap();

        assert_eq!(session.world.head(), Pos::new(5, 6));
        // The stale command does not leak into the next tick either.
        session.step().unwrap();
        assert_eq!(session.world.head(), Pos::new(5, 7));
    }

    #[test]
    fn out_of_range_action_keeps_the_heading() {
        let mut session = test_session();
        let (policy, _, rewards) = ScriptedPolicy::new(99);
        session.attach_policy(Box::new(policy));

        let report = session.step().unwrap().unwrap();

        assert_eq!(report.outcome, TickOutcome::Moved);
        assert_eq!(session.world.dir, Dir::Right);
        assert_eq!(session.world.head(), Pos::new(6, 5));
        // Still a full protocol tick from the policy's point of view.
        assert_eq!(rewards.borrow().len(), 1);
    }

    #[test]
    fn bypass_sidelines_the_policy_without_detaching_it() {
        let mut session = test_session();
        let (policy, acts, rewards) = ScriptedPolicy::new(Dir::Down.action_index());
        session.attach_policy(Box::new(policy));
        session.set_bypass(true);

        session.command(Dir::Up);
        session.step().unwrap();

        assert_eq!(*acts.borrow(), 0);
        assert!(rewards.borrow().is_empty());
        assert_eq!(session.world.head(), Pos::new(5, 4));

        session.set_bypass(false);
        session.step().unwrap();
        assert_eq!(*acts.borrow(), 1);
    }

    #[test]
    fn apple_and_death_never_pay_together() {
        // Put the apple on the wall-adjacent cell the head dies beyond: the
        // tick terminates first and the capture must not be attributed.
        let mut session = test_session();
        session.world.pos = Pos::new(9, 5);
        session.world.apple = Pos::new(9, 5);

        let report = session.step().unwrap().unwrap();

        assert_eq!(report.outcome, TickOutcome::OutOfBounds);
        assert_eq!(report.reward, -10.0);
    }
}
