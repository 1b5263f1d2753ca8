use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::Config;
use crate::pos::{Dir, Pos};

/// What a single tick produced. At most one tag per tick; a capture is
/// non-terminal and never coincides with a collision, because collisions are
/// checked against the pre-capture trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Plain move, nothing of note.
    Moved,
    /// The head landed on the apple: the trail will grow and the apple moved.
    AppleCaptured,
    /// The head left the grid. The trail was not mutated.
    OutOfBounds,
    /// The head ran into the trail.
    SelfCollision,
}

impl TickOutcome {
    pub fn is_terminal(self) -> bool {
        matches!(self, TickOutcome::OutOfBounds | TickOutcome::SelfCollision)
    }
}

/// Spatial state of the simulation: the grid, the trail, the heading, and
/// the apple. Evolves one tick at a time and never resets itself; terminal
/// outcomes are returned to the caller, who decides what to do with them.
pub struct GridWorld {
    pub width: i32,
    pub height: i32,
    /// Occupied cells, oldest at the front, head at the back.
    pub trail: VecDeque<Pos>,
    pub dir: Dir,
    /// Current head position. Tracked outside the trail so a boundary
    /// violation can be detected before the trail is touched.
    pub pos: Pos,
    pub apple: Pos,
    /// The trail is trimmed to this length each tick.
    pub target_len: usize,
    initial_tail: usize,
    rng: SmallRng,
}

impl GridWorld {
    pub fn new(config: &Config) -> Self {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    /// Like [`GridWorld::new`] with a caller-supplied RNG, so apple placement
    /// can be made deterministic.
    pub fn with_rng(config: &Config, rng: SmallRng) -> Self {
        let mut world = Self {
            width: config.grid_width,
            height: config.grid_height,
            trail: VecDeque::new(),
            dir: Dir::Right,
            pos: Pos::new(config.grid_width / 2, config.grid_height / 2),
            apple: Pos::new(0, 0),
            target_len: config.initial_tail,
            initial_tail: config.initial_tail,
            rng,
        };
        world.place_apple();
        world
    }

    pub fn head(&self) -> Pos {
        self.pos
    }

    /// Advance the world by one tick.
    ///
    /// `command` is the externally chosen direction for this tick, if any; a
    /// command that exactly reverses the current heading is ignored so the
    /// head cannot step back onto its own neck.
    pub fn tick(&mut self, command: Option<Dir>) -> TickOutcome {
        if let Some(dir) = command {
            if dir != self.dir.opposite() {
                self.dir = dir;
            }
        }

        let (dx, dy) = self.dir.delta();
        self.pos = Pos::new(self.pos.x + dx, self.pos.y + dy);

        if !self.in_bounds(self.pos) {
            return TickOutcome::OutOfBounds;
        }

        self.trail.push_back(self.pos);
        while self.trail.len() > self.target_len {
            self.trail.pop_front();
        }

        // Everything but the entry just pushed.
        let head = self.pos;
        if self
            .trail
            .iter()
            .take(self.trail.len() - 1)
            .any(|&cell| cell == head)
        {
            return TickOutcome::SelfCollision;
        }

        if head == self.apple {
            self.target_len += 1;
            self.place_apple();
            return TickOutcome::AppleCaptured;
        }

        TickOutcome::Moved
    }

    /// Flattened row-major scan of the grid (y outer, x inner): apple cell
    /// 1.0, trail cell -1.0, empty 0.0. The apple wins when it sits on the
    /// trail. Length is always `width * height`; this is the observation a
    /// policy receives.
    pub fn sample_grid_state(&self) -> Vec<f32> {
        let mut cells = Vec::with_capacity((self.width * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                cells.push(self.cell_value(Pos::new(x, y)));
            }
        }
        cells
    }

    fn cell_value(&self, p: Pos) -> f32 {
        if p == self.apple {
            1.0
        } else if self.trail.contains(&p) {
            -1.0
        } else {
            0.0
        }
    }

    /// Resample the apple uniformly over the whole grid. Cells under the
    /// trail are not excluded: an apple may spawn beneath the snake and stay
    /// uncapturable until the trail vacates the cell.
    pub fn place_apple(&mut self) {
        self.apple = Pos::new(
            self.rng.gen_range(0..self.width),
            self.rng.gen_range(0..self.height),
        );
    }

    /// Start a fresh episode: default heading, head recentered, trail
    /// emptied. The apple and the growth target are left alone.
    pub fn reset(&mut self) {
        self.dir = Dir::Right;
        self.pos = Pos::new(self.width / 2, self.height / 2);
        self.trail.clear();
    }

    /// Drop the growth target back to the initial trail length.
    pub fn reset_growth(&mut self) {
        self.target_len = self.initial_tail;
    }

    fn in_bounds(&self, p: Pos) -> bool {
        p.x >= 0 && p.x < self.width && p.y >= 0 && p.y < self.height
    }
}
