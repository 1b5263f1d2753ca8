/// A cell on the grid. Compared by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    /// Unit delta (dx, dy) for one tick of movement.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    /// Decode a discrete policy action. The order is fixed: 0 turns to
    /// (-1,0), 1 to (0,-1), 2 to (1,0), 3 to (0,1). Anything else means
    /// "keep the current heading this tick".
    pub fn from_action(action: usize) -> Option<Dir> {
        match action {
            0 => Some(Dir::Left),
            1 => Some(Dir::Up),
            2 => Some(Dir::Right),
            3 => Some(Dir::Down),
            _ => None,
        }
    }

    /// Inverse of [`Dir::from_action`].
    pub fn action_index(self) -> usize {
        match self {
            Dir::Left => 0,
            Dir::Up => 1,
            Dir::Right => 2,
            Dir::Down => 3,
        }
    }
}
