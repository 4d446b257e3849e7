use crate::maze::{Dir, Maze, Pos};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Blocked,
    Moved,
    Won,
}

pub struct Game {
    pub maze: Maze,
    pub player: Pos,
    pub moves: u32,
    completed: bool,
}

impl Game {
    pub fn new(maze: Maze) -> Self {
        let player = maze.start;
        Self {
            maze,
            player,
            moves: 0,
            completed: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn can_move(&self, dir: Dir) -> bool {
        self.maze
            .grid
            .step(self.player, dir)
            .is_some_and(|next| self.maze.grid.is_path(next))
    }

    /// Steps one cell; the exit locks further movement.
    pub fn try_move(&mut self, dir: Dir) -> MoveOutcome {
        if self.completed || !self.can_move(dir) {
            return MoveOutcome::Blocked;
        }
        if let Some(next) = self.maze.grid.step(self.player, dir) {
            self.player = next;
            self.moves += 1;
        }
        if self.player == self.maze.exit {
            self.completed = true;
            return MoveOutcome::Won;
        }
        MoveOutcome::Moved
    }
}
