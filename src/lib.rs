//! A maze that hides a link: the base64 text seeds the maze, and solving it
//! reveals the decoded link.

pub mod celebration;
pub mod config;
pub mod game;
pub mod link;
pub mod maze;
pub mod palette;
pub mod rng;

pub use link::{DecodeError, LinkPayload};
pub use maze::{generate, Cell, Dir, Grid, Maze, MazeError, Pos};
pub use rng::SeededRng;
