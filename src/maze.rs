use std::collections::VecDeque;
use std::fmt;

use log::{debug, warn};
use thiserror::Error;

use crate::rng::SeededRng;

pub const DEFAULT_WIDTH: usize = 25;
pub const DEFAULT_HEIGHT: usize = 25;
pub const MIN_SIDE: usize = 5;
pub const START: Pos = Pos { x: 1, y: 1 };

const BASE_DIFFICULTY: f64 = 0.65;
const DIFFICULTY_SPAN: f64 = 0.3;
const SEED_LEN_CAP: usize = 100;
const PASSAGE_DIVISOR: usize = 10;
const WALL_DIVISOR: usize = 20;
const PASSAGE_MIN_WALLS: usize = 5;
const WALL_MAX_WALLS: usize = 5;
const WALL_CHANCE_SCALE: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Wall,
    Path,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub const CARVE_ORDER: [Dir; 4] = [Dir::Up, Dir::Right, Dir::Down, Dir::Left];

    pub fn delta(self) -> (isize, isize) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MazeError {
    #[error("maze must be at least 5x5 cells, got {width}x{height}")]
    TooSmall { width: usize, height: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn filled(width: usize, height: usize, cell: Cell) -> Self {
        Self {
            width,
            height,
            cells: vec![vec![cell; width]; height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.cells
    }

    pub fn get(&self, pos: Pos) -> Cell {
        self.cells[pos.y][pos.x]
    }

    pub fn set(&mut self, pos: Pos, cell: Cell) {
        self.cells[pos.y][pos.x] = cell;
    }

    pub fn is_path(&self, pos: Pos) -> bool {
        self.get(pos) == Cell::Path
    }

    pub fn pos_at(&self, x: isize, y: isize) -> Option<Pos> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(Pos { x, y })
    }

    pub fn is_interior(&self, x: isize, y: isize) -> bool {
        x > 0 && y > 0 && x < self.width as isize - 1 && y < self.height as isize - 1
    }

    pub fn step(&self, pos: Pos, dir: Dir) -> Option<Pos> {
        let (dx, dy) = dir.delta();
        self.pos_at(pos.x as isize + dx, pos.y as isize + dy)
    }

    /// Cell one step away, with the outside of the grid reading as wall.
    fn cell_toward(&self, pos: Pos, dir: Dir) -> Cell {
        self.step(pos, dir).map_or(Cell::Wall, |p| self.get(p))
    }

    pub fn count_wall_neighbors(&self, pos: Pos) -> usize {
        let mut count = 0;
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if let Some(n) = self.pos_at(pos.x as isize + dx, pos.y as isize + dy) {
                    if self.get(n) == Cell::Wall {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    pub fn path_count(&self) -> usize {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .filter(|&&cell| cell == Cell::Path)
            .count()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Maze {
    pub grid: Grid,
    pub start: Pos,
    pub exit: Pos,
    pub difficulty: f64,
    /// Whether the straight-line fallback had to be carved.
    pub repaired: bool,
}

impl Maze {
    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }
}

impl fmt::Display for Maze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.grid.rows().iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let pos = Pos { x, y };
                let ch = if pos == self.start {
                    'S'
                } else if pos == self.exit {
                    'E'
                } else if *cell == Cell::Wall {
                    '#'
                } else {
                    ' '
                };
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub fn exit_for(width: usize, height: usize) -> Pos {
    Pos {
        x: width - 2,
        y: height - 2,
    }
}

pub fn difficulty_for(seed: &str) -> f64 {
    let len = seed.chars().count().min(SEED_LEN_CAP);
    BASE_DIFFICULTY + (len as f64 / SEED_LEN_CAP as f64) * DIFFICULTY_SPAN
}

pub fn generate(seed: &str, width: usize, height: usize) -> Result<Maze, MazeError> {
    if width < MIN_SIDE || height < MIN_SIDE {
        return Err(MazeError::TooSmall { width, height });
    }

    let mut rng = SeededRng::from_seed(seed);
    let difficulty = difficulty_for(seed);
    let start = START;
    let exit = exit_for(width, height);

    let mut grid = Grid::filled(width, height, Cell::Wall);
    carve(&mut grid, start, &mut rng);
    inject_passages(&mut grid, &mut rng, difficulty);
    inject_walls(&mut grid, &mut rng, difficulty);
    open_endpoints(&mut grid, start, exit);
    let repaired = ensure_path(&mut grid, start, exit);

    debug!(
        "generated {}x{} maze: seed_len={} difficulty={:.3} paths={} repaired={}",
        width,
        height,
        seed.chars().count(),
        difficulty,
        grid.path_count(),
        repaired
    );

    Ok(Maze {
        grid,
        start,
        exit,
        difficulty,
        repaired,
    })
}

struct CarveFrame {
    pos: Pos,
    dirs: [Dir; 4],
    next: usize,
}

impl CarveFrame {
    fn enter(pos: Pos, rng: &mut SeededRng) -> Self {
        let mut dirs = Dir::CARVE_ORDER;
        rng.shuffle(&mut dirs);
        Self { pos, dirs, next: 0 }
    }
}

/// Depth-first carve in two-cell strides, starting at `origin`.
pub fn carve(grid: &mut Grid, origin: Pos, rng: &mut SeededRng) {
    grid.set(origin, Cell::Path);
    let mut stack = vec![CarveFrame::enter(origin, rng)];

    while let Some(frame) = stack.last_mut() {
        if frame.next == frame.dirs.len() {
            stack.pop();
            continue;
        }
        let dir = frame.dirs[frame.next];
        frame.next += 1;
        let pos = frame.pos;

        let (dx, dy) = dir.delta();
        let tx = pos.x as isize + dx * 2;
        let ty = pos.y as isize + dy * 2;
        if !grid.is_interior(tx, ty) {
            continue;
        }
        let target = Pos {
            x: tx as usize,
            y: ty as usize,
        };
        if grid.get(target) != Cell::Wall {
            continue;
        }

        let between = Pos {
            x: (pos.x as isize + dx) as usize,
            y: (pos.y as isize + dy) as usize,
        };
        grid.set(between, Cell::Path);
        grid.set(target, Cell::Path);
        stack.push(CarveFrame::enter(target, rng));
    }
}

// x is drawn before y.
fn random_inner_cell(grid: &Grid, rng: &mut SeededRng) -> Pos {
    let x = rng.below(grid.width() - 4) + 2;
    let y = rng.below(grid.height() - 4) + 2;
    Pos { x, y }
}

pub fn inject_passages(grid: &mut Grid, rng: &mut SeededRng, difficulty: f64) {
    let attempts = grid.width() * grid.height() / PASSAGE_DIVISOR;
    for _ in 0..attempts {
        let pos = random_inner_cell(grid, rng);
        if grid.count_wall_neighbors(pos) >= PASSAGE_MIN_WALLS && rng.next_f64() < difficulty {
            grid.set(pos, Cell::Path);
        }
    }
}

pub fn inject_walls(grid: &mut Grid, rng: &mut SeededRng, difficulty: f64) {
    let attempts = grid.width() * grid.height() / WALL_DIVISOR;
    for _ in 0..attempts {
        let pos = random_inner_cell(grid, rng);
        if grid.is_path(pos)
            && grid.count_wall_neighbors(pos) <= WALL_MAX_WALLS
            && rng.next_f64() < difficulty * WALL_CHANCE_SCALE
            && !is_path_critical(grid, pos)
        {
            grid.set(pos, Cell::Wall);
        }
    }
}

/// A cell is critical when it is the only link in a one-wide corridor.
pub fn is_path_critical(grid: &Grid, pos: Pos) -> bool {
    let up = grid.cell_toward(pos, Dir::Up);
    let down = grid.cell_toward(pos, Dir::Down);
    let left = grid.cell_toward(pos, Dir::Left);
    let right = grid.cell_toward(pos, Dir::Right);

    let horizontal =
        left == Cell::Path && right == Cell::Path && up == Cell::Wall && down == Cell::Wall;
    let vertical =
        up == Cell::Path && down == Cell::Path && left == Cell::Wall && right == Cell::Wall;
    horizontal || vertical
}

/// Opens both endpoints and their 3x3 surroundings, clipped to the interior.
pub fn open_endpoints(grid: &mut Grid, start: Pos, exit: Pos) {
    for center in [start, exit] {
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                let x = center.x as isize + dx;
                let y = center.y as isize + dy;
                if grid.is_interior(x, y) {
                    grid.set(
                        Pos {
                            x: x as usize,
                            y: y as usize,
                        },
                        Cell::Path,
                    );
                }
            }
        }
    }
}

pub fn flood(grid: &Grid, start: Pos) -> Vec<Vec<bool>> {
    let mut seen = vec![vec![false; grid.width()]; grid.height()];
    if !grid.is_path(start) {
        return seen;
    }
    let mut q = VecDeque::new();
    seen[start.y][start.x] = true;
    q.push_back(start);
    while let Some(pos) = q.pop_front() {
        for dir in [Dir::Up, Dir::Right, Dir::Down, Dir::Left] {
            let Some(next) = grid.step(pos, dir) else {
                continue;
            };
            if seen[next.y][next.x] || !grid.is_path(next) {
                continue;
            }
            seen[next.y][next.x] = true;
            q.push_back(next);
        }
    }
    seen
}

pub fn is_reachable(grid: &Grid, from: Pos, to: Pos) -> bool {
    flood(grid, from)[to.y][to.x]
}

/// Carves an orthogonal walk from `from` to `to`, always stepping along the
/// axis with more distance left (x on ties). Returns the number of steps.
pub fn repair_path(grid: &mut Grid, from: Pos, to: Pos) -> usize {
    let mut pos = from;
    let mut steps = 0;
    grid.set(pos, Cell::Path);
    while pos != to {
        if pos.x.abs_diff(to.x) >= pos.y.abs_diff(to.y) {
            pos.x = if to.x > pos.x { pos.x + 1 } else { pos.x - 1 };
        } else {
            pos.y = if to.y > pos.y { pos.y + 1 } else { pos.y - 1 };
        }
        grid.set(pos, Cell::Path);
        steps += 1;
    }
    steps
}

pub fn ensure_path(grid: &mut Grid, start: Pos, exit: Pos) -> bool {
    if is_reachable(grid, start, exit) {
        return false;
    }
    let steps = repair_path(grid, start, exit);
    warn!(
        "exit ({}, {}) unreachable after generation; carved {} step fallback route",
        exit.x, exit.y, steps
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEEDS: [&str; 6] = [
        "A",
        "AB",
        "aHR0cHM6Ly9leGFtcGxlLmNvbQ==",
        "aHR0cHM6Ly93d3cueW91dHViZS5jb20vd2F0Y2g/dj1kUXc0dzlXZ1hjUQ==",
        "bWFpbHRvOmZyaWVuZEBleGFtcGxlLm9yZw",
        "Zm9v",
    ];

    fn open_cells(grid: &Grid) -> Vec<Pos> {
        let mut cells = Vec::new();
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let pos = Pos { x, y };
                if grid.is_path(pos) {
                    cells.push(pos);
                }
            }
        }
        cells
    }

    fn recursive_carve(grid: &mut Grid, pos: Pos, rng: &mut SeededRng) {
        grid.set(pos, Cell::Path);
        let mut dirs = Dir::CARVE_ORDER;
        rng.shuffle(&mut dirs);
        for dir in dirs {
            let (dx, dy) = dir.delta();
            let tx = pos.x as isize + dx * 2;
            let ty = pos.y as isize + dy * 2;
            if grid.is_interior(tx, ty) {
                let target = Pos {
                    x: tx as usize,
                    y: ty as usize,
                };
                if grid.get(target) == Cell::Wall {
                    grid.set(
                        Pos {
                            x: (pos.x as isize + dx) as usize,
                            y: (pos.y as isize + dy) as usize,
                        },
                        Cell::Path,
                    );
                    recursive_carve(grid, target, rng);
                }
            }
        }
    }

    #[test]
    fn difficulty_bounds() {
        assert!((difficulty_for("A") - 0.653).abs() < 1e-12);
        assert!((difficulty_for(&"x".repeat(100)) - 0.95).abs() < 1e-12);
        assert_eq!(difficulty_for(&"x".repeat(100)), difficulty_for(&"x".repeat(400)));
        assert_eq!(difficulty_for(""), 0.65);
    }

    #[test]
    fn difficulty_is_monotone() {
        let mut last = difficulty_for("");
        for len in 1..=150 {
            let d = difficulty_for(&"q".repeat(len));
            assert!(d >= last, "difficulty dropped at length {len}");
            assert!((0.65..=0.95).contains(&d));
            last = d;
        }
    }

    #[test]
    fn rejects_tiny_grids() {
        assert_eq!(
            generate("AB", 4, 25),
            Err(MazeError::TooSmall {
                width: 4,
                height: 25
            })
        );
        assert!(generate("AB", 25, 3).is_err());
        assert!(generate("AB", 5, 5).is_ok());
    }

    #[test]
    fn generation_is_deterministic() {
        for seed in SEEDS {
            let a = generate(seed, DEFAULT_WIDTH, DEFAULT_HEIGHT).unwrap();
            let b = generate(seed, DEFAULT_WIDTH, DEFAULT_HEIGHT).unwrap();
            assert_eq!(a.grid, b.grid, "seed {seed}");
            assert_eq!(a.repaired, b.repaired);
        }
    }

    #[test]
    fn exit_is_reachable() {
        for seed in SEEDS {
            for (w, h) in [(25, 25), (5, 5), (6, 9), (31, 21), (40, 12)] {
                let maze = generate(seed, w, h).unwrap();
                assert!(
                    is_reachable(&maze.grid, maze.start, maze.exit),
                    "seed {seed} at {w}x{h}"
                );
            }
        }
    }

    #[test]
    fn endpoints_and_surroundings_are_open() {
        for seed in SEEDS {
            let maze = generate(seed, DEFAULT_WIDTH, DEFAULT_HEIGHT).unwrap();
            assert_eq!(maze.start, Pos { x: 1, y: 1 });
            assert_eq!(maze.exit, Pos { x: 23, y: 23 });
            for center in [maze.start, maze.exit] {
                for dy in -1isize..=1 {
                    for dx in -1isize..=1 {
                        let x = center.x as isize + dx;
                        let y = center.y as isize + dy;
                        if maze.grid.is_interior(x, y) {
                            let pos = maze.grid.pos_at(x, y).unwrap();
                            assert!(maze.grid.is_path(pos), "{pos:?} closed for {seed}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn outer_ring_stays_wall() {
        for seed in SEEDS {
            let maze = generate(seed, 17, 11).unwrap();
            let grid = &maze.grid;
            for x in 0..grid.width() {
                assert_eq!(grid.get(Pos { x, y: 0 }), Cell::Wall);
                assert_eq!(grid.get(Pos { x, y: grid.height() - 1 }), Cell::Wall);
            }
            for y in 0..grid.height() {
                assert_eq!(grid.get(Pos { x: 0, y }), Cell::Wall);
                assert_eq!(grid.get(Pos { x: grid.width() - 1, y }), Cell::Wall);
            }
        }
    }

    #[test]
    fn carve_spans_the_odd_lattice() {
        let mut grid = Grid::filled(25, 25, Cell::Wall);
        let mut rng = SeededRng::from_seed("AB");
        carve(&mut grid, Pos { x: 1, y: 1 }, &mut rng);

        let mut lattice = 0;
        for y in (1..24).step_by(2) {
            for x in (1..24).step_by(2) {
                assert!(grid.is_path(Pos { x, y }));
                lattice += 1;
            }
        }
        // A tree over n nodes has n - 1 corridor cells between them.
        assert_eq!(grid.path_count(), lattice * 2 - 1);
        assert!(is_reachable(&grid, Pos { x: 1, y: 1 }, Pos { x: 23, y: 23 }));
    }

    #[test]
    fn explicit_stack_matches_recursion() {
        for seed in SEEDS {
            for (w, h) in [(25, 25), (9, 15), (10, 10)] {
                let mut a = Grid::filled(w, h, Cell::Wall);
                let mut b = Grid::filled(w, h, Cell::Wall);
                let mut rng_a = SeededRng::from_seed(seed);
                let mut rng_b = SeededRng::from_seed(seed);
                carve(&mut a, Pos { x: 1, y: 1 }, &mut rng_a);
                recursive_carve(&mut b, Pos { x: 1, y: 1 }, &mut rng_b);
                assert_eq!(a, b, "seed {seed} at {w}x{h}");
                assert_eq!(rng_a, rng_b);
            }
        }
    }

    #[test]
    fn wall_neighbors_ignore_outside() {
        let grid = Grid::filled(5, 5, Cell::Wall);
        assert_eq!(grid.count_wall_neighbors(Pos { x: 0, y: 0 }), 3);
        assert_eq!(grid.count_wall_neighbors(Pos { x: 2, y: 0 }), 5);
        assert_eq!(grid.count_wall_neighbors(Pos { x: 2, y: 2 }), 8);
    }

    #[test]
    fn corridor_cells_are_critical() {
        let mut grid = Grid::filled(5, 5, Cell::Wall);
        for x in 1..4 {
            grid.set(Pos { x, y: 2 }, Cell::Path);
        }
        assert!(is_path_critical(&grid, Pos { x: 2, y: 2 }));

        let mut grid = Grid::filled(5, 5, Cell::Wall);
        for y in 1..4 {
            grid.set(Pos { x: 2, y }, Cell::Path);
        }
        assert!(is_path_critical(&grid, Pos { x: 2, y: 2 }));

        // Opening a side turns the corridor into a junction.
        grid.set(Pos { x: 1, y: 2 }, Cell::Path);
        assert!(!is_path_critical(&grid, Pos { x: 2, y: 2 }));
    }

    #[test]
    fn dead_end_is_not_critical() {
        let mut grid = Grid::filled(5, 5, Cell::Wall);
        grid.set(Pos { x: 1, y: 2 }, Cell::Path);
        grid.set(Pos { x: 2, y: 2 }, Cell::Path);
        assert!(!is_path_critical(&grid, Pos { x: 2, y: 2 }));
    }

    #[test]
    fn repair_carves_taxicab_route() {
        let mut grid = Grid::filled(25, 25, Cell::Wall);
        let start = Pos { x: 1, y: 1 };
        let exit = Pos { x: 23, y: 23 };
        grid.set(start, Cell::Path);
        grid.set(exit, Cell::Path);
        assert!(!is_reachable(&grid, start, exit));

        let steps = repair_path(&mut grid, start, exit);
        assert_eq!(steps, 22 + 22);
        assert_eq!(grid.path_count(), steps + 1);
        assert!(is_reachable(&grid, start, exit));

        // Every open cell sits on a monotone route: its x and y never exceed
        // the next cell's along the walk.
        let mut cells = open_cells(&grid);
        cells.sort_by_key(|p| p.x + p.y);
        for pair in cells.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert_eq!(a.x.abs_diff(b.x) + a.y.abs_diff(b.y), 1);
            assert!(b.x >= a.x && b.y >= a.y);
        }
    }

    #[test]
    fn repair_handles_uneven_and_reversed_spans() {
        let mut grid = Grid::filled(12, 7, Cell::Wall);
        let from = Pos { x: 10, y: 5 };
        let to = Pos { x: 1, y: 1 };
        let steps = repair_path(&mut grid, from, to);
        assert_eq!(steps, 9 + 4);
        assert_eq!(grid.path_count(), 14);
        assert!(is_reachable(&grid, from, to));
    }

    #[test]
    fn ensure_path_leaves_connected_grid_alone() {
        let mut grid = Grid::filled(7, 7, Cell::Wall);
        let start = Pos { x: 1, y: 1 };
        let exit = Pos { x: 5, y: 5 };
        repair_path(&mut grid, start, exit);
        let before = grid.clone();
        assert!(!ensure_path(&mut grid, start, exit));
        assert_eq!(grid, before);
    }

    #[test]
    fn ensure_path_repairs_disconnected_grid() {
        let mut grid = Grid::filled(9, 9, Cell::Wall);
        let start = Pos { x: 1, y: 1 };
        let exit = Pos { x: 7, y: 7 };
        open_endpoints(&mut grid, start, exit);
        assert!(ensure_path(&mut grid, start, exit));
        assert!(is_reachable(&grid, start, exit));
    }

    #[test]
    fn open_endpoints_clips_to_interior() {
        let mut grid = Grid::filled(5, 5, Cell::Wall);
        open_endpoints(&mut grid, Pos { x: 1, y: 1 }, Pos { x: 3, y: 3 });
        // Four cells around each endpoint, sharing (2, 2).
        assert_eq!(grid.path_count(), 7);
        assert_eq!(grid.get(Pos { x: 1, y: 3 }), Cell::Wall);
        assert_eq!(grid.get(Pos { x: 3, y: 1 }), Cell::Wall);
        assert_eq!(grid.get(Pos { x: 0, y: 0 }), Cell::Wall);
        assert_eq!(grid.get(Pos { x: 4, y: 4 }), Cell::Wall);
    }

    #[test]
    fn golden_maze_for_ab() {
        let maze = generate("AB", 11, 11).unwrap();
        let expected = [
            "###########",
            "#S        #",
            "#  #### ###",
            "#     #   #",
            "##### ### #",
            "#   #   # #",
            "### ### # #",
            "#     # # #",
            "# #####   #",
            "#        E#",
            "###########",
        ];
        let text = maze.to_string();
        assert_eq!(text.lines().collect::<Vec<_>>(), expected);
        assert!(!maze.repaired);

        let full = generate("AB", DEFAULT_WIDTH, DEFAULT_HEIGHT).unwrap();
        assert_eq!(full.grid.path_count(), 291);
    }

    #[test]
    fn display_marks_endpoints() {
        let maze = generate("AB", 7, 7).unwrap();
        let text = maze.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines.iter().all(|l| l.chars().count() == 7));
        assert_eq!(lines[1].chars().nth(1), Some('S'));
        assert_eq!(lines[5].chars().nth(5), Some('E'));
        assert_eq!(lines[0], "#######");
    }
}
