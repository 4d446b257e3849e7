use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{ExecutableCommand, QueueableCommand};
use log::info;
use maze_reveal::celebration::{Celebration, FRAME_MS};
use maze_reveal::config::Settings;
use maze_reveal::game::{Game, MoveOutcome};
use maze_reveal::link::{self, LinkPayload};
use maze_reveal::maze::{self, Cell as Tile, Dir, Pos};
use maze_reveal::palette::{Hsl, Palette};
use std::io::{self, Stdout, Write};
use std::thread;
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

const CELL_W: usize = 2;
const INPUT_HOLD_MS: u64 = 160;
const WALL_COLOR: Color = Color::Rgb { r: 51, g: 51, b: 51 };
const EXIT_COLOR: Color = Color::Rgb { r: 76, g: 175, b: 80 };
const PLAYER_COLOR: Color = Color::Rgb { r: 233, g: 30, b: 99 };

/// Hide a link behind a maze generated from its base64 text.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solve the maze for a link and reveal it.
    Play {
        /// Base64 link, `?link=...` query, or full URL carrying a `link` parameter.
        link: String,
        #[command(flatten)]
        size: SizeArgs,
    },
    /// Print the base64 form of a link and the query to share it with.
    Encode {
        /// Link to hide.
        text: String,
    },
    /// Print the maze for a link without playing it.
    Print {
        /// Base64 link, `?link=...` query, or full URL carrying a `link` parameter.
        link: String,
        #[command(flatten)]
        size: SizeArgs,
    },
}

#[derive(Debug, Args)]
struct SizeArgs {
    /// Maze width in cells (5 to 255).
    #[arg(long, value_parser = clap::value_parser!(u16).range(5..=255))]
    width: Option<u16>,
    /// Maze height in cells (5 to 255).
    #[arg(long, value_parser = clap::value_parser!(u16).range(5..=255))]
    height: Option<u16>,
}

impl SizeArgs {
    fn apply(&self, settings: Settings) -> Settings {
        settings.with_size(self.width.map(usize::from), self.height.map(usize::from))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Glyph {
    Player,
    Exit,
    Wall,
    Floor,
    Spark(u8),
}

#[derive(Clone, Copy, PartialEq)]
struct Cell {
    glyph: Glyph,
    color: Color,
}

struct Renderer {
    last: Vec<Cell>,
    last_hud: String,
    needs_full: bool,
    origin_x: u16,
    origin_y: u16,
    floor: Color,
    panel: Color,
}

impl Renderer {
    fn new(width: usize, height: usize, palette: &Palette) -> Self {
        let rgb = |hsl: Hsl| {
            let (r, g, b) = hsl.to_rgb();
            Color::Rgb { r, g, b }
        };
        Self {
            last: vec![
                Cell {
                    glyph: Glyph::Floor,
                    color: Color::Reset,
                };
                width * height
            ],
            last_hud: String::new(),
            needs_full: true,
            origin_x: 0,
            origin_y: 1,
            floor: rgb(palette.background),
            panel: rgb(palette.container),
        }
    }
}

// Terminals report key repeats but never releases.
#[derive(Default)]
struct HeldInput {
    pending: Option<(Dir, Instant)>,
    last_move: Option<Instant>,
}

impl HeldInput {
    fn press(&mut self, dir: Dir, at: Instant) {
        self.pending = Some((dir, at));
    }

    fn take_ready(&mut self, now: Instant, move_every: Duration) -> Option<Dir> {
        let (dir, at) = self.pending?;
        if now.duration_since(at) > Duration::from_millis(INPUT_HOLD_MS) {
            self.pending = None;
            return None;
        }
        if let Some(last) = self.last_move {
            if now.duration_since(last) < move_every {
                return None;
            }
        }
        self.pending = None;
        self.last_move = Some(now);
        Some(dir)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match Cli::parse().command {
        Command::Encode { text } => {
            println!("{}", link::encode(&text));
            println!("{}", link::share_query(&text));
            Ok(())
        }
        Command::Print { link: input, size } => {
            let payload = link::resolve(&input)?;
            let settings = size.apply(Settings::from_env());
            let maze = maze::generate(&payload.encoded, settings.width, settings.height)?;
            print!("{maze}");
            println!(
                "difficulty: {:.3}  repaired: {}  background: {}",
                maze.difficulty,
                maze.repaired,
                Palette::from_seed(&payload.encoded).gradient_css()
            );
            Ok(())
        }
        Command::Play { link: input, size } => {
            let payload = link::resolve(&input)?;
            let settings = size.apply(Settings::from_env());
            play(&payload, &settings)
        }
    }
}

fn play(payload: &LinkPayload, settings: &Settings) -> Result<()> {
    let maze = maze::generate(&payload.encoded, settings.width, settings.height)?;
    info!(
        "playing {}x{} maze, difficulty {:.3}",
        maze.width(),
        maze.height(),
        maze.difficulty
    );

    let mut stdout = io::stdout();
    terminal::enable_raw_mode().context("failed to enable raw mode")?;
    let result = enter_screen(&mut stdout)
        .map_err(anyhow::Error::from)
        .and_then(|()| run(&mut stdout, settings, payload, Game::new(maze)));

    let restored = restore_terminal(&mut stdout, terminal::disable_raw_mode);
    result?;
    restored.context("failed to restore the terminal")
}

fn enter_screen(out: &mut impl Write) -> io::Result<()> {
    out.execute(EnterAlternateScreen)?;
    out.execute(Hide)?;
    Ok(())
}

/// Runs every teardown step even if an earlier one fails; the first error wins.
fn restore_terminal(
    out: &mut impl Write,
    disable_raw: impl FnOnce() -> io::Result<()>,
) -> io::Result<()> {
    let shown = out.execute(Show).map(|_| ());
    let left = out.execute(LeaveAlternateScreen).map(|_| ());
    let raw = disable_raw();
    shown.and(left).and(raw)
}

fn run(
    stdout: &mut Stdout,
    settings: &Settings,
    payload: &LinkPayload,
    mut game: Game,
) -> Result<()> {
    let mut rng = rand::thread_rng();
    let palette = Palette::from_seed(&payload.encoded);
    let mut renderer = Renderer::new(game.maze.width(), game.maze.height(), &palette);
    let mut input = HeldInput::default();
    let mut show: Option<Celebration> = None;
    let mut last_frame = Instant::now();
    let move_every = Duration::from_millis(settings.move_ms);
    let particle_step = Duration::from_millis(FRAME_MS);
    let frame_time = Duration::from_micros(1_000_000 / settings.render_fps.max(1));

    loop {
        let frame_start = Instant::now();
        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                    continue;
                }
                if is_quit(&key) {
                    return Ok(());
                }
                if let Some(dir) = dir_for_key(key.code) {
                    input.press(dir, Instant::now());
                }
            }
        }

        let now = Instant::now();
        if show.is_none() {
            if let Some(dir) = input.take_ready(now, move_every) {
                if game.try_move(dir) == MoveOutcome::Won {
                    info!("maze solved in {} moves", game.moves);
                    // Terminal bell as the success cue.
                    stdout.queue(Print('\x07'))?;
                    show = Some(Celebration::burst_at(game.maze.exit, &mut rng));
                    last_frame = now;
                }
            }
        }
        if let Some(celebration) = show.as_mut() {
            if now.duration_since(last_frame) >= particle_step {
                celebration.step();
                last_frame = now;
            }
        }

        if show.as_ref().is_some_and(Celebration::is_finished) {
            render(stdout, &game, None, &mut renderer)?;
            return render_reveal(stdout, &game, payload);
        }
        render(stdout, &game, show.as_ref(), &mut renderer)?;

        let elapsed = frame_start.elapsed();
        if elapsed < frame_time {
            thread::sleep(frame_time - elapsed);
        }
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn dir_for_key(code: KeyCode) -> Option<Dir> {
    match code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('k') => Some(Dir::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('j') => Some(Dir::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('h') => Some(Dir::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('l') => Some(Dir::Right),
        _ => None,
    }
}

fn render(
    stdout: &mut Stdout,
    game: &Game,
    show: Option<&Celebration>,
    renderer: &mut Renderer,
) -> io::Result<()> {
    let width = game.maze.width();
    let height = game.maze.height();
    let needed_h = (height + 2) as u16;
    let needed_w = (width * CELL_W) as u16;

    stdout.queue(MoveTo(0, 0))?;

    let (term_w, term_h) = terminal::size()?;
    if term_w < needed_w || term_h < needed_h {
        stdout.queue(Clear(ClearType::All))?;
        let msg = format!(
            "Terminal too small. Need at least {}x{} (cols x rows). Current: {}x{}.",
            needed_w, needed_h, term_w, term_h
        );
        stdout.queue(Print(msg))?;
        stdout.flush()?;
        renderer.needs_full = true;
        return Ok(());
    }

    let origin_x = (term_w - needed_w) / 2;
    let origin_y = (term_h - needed_h) / 2 + 1;
    if origin_x != renderer.origin_x || origin_y != renderer.origin_y {
        renderer.origin_x = origin_x;
        renderer.origin_y = origin_y;
        renderer.needs_full = true;
    }
    if renderer.needs_full {
        stdout.queue(Clear(ClearType::All))?;
    }

    let hud = if game.is_completed() {
        format!("Solved in {} moves!  (q to quit)", game.moves)
    } else {
        format!("Moves: {}  (arrows/wasd/hjkl to move, q to quit)", game.moves)
    };
    if renderer.needs_full || hud != renderer.last_hud {
        stdout.queue(MoveTo(renderer.origin_x, renderer.origin_y - 1))?;
        stdout.queue(Clear(ClearType::CurrentLine))?;
        stdout.queue(SetBackgroundColor(renderer.panel))?;
        stdout.queue(SetForegroundColor(WALL_COLOR))?;
        stdout.queue(Print(&hud))?;
        stdout.queue(ResetColor)?;
        renderer.last_hud = hud;
    }

    let sparks = spark_cells(width, height, show);
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let cell = sparks[idx].unwrap_or_else(|| cell_for(game, Pos { x, y }));
            if renderer.needs_full || cell != renderer.last[idx] {
                renderer.last[idx] = cell;
                draw_cell(stdout, renderer, x, y, cell)?;
            }
        }
    }
    renderer.needs_full = false;

    stdout.flush()?;
    Ok(())
}

fn spark_cells(width: usize, height: usize, show: Option<&Celebration>) -> Vec<Option<Cell>> {
    let mut cells = vec![None; width * height];
    let Some(show) = show else {
        return cells;
    };
    for p in show.particles() {
        let Some((x, y)) = p.cell() else {
            continue;
        };
        if x < 0 || y < 0 || x as usize >= width || y as usize >= height {
            continue;
        }
        let hsl = Hsl {
            hue: p.hue as u32 % 360,
            saturation: 100,
            lightness: 50,
        };
        let (r, g, b) = hsl.to_rgb();
        let level = (p.life * 3.0).clamp(0.0, 2.0) as u8;
        cells[y as usize * width + x as usize] = Some(Cell {
            glyph: Glyph::Spark(level),
            color: Color::Rgb { r, g, b },
        });
    }
    cells
}

fn cell_for(game: &Game, pos: Pos) -> Cell {
    if pos == game.player {
        return Cell {
            glyph: Glyph::Player,
            color: PLAYER_COLOR,
        };
    }
    if pos == game.maze.exit {
        return Cell {
            glyph: Glyph::Exit,
            color: EXIT_COLOR,
        };
    }
    match game.maze.grid.get(pos) {
        Tile::Wall => Cell {
            glyph: Glyph::Wall,
            color: WALL_COLOR,
        },
        Tile::Path => Cell {
            glyph: Glyph::Floor,
            color: Color::Reset,
        },
    }
}

fn draw_cell(stdout: &mut Stdout, renderer: &Renderer, x: usize, y: usize, cell: Cell) -> io::Result<()> {
    let text = match cell.glyph {
        Glyph::Player => "●",
        Glyph::Exit => "██",
        Glyph::Wall => "██",
        Glyph::Floor => "  ",
        Glyph::Spark(2) => "*",
        Glyph::Spark(1) => "+",
        Glyph::Spark(_) => ".",
    };
    let x_pos = renderer.origin_x + (x * CELL_W) as u16;
    let y_pos = renderer.origin_y + y as u16;
    stdout.queue(MoveTo(x_pos, y_pos))?;
    stdout.queue(SetBackgroundColor(renderer.floor))?;
    stdout.queue(SetForegroundColor(cell.color))?;
    stdout.queue(Print(text))?;
    let w = UnicodeWidthStr::width(text);
    if w < CELL_W {
        for _ in 0..(CELL_W - w) {
            stdout.queue(Print(' '))?;
        }
    }
    stdout.queue(ResetColor)?;
    Ok(())
}

fn render_reveal(stdout: &mut Stdout, game: &Game, payload: &LinkPayload) -> Result<()> {
    let (term_w, term_h) = terminal::size()?;
    let needed_h = (game.maze.height() + 2) as u16;
    let needed_w = (game.maze.width() * CELL_W) as u16;
    let (x, y) = if term_w < needed_w || term_h < needed_h {
        (0, needed_h)
    } else {
        let origin_x = (term_w - needed_w) / 2;
        let origin_y = (term_h - needed_h) / 2 + 1;
        (origin_x, origin_y + game.maze.height() as u16)
    };
    stdout.queue(MoveTo(x, y))?;
    stdout.queue(SetForegroundColor(EXIT_COLOR))?;
    stdout.queue(Print(format!("You found it: {}", payload.display_text())))?;
    stdout.queue(ResetColor)?;
    stdout.queue(MoveTo(x, y.saturating_add(1)))?;
    stdout.queue(Print("(press q to quit)"))?;
    stdout.flush()?;
    loop {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && is_quit(&key) {
                    return Ok(());
                }
            }
        }
    }
}
