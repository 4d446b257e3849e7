use crate::maze::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

pub const DEFAULT_MOVE_MS: u64 = 130;
pub const DEFAULT_RENDER_FPS: u64 = 60;
pub const MOVE_MS_VAR: &str = "MAZE_MOVE_MS";
pub const FPS_VAR: &str = "MAZE_FPS";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    pub width: usize,
    pub height: usize,
    /// Delay between steps while a direction is held.
    pub move_ms: u64,
    pub render_fps: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            move_ms: DEFAULT_MOVE_MS,
            render_fps: DEFAULT_RENDER_FPS,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // Unset, unparsable or zero values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        Self {
            move_ms: read(MOVE_MS_VAR, DEFAULT_MOVE_MS),
            render_fps: read(FPS_VAR, DEFAULT_RENDER_FPS),
            ..Self::default()
        }
    }

    pub fn with_size(self, width: Option<usize>, height: Option<usize>) -> Self {
        Self {
            width: width.unwrap_or(self.width),
            height: height.unwrap_or(self.height),
            ..self
        }
    }
}
