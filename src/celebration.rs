use rand::Rng;

use crate::maze::Pos;

pub const CELL_PX: f64 = 20.0;
pub const PARTICLE_COUNT: usize = 50;
pub const FRAME_MS: u64 = 16;
const GRAVITY: f64 = 0.05;
const SPREAD: f64 = 8.0;
const UPWARD_BIAS: f64 = 2.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub hue: f64,
    pub speed_x: f64,
    pub speed_y: f64,
    pub life: f64,
    pub decay: f64,
}

impl Particle {
    fn spawn(x: f64, y: f64, rng: &mut impl Rng) -> Self {
        Self {
            x,
            y,
            size: rng.gen::<f64>() * 5.0 + 2.0,
            hue: rng.gen::<f64>() * 360.0,
            speed_x: (rng.gen::<f64>() - 0.5) * SPREAD,
            speed_y: (rng.gen::<f64>() - 0.5) * SPREAD - UPWARD_BIAS,
            life: 1.0,
            decay: 0.01 + rng.gen::<f64>() * 0.05,
        }
    }

    pub fn cell(&self) -> Option<(isize, isize)> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return None;
        }
        Some((
            (self.x / CELL_PX).floor() as isize,
            (self.y / CELL_PX).floor() as isize,
        ))
    }
}

pub struct Celebration {
    particles: Vec<Particle>,
}

impl Celebration {
    pub fn burst_at(exit: Pos, rng: &mut impl Rng) -> Self {
        let cx = exit.x as f64 * CELL_PX + CELL_PX / 2.0;
        let cy = exit.y as f64 * CELL_PX + CELL_PX / 2.0;
        let particles = (0..PARTICLE_COUNT)
            .map(|_| Particle::spawn(cx, cy, rng))
            .collect();
        Self { particles }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn is_finished(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn step(&mut self) {
        for p in &mut self.particles {
            p.x += p.speed_x;
            p.y += p.speed_y;
            p.speed_y += GRAVITY;
            p.life -= p.decay;
        }
        self.particles.retain(|p| p.life > 0.0);
    }
}
