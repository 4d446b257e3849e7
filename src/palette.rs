#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hsl {
    pub hue: u32,
    pub saturation: u32,
    pub lightness: u32,
}

impl Hsl {
    pub fn css(&self) -> String {
        format!(
            "hsl({}, {}%, {}%)",
            self.hue, self.saturation, self.lightness
        )
    }

    pub fn to_rgb(&self) -> (u8, u8, u8) {
        let h = (self.hue % 360) as f64 / 60.0;
        let s = self.saturation.min(100) as f64 / 100.0;
        let l = self.lightness.min(100) as f64 / 100.0;

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        (channel(r), channel(g), channel(b))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub background: Hsl,
    pub gradient_end: Hsl,
    pub container: Hsl,
}

impl Palette {
    pub fn from_seed(encoded: &str) -> Self {
        let sum: u64 = encoded.chars().map(|c| c as u64).sum();
        let hue = (sum % 360) as u32;
        let saturation = 15 + (sum % 10) as u32;
        let lightness = 92 + (sum % 6) as u32;
        let background = Hsl {
            hue,
            saturation,
            lightness,
        };
        Self {
            background,
            gradient_end: Hsl {
                hue: (hue + 30) % 360,
                ..background
            },
            container: Hsl {
                lightness: 100,
                ..background
            },
        }
    }

    pub fn css(&self) -> String {
        self.background.css()
    }

    pub fn gradient_css(&self) -> String {
        format!(
            "linear-gradient(135deg, {} 0%, {} 100%)",
            self.background.css(),
            self.gradient_end.css()
        )
    }
}
