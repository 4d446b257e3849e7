const MULTIPLIER: u64 = 9301;
const INCREMENT: u64 = 49297;
const MODULUS: u64 = 233280;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Seeds the generator with the sum of the string's code points.
    pub fn from_seed(seed: &str) -> Self {
        let state = seed
            .chars()
            .fold(0u64, |acc, c| (acc + c as u64) % MODULUS);
        Self { state }
    }

    #[cfg(test)]
    fn state(&self) -> u64 {
        self.state
    }

    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * MULTIPLIER + INCREMENT) % MODULUS;
        self.state as f64 / MODULUS as f64
    }

    /// `floor(next_f64() * n)`; always below `n` for `n > 0`.
    pub fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.below(i + 1);
            items.swap(i, j);
        }
    }
}
