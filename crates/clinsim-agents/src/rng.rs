//! Small deterministic generator for simulation randomness.
//!
//! Simulations need a seedable source so a run can be replayed; the
//! splitmix64 step is enough for dropout sampling and turn draws.

use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seeds from the current time, for runs where replay is not needed.
    pub fn from_time() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as u64 ^ d.as_secs())
            .unwrap_or(0x9e3779b97f4a7c15);
        Self::new(nanos)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform draw in `[lo, hi)`. Returns `lo` when the range is empty.
    pub fn gen_range(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_u64() % (hi - lo)
    }

    /// Picks `len * fraction` distinct positions out of `0..len`.
    pub fn sample_positions(&mut self, len: usize, fraction: f32) -> Vec<usize> {
        if len == 0 || fraction <= 0.0 {
            return Vec::new();
        }
        let k = ((len as f32 * fraction) as usize).min(len);
        if k == 0 {
            return Vec::new();
        }
        // Partial Fisher-Yates over the index list.
        let mut indices: Vec<usize> = (0..len).collect();
        for i in 0..k {
            let j = self.gen_range(i as u64, len as u64) as usize;
            indices.swap(i, j);
        }
        indices.truncate(k);
        indices
    }
}
