#![allow(dead_code)]

use circllhist::Histogram;
use dhat::HeapStats;
use rand::SeedableRng;
use rand_distr::{Distribution, Pareto};

pub fn make_points(size: usize) -> Vec<f64> {
    // Latency-like samples in microseconds: most of the mass near 15ms, with a long tail out to 10 seconds.
    let distribution = Pareto::new(1.0, 1.0).expect("pareto distribution should be valid");
    let seed = 0xC0FFEE;

    let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
    distribution
        .sample_iter(&mut rng)
        .map(|n| n * 10_000.0)
        .filter(|n| *n > 15_000.0 && *n < 10_000_000.0)
        .take(size)
        .collect::<Vec<_>>()
}

pub fn build_histogram(points: &[f64]) -> Histogram {
    let mut histogram = Histogram::new();
    for point in points {
        histogram.insert(*point).expect("points should encode");
    }
    histogram
}

#[non_exhaustive]
pub struct MathableHeapStats {
    pub total_blocks: u64,
    pub total_bytes: u64,
    pub curr_blocks: usize,
    pub curr_bytes: usize,
}

impl From<HeapStats> for MathableHeapStats {
    fn from(stats: HeapStats) -> Self {
        Self {
            total_blocks: stats.total_blocks,
            total_bytes: stats.total_bytes,
            curr_blocks: stats.curr_blocks,
            curr_bytes: stats.curr_bytes,
        }
    }
}

impl std::ops::Sub for MathableHeapStats {
    type Output = MathableHeapStats;

    fn sub(self, rhs: MathableHeapStats) -> Self::Output {
        MathableHeapStats {
            total_blocks: self.total_blocks - rhs.total_blocks,
            total_bytes: self.total_bytes - rhs.total_bytes,
            curr_blocks: self.curr_blocks - rhs.curr_blocks,
            curr_bytes: self.curr_bytes - rhs.curr_bytes,
        }
    }
}
