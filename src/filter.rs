/*! Finite impulse response filter primitives.

The decode engines feed samples through small fixed filters one at a
time, so the filter here is a value carrying its coefficients and its
history: `feed()` shifts one sample in and returns one sample out.
History persists for the life of the filter; the comb deliberately runs
one filter instance across whole frames without resetting it.
*/
use std::collections::VecDeque;
use std::f64::consts::PI;

/// Finite impulse response filter.
pub struct Fir {
    taps: Vec<f64>,
    hist: VecDeque<f64>,
}

impl Fir {
    /// Create new FIR with zeroed history.
    pub fn new(taps: &[f64]) -> Self {
        Self {
            taps: taps.to_vec(),
            hist: std::iter::repeat(0.0).take(taps.len()).collect(),
        }
    }

    /// Feed one sample in, get one sample out.
    pub fn feed(&mut self, sample: f64) -> f64 {
        self.hist.pop_front();
        self.hist.push_back(sample);
        self.hist
            .iter()
            .rev()
            .zip(self.taps.iter())
            .map(|(x, t)| x * t)
            .sum()
    }

    /// Group delay in samples, for symmetric taps.
    pub fn group_delay(&self) -> usize {
        (self.taps.len() - 1) / 2
    }
}

/// Create taps for a low pass filter.
///
/// Windowed sinc with a Hamming window, normalized to unity DC gain.
/// The tap count must be odd so the group delay lands on a sample.
pub fn low_pass(samp_rate: f64, cutoff: f64, ntaps: usize) -> Vec<f64> {
    assert!(ntaps % 2 == 1, "tap count must be odd");
    let m = (ntaps - 1) as f64 / 2.0;
    let fwt0 = 2.0 * PI * cutoff / samp_rate;
    let taps: Vec<f64> = (0..ntaps)
        .map(|i| {
            let n = i as f64 - m;
            let win = 0.54 - 0.46 * (2.0 * PI * i as f64 / (ntaps - 1) as f64).cos();
            if n == 0.0 {
                fwt0 / PI * win
            } else {
                (n * fwt0).sin() / (n * PI) * win
            }
        })
        .collect();
    let gain: f64 = taps.iter().sum();
    taps.into_iter().map(|t| t / gain).collect()
}

/// Create taps for a high pass filter.
///
/// Spectral inversion of the matching low pass: DC gain is zero.
pub fn high_pass(samp_rate: f64, cutoff: f64, ntaps: usize) -> Vec<f64> {
    let mut taps: Vec<f64> = low_pass(samp_rate, cutoff, ntaps)
        .into_iter()
        .map(|t| -t)
        .collect();
    taps[(ntaps - 1) / 2] += 1.0;
    taps
}

/// Fixed 10 tap luma low pass used by the comb's coherence estimators.
pub const LPF10H: [f64; 10] = [
    0.016194, 0.037972, 0.093130, 0.155882, 0.196822, 0.196822, 0.155882, 0.093130, 0.037972,
    0.016194,
];
