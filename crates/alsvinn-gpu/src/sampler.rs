//! Classical sampling from derived distributions.
//!
//! Sampling here is non-destructive: outcomes are drawn from a probability
//! distribution the engine read back from the device, and the state vector
//! itself is never collapsed or modified. Repeated sampling therefore keeps
//! drawing from the same pre-measurement distribution.

use rand::distributions::{Bernoulli, Distribution, WeightedIndex};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{GpuSimError, GpuSimResult};

/// Observed outcome counts, keyed by basis-state bitstring.
///
/// Qubit 0 is the leftmost character of the label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    counts: FxHashMap<String, u32>,
}

impl Counts {
    /// Create an empty counts map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation of `label`.
    pub fn record(&mut self, label: impl Into<String>) {
        *self.counts.entry(label.into()).or_insert(0) += 1;
    }

    /// Count observed for `label` (0 if never observed).
    pub fn get(&self, label: &str) -> u32 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Total number of observations.
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// The most frequently observed label, if any outcome was recorded.
    pub fn most_frequent(&self) -> Option<(&str, u32)> {
        self.counts
            .iter()
            .max_by_key(|&(_, &count)| count)
            .map(|(label, &count)| (label.as_str(), count))
    }

    /// Number of distinct labels observed.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no outcome was recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over `(label, count)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(label, &count)| (label.as_str(), count))
    }
}

/// Format a basis-state index as a bitstring label, qubit 0 leftmost.
pub fn bitstring(outcome: u64, num_qubits: u32) -> String {
    format!("{:0width$b}", outcome, width = num_qubits as usize)
        .chars()
        .rev()
        .collect()
}

/// Draw `samples` i.i.d. categorical outcomes from a full basis-state
/// distribution.
pub(crate) fn sample_counts(
    probabilities: &[f32],
    samples: u32,
    num_qubits: u32,
) -> GpuSimResult<Counts> {
    let dist = WeightedIndex::new(probabilities.iter().copied())
        .map_err(|_| GpuSimError::DegenerateDistribution)?;
    let mut rng = rand::thread_rng();
    let mut counts = Counts::new();
    for _ in 0..samples {
        let outcome = dist.sample(&mut rng) as u64;
        counts.record(bitstring(outcome, num_qubits));
    }
    Ok(counts)
}

/// Draw `samples` i.i.d. Bernoulli outcomes for one qubit, labelled "0"/"1".
pub(crate) fn sample_bit_counts(prob_zero: f32, samples: u32) -> GpuSimResult<Counts> {
    // Squared magnitudes can land a hair outside [0, 1]; that drift is
    // numerical, not a usage error.
    let p_one = f64::from(1.0 - prob_zero).clamp(0.0, 1.0);
    let dist = Bernoulli::new(p_one).map_err(|_| GpuSimError::DegenerateDistribution)?;
    let mut rng = rand::thread_rng();
    let mut counts = Counts::new();
    for _ in 0..samples {
        counts.record(if dist.sample(&mut rng) { "1" } else { "0" });
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitstring_puts_qubit_zero_first() {
        // index 1 = qubit 0 set
        assert_eq!(bitstring(1, 3), "100");
        assert_eq!(bitstring(4, 3), "001");
        assert_eq!(bitstring(0, 2), "00");
    }

    #[test]
    fn deterministic_distribution_samples_one_label() {
        let probs = vec![0.0, 0.0, 1.0, 0.0];
        let counts = sample_counts(&probs, 200, 2).unwrap();
        assert_eq!(counts.get("01"), 200); // index 2 = qubit 1 set
        assert_eq!(counts.total(), 200);
        assert_eq!(counts.len(), 1);
    }

    #[test]
    fn uniform_distribution_hits_every_label() {
        let probs = vec![0.25; 4];
        let counts = sample_counts(&probs, 20_000, 2).unwrap();
        assert_eq!(counts.total(), 20_000);
        for label in ["00", "10", "01", "11"] {
            let freq = f64::from(counts.get(label)) / 20_000.0;
            assert!((freq - 0.25).abs() < 0.02, "{label} at {freq}");
        }
    }

    #[test]
    fn zero_mass_distribution_is_rejected() {
        let probs = vec![0.0, 0.0];
        assert!(matches!(
            sample_counts(&probs, 10, 1),
            Err(GpuSimError::DegenerateDistribution)
        ));
    }

    #[test]
    fn bernoulli_counts_split_as_expected() {
        let counts = sample_bit_counts(0.5, 20_000).unwrap();
        assert_eq!(counts.get("0") + counts.get("1"), 20_000);
        let freq = f64::from(counts.get("0")) / 20_000.0;
        assert!((freq - 0.5).abs() < 0.02);
    }

    #[test]
    fn bernoulli_certain_zero() {
        let counts = sample_bit_counts(1.0, 100).unwrap();
        assert_eq!(counts.get("0"), 100);
        assert_eq!(counts.get("1"), 0);
    }

    #[test]
    fn most_frequent_reports_heaviest_label() {
        let mut counts = Counts::new();
        counts.record("0");
        counts.record("1");
        counts.record("1");
        assert_eq!(counts.most_frequent(), Some(("1", 2)));
    }
}
