//! Running sums and confidence bounded estimates over result vectors.

/// Accumulated sums over every accepted sample of a fixed-size result vector.
///
/// Accumulation only adds, so totals do not depend on the order in which
/// samples or partial batches arrive.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningStats {
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
    samples: u64,
}

/// Per-dimension estimate derived from a `RunningStats` snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    /// Per-dimension mean.
    pub result: Vec<f64>,
    /// Per-dimension relative tolerance at the configured confidence.
    pub tolerance: Vec<f64>,
    /// The worst tolerance over all dimensions.
    pub accuracy: f64,
    /// The number of samples behind this estimate.
    pub samples: u64,
    /// Whether the estimation loop stopped because the target was reached.
    pub converged: bool,
}

impl Estimate {
    /// The smallest mean over all dimensions.
    pub fn worst_mean(&self) -> f64 {
        self.result.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

impl RunningStats {
    /// Creates zeroed totals for results of dimension `count`.
    pub fn new(count: usize) -> Self {
        Self {
            sum: vec![0.0; count],
            sum_sq: vec![0.0; count],
            samples: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.sum.len()
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn sum(&self) -> &[f64] {
        &self.sum
    }

    pub fn sum_sq(&self) -> &[f64] {
        &self.sum_sq
    }

    /// Adds a single sample to the totals.
    ///
    /// # Panics
    /// If `sample` does not have exactly `count` elements.
    pub fn accumulate(&mut self, sample: &[f64]) {
        assert_eq!(sample.len(), self.count(), "sample dimension mismatch");

        for ((s, sq), x) in self.sum.iter_mut().zip(&mut self.sum_sq).zip(sample) {
            *s += x;
            *sq += x * x;
        }

        self.samples += 1;
    }

    /// Adds a batch of partial totals, as returned by a worker.
    ///
    /// # Returns
    /// `false` and leaves the totals untouched if the batch dimensions differ
    /// from `count`.
    pub fn merge(&mut self, sum: &[f64], sum_sq: &[f64], samples: u64) -> bool {
        if sum.len() != self.count() || sum_sq.len() != self.count() {
            return false;
        }

        for (acc, x) in self.sum.iter_mut().zip(sum) {
            *acc += x;
        }

        for (acc, x) in self.sum_sq.iter_mut().zip(sum_sq) {
            *acc += x;
        }

        self.samples += samples;
        true
    }

    /// Computes the current mean and tolerance of every dimension.
    ///
    /// With no samples yet, every mean is zero and every tolerance infinite.
    ///
    /// # Arguments
    /// * `cfactor` - The confidence multiplier, see `confidence::cfactor`.
    pub fn estimate(&self, cfactor: f64) -> Estimate {
        let n = self.samples;
        let (result, tolerance): (Vec<_>, Vec<_>) = self
            .sum
            .iter()
            .zip(&self.sum_sq)
            .map(|(&s, &sq)| {
                let mean = if n > 0 { s / n as f64 } else { 0.0 };
                (mean, tolerance(s, sq, n, cfactor))
            })
            .unzip();

        let accuracy = tolerance.iter().copied().fold(0.0, f64::max);

        Estimate {
            result,
            tolerance,
            accuracy,
            samples: n,
            converged: false,
        }
    }
}

/// Relative half-width of the confidence interval around one dimension's mean.
///
/// Infinite until it becomes meaningful, that is until there is more than one
/// sample and the mean is strictly positive.
///
/// # Arguments
/// * `sum` - Sum of the samples.
/// * `sum_sq` - Sum of the squared samples.
/// * `n` - Number of samples.
/// * `cfactor` - The confidence multiplier.
pub fn tolerance(sum: f64, sum_sq: f64, n: u64, cfactor: f64) -> f64 {
    if n < 2 {
        return f64::INFINITY;
    }

    let n = n as f64;
    let mean = sum / n;
    if mean <= 0.0 {
        return f64::INFINITY;
    }

    // Rounding can push a zero variance slightly negative.
    let variance_of_mean = ((sum_sq / n - mean * mean) / (n - 1.0)).max(0.0);
    cfactor * variance_of_mean.sqrt() / mean
}

#[cfg(test)]
mod tests {
    use super::*;

    const CFACTOR: f64 = 1.959964;

    #[test]
    fn constant_samples_have_zero_tolerance() {
        let mut stats = RunningStats::new(1);
        stats.accumulate(&[1.0]);
        assert_eq!(stats.estimate(CFACTOR).accuracy, f64::INFINITY);

        stats.accumulate(&[1.0]);
        let estimate = stats.estimate(CFACTOR);
        assert_eq!(estimate.result, [1.0]);
        assert_eq!(estimate.tolerance, [0.0]);
        assert_eq!(estimate.accuracy, 0.0);
    }

    #[test]
    fn empty_totals_report_infinite_tolerance() {
        let estimate = RunningStats::new(3).estimate(CFACTOR);
        assert_eq!(estimate.result, [0.0; 3]);
        assert!(estimate.tolerance.iter().all(|t| t.is_infinite()));
        assert_eq!(estimate.samples, 0);
    }

    #[test]
    fn non_positive_mean_is_not_meaningful() {
        assert_eq!(tolerance(0.0, 0.0, 10, CFACTOR), f64::INFINITY);
        assert_eq!(tolerance(-5.0, 5.0, 10, CFACTOR), f64::INFINITY);
    }

    #[test]
    fn tolerance_shrinks_as_samples_grow() {
        // Fixed mean 0.5 and fixed second moment 0.5.
        let mut previous = f64::INFINITY;
        for n in [2u64, 3, 10, 100, 1_000, 100_000] {
            let nf = n as f64;
            let tol = tolerance(0.5 * nf, 0.5 * nf, n, CFACTOR);
            assert!(tol >= 0.0);
            assert!(tol < previous, "n={n}: {tol} >= {previous}");
            previous = tol;
        }
    }

    #[test]
    fn accumulation_order_does_not_matter() {
        let a = [[0.0, 1.0], [0.5, 2.0], [1.0, 0.25]];
        let b = [[2.0, 0.0], [0.125, 4.0]];

        let mut ab = RunningStats::new(2);
        a.iter().chain(&b).for_each(|x| ab.accumulate(x));

        let mut ba = RunningStats::new(2);
        b.iter().chain(&a).for_each(|x| ba.accumulate(x));

        assert_eq!(ab, ba);
    }

    #[test]
    fn merge_matches_sample_accumulation() {
        let mut direct = RunningStats::new(2);
        let mut batch = RunningStats::new(2);
        for x in [[1.0, 2.0], [3.0, 4.0]] {
            direct.accumulate(&x);
            batch.accumulate(&x);
        }

        let mut merged = RunningStats::new(2);
        assert!(merged.merge(batch.sum(), batch.sum_sq(), batch.samples()));
        assert_eq!(merged, direct);
    }

    #[test]
    fn merge_rejects_wrong_dimensions() {
        let mut stats = RunningStats::new(2);
        assert!(!stats.merge(&[1.0], &[1.0], 1));
        assert_eq!(stats, RunningStats::new(2));
    }

    #[test]
    fn accuracy_is_the_worst_dimension() {
        let mut stats = RunningStats::new(2);
        for x in [[1.0, 1.0], [1.0, 3.0], [1.0, 1.0], [1.0, 3.0]] {
            stats.accumulate(&x);
        }

        let estimate = stats.estimate(CFACTOR);
        assert_eq!(estimate.tolerance[0], 0.0);
        assert!(estimate.tolerance[1] > 0.0);
        assert_eq!(estimate.accuracy, estimate.tolerance[1]);
        assert_eq!(estimate.worst_mean(), 1.0);
    }
}
