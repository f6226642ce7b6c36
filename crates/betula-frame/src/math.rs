//! Numeric kernels for split finding.
//!
//! Everything here operates on plain slices and plain accumulators; the
//! split finders own all control flow. Missing observations are represented
//! by the canonical NaN sentinel throughout (see [`crate::column`]), and the
//! accumulators assume their inputs have already been filtered.

/// Running count, mean, and sum of squared errors under the Welford
/// recurrence.
///
/// `remove` is the exact algebraic inverse of `add`, which is what lets the
/// greedy categorical split try a category move and revert it without
/// recomputing from scratch. Floating-point drift across an
/// add-then-remove pair is bounded by a few ULPs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningMoments {
    n: usize,
    mean: f64,
    sse: f64,
}

impl RunningMoments {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an accumulator holding all of `values`.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        let mut acc = Self::new();
        for &v in values {
            acc.add(v);
        }
        acc
    }

    /// Add one observation.
    pub fn add(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.sse += delta * (x - self.mean);
    }

    /// Remove one observation previously added.
    ///
    /// # Panics
    ///
    /// Panics when the accumulator is empty; removing an observation that
    /// was never added is a programmer error.
    pub fn remove(&mut self, x: f64) {
        assert!(self.n > 0, "RunningMoments::remove on an empty accumulator");
        let delta = x - self.mean;
        self.n -= 1;
        if self.n == 0 {
            self.mean = 0.0;
            self.sse = 0.0;
            return;
        }
        self.mean -= delta / self.n as f64;
        self.sse -= delta * (x - self.mean);
    }

    /// Return the number of observations held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Return `true` when the accumulator holds no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Return the running mean (0.0 when empty).
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Return the running sum of squared errors about the mean.
    #[must_use]
    pub fn sse(&self) -> f64 {
        self.sse
    }

    /// Return the population variance (0.0 when empty).
    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.n == 0 { 0.0 } else { self.sse / self.n as f64 }
    }
}

/// Category frequency table maintaining `n` and `Σ fc²` under single-sample
/// updates.
///
/// Adding a sample of category `c` changes the squared-frequency sum by
/// `2·fc + 1`; removing one changes it by `−(2·fc − 1)`. The table grows on
/// demand, so codes only need to be dense, not known up front.
#[derive(Debug, Clone, Default)]
pub struct SquaredFrequency {
    freq: Vec<usize>,
    n: usize,
    sum_sq: u64,
}

impl SquaredFrequency {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table pre-sized for `n_categories` codes.
    #[must_use]
    pub fn with_categories(n_categories: usize) -> Self {
        Self {
            freq: vec![0; n_categories],
            n: 0,
            sum_sq: 0,
        }
    }

    /// Add one sample of category `code`.
    pub fn add(&mut self, code: usize) {
        if code >= self.freq.len() {
            self.freq.resize(code + 1, 0);
        }
        let f = self.freq[code] as u64;
        self.sum_sq += 2 * f + 1;
        self.freq[code] += 1;
        self.n += 1;
    }

    /// Remove one sample of category `code` previously added.
    ///
    /// # Panics
    ///
    /// Panics when the table holds no sample of `code`.
    pub fn remove(&mut self, code: usize) {
        assert!(
            code < self.freq.len() && self.freq[code] > 0,
            "SquaredFrequency::remove of an absent category"
        );
        let f = self.freq[code] as u64;
        self.sum_sq -= 2 * f - 1;
        self.freq[code] -= 1;
        self.n -= 1;
    }

    /// Return the total number of samples held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Return `true` when the table holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Return `Σ fc²` over all categories.
    #[must_use]
    pub fn sum_sq(&self) -> u64 {
        self.sum_sq
    }

    /// Return the frequency of `code` (0 for codes never added).
    #[must_use]
    pub fn frequency(&self, code: usize) -> usize {
        self.freq.get(code).copied().unwrap_or(0)
    }
}

/// Drop missing values, stable-sort the rest ascending, and return the
/// sorted values together with the index permutation `perm` such that
/// `sorted[i] = values[perm[i]]`.
///
/// Ties keep their original relative order, which is what makes split
/// finding deterministic on data with repeated feature values.
#[must_use]
pub fn filter_sort(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut paired: Vec<(f64, usize)> = values
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, v)| !v.is_nan())
        .map(|(i, v)| (v, i))
        .collect();
    paired.sort_by(|a, b| a.0.total_cmp(&b.0));
    let sorted = paired.iter().map(|&(v, _)| v).collect();
    let perm = paired.iter().map(|&(_, i)| i).collect();
    (sorted, perm)
}

/// Arithmetic mean of a slice (0.0 when empty).
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sum of squared errors of a slice about `mu`, computed from scratch.
#[must_use]
pub fn sum_squared_error(values: &[f64], mu: f64) -> f64 {
    values.iter().map(|&v| (v - mu) * (v - mu)).sum()
}

/// Pearson correlation coefficient of two paired slices.
///
/// Returns NaN when the slices are shorter than two elements or either
/// side has zero variance.
#[must_use]
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len(), "pearson_correlation on unpaired slices");
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let mx = mean(x);
    let my = mean(y);
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    cov / (vx * vy).sqrt()
}
