//! Bootstrap sampling over the non-missing rows of a reference column.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, instrument};

use crate::column::is_missing;
use crate::error::FrameError;
use crate::frame::DataFrame;

/// An in-bag draw and its out-of-bag complement.
///
/// Both lists hold sample positions into the frame, restricted to the rows
/// where the reference column is non-missing. `in_bag` is sorted ascending
/// and may repeat positions when drawn with replacement; `out_of_bag` is the
/// sorted set difference and never repeats.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BootstrapSample {
    /// Positions drawn into the bag.
    pub in_bag: Vec<usize>,
    /// Non-missing positions never drawn.
    pub out_of_bag: Vec<usize>,
}

impl DataFrame {
    /// Draw a bootstrap sample over the non-missing rows of `feature`.
    ///
    /// Let R be those rows and `k = ⌊sample_fraction · |R|⌋`. With
    /// replacement, draws `k` uniform positions from R; without, shuffles R
    /// and takes its first `k` elements. Consumes the frame RNG, so calls
    /// are reproducible given the construction seed and must be serialised
    /// with other RNG consumers.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`FrameError::InvalidSampleFraction`] | `sample_fraction <= 0` (or NaN) |
    /// | [`FrameError::FractionAboveOneWithoutReplacement`] | fraction above one without replacement |
    /// | [`FrameError::FeatureIndexOutOfRange`] | `feature >= 2F` |
    #[instrument(skip(self))]
    pub fn bootstrap_from_real_samples(
        &mut self,
        with_replacement: bool,
        sample_fraction: f64,
        feature: usize,
    ) -> Result<BootstrapSample, FrameError> {
        if !(sample_fraction > 0.0) {
            return Err(FrameError::InvalidSampleFraction {
                fraction: sample_fraction,
            });
        }
        if !with_replacement && sample_fraction > 1.0 {
            return Err(FrameError::FractionAboveOneWithoutReplacement {
                fraction: sample_fraction,
            });
        }

        let real: Vec<usize> = self
            .column(feature)?
            .values()
            .iter()
            .enumerate()
            .filter(|(_, v)| !is_missing(**v))
            .map(|(s, _)| s)
            .collect();
        let n_real = real.len();
        let n_draws = (sample_fraction * n_real as f64).floor() as usize;

        let rng = self.rng_mut();
        let mut in_bag = Vec::with_capacity(n_draws);
        if with_replacement {
            for _ in 0..n_draws {
                in_bag.push(real[rng.gen_range(0..n_real)]);
            }
        } else {
            let mut shuffled = real.clone();
            shuffled.shuffle(rng);
            in_bag.extend_from_slice(&shuffled[..n_draws]);
        }
        in_bag.sort_unstable();

        // R and in_bag are both sorted; walk them in lockstep. in_bag may
        // repeat positions, R never does.
        let mut out_of_bag = Vec::with_capacity(n_real.saturating_sub(n_draws));
        let mut bag = in_bag.iter().peekable();
        for &r in &real {
            while bag.next_if(|&&b| b < r).is_some() {}
            if bag.peek() != Some(&&r) {
                out_of_bag.push(r);
            }
        }

        debug!(
            n_real,
            n_in_bag = in_bag.len(),
            n_out_of_bag = out_of_bag.len(),
            with_replacement,
            "bootstrap drawn"
        );

        Ok(BootstrapSample { in_bag, out_of_bag })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::column::{ColumnKind, ColumnSpec};
    use crate::error::FrameError;
    use crate::frame::{DataFrame, Orientation};

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    /// One numerical column over ten samples with two missing entries.
    fn frame_with_missing(seed: u64) -> DataFrame {
        let matrix = vec![strings(&[
            "0", "1", "NA", "3", "4", "5", "NA", "7", "8", "9",
        ])];
        let specs = vec![ColumnSpec::new("N:x", ColumnKind::Numerical)];
        let samples: Vec<String> = (0..10).map(|i| format!("s{i}")).collect();
        DataFrame::from_raw(&matrix, Orientation::FeaturesAsRows, &specs, samples, Some(seed))
            .unwrap()
    }

    #[test]
    fn in_bag_never_contains_missing_rows() {
        let mut frame = frame_with_missing(42);
        let draw = frame.bootstrap_from_real_samples(true, 1.0, 0).unwrap();
        for &s in draw.in_bag.iter().chain(&draw.out_of_bag) {
            assert!(s != 2 && s != 6, "missing row {s} leaked into the draw");
        }
        assert_eq!(draw.in_bag.len(), 8);
    }

    #[test]
    fn out_of_bag_is_exact_complement() {
        let mut frame = frame_with_missing(42);
        let draw = frame.bootstrap_from_real_samples(true, 1.0, 0).unwrap();
        let real: HashSet<usize> = [0, 1, 3, 4, 5, 7, 8, 9].into_iter().collect();
        let bag: HashSet<usize> = draw.in_bag.iter().copied().collect();
        let oob: HashSet<usize> = draw.out_of_bag.iter().copied().collect();
        assert!(bag.is_subset(&real));
        assert!(oob.is_subset(&real));
        assert!(bag.is_disjoint(&oob));
        let expected: HashSet<usize> = real.difference(&bag).copied().collect();
        assert_eq!(oob, expected);
    }

    #[test]
    fn without_replacement_no_duplicates() {
        let mut frame = frame_with_missing(9);
        let draw = frame.bootstrap_from_real_samples(false, 0.5, 0).unwrap();
        assert_eq!(draw.in_bag.len(), 4);
        let unique: HashSet<usize> = draw.in_bag.iter().copied().collect();
        assert_eq!(unique.len(), draw.in_bag.len());
        assert_eq!(draw.out_of_bag.len(), 4);
    }

    #[test]
    fn fraction_floor_applied() {
        let mut frame = frame_with_missing(1);
        // 8 real rows, fraction 0.9 -> floor(7.2) = 7 draws.
        let draw = frame.bootstrap_from_real_samples(false, 0.9, 0).unwrap();
        assert_eq!(draw.in_bag.len(), 7);
        assert_eq!(draw.out_of_bag.len(), 1);
    }

    #[test]
    fn in_bag_sorted_ascending() {
        let mut frame = frame_with_missing(5);
        let draw = frame.bootstrap_from_real_samples(true, 1.0, 0).unwrap();
        assert!(draw.in_bag.windows(2).all(|w| w[0] <= w[1]));
        assert!(draw.out_of_bag.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn deterministic_given_seed() {
        let mut a = frame_with_missing(42);
        let mut b = frame_with_missing(42);
        let da = a.bootstrap_from_real_samples(true, 1.0, 0).unwrap();
        let db = b.bootstrap_from_real_samples(true, 1.0, 0).unwrap();
        assert_eq!(da, db);
        // Successive draws advance the shared generator.
        let da2 = a.bootstrap_from_real_samples(true, 1.0, 0).unwrap();
        let db2 = b.bootstrap_from_real_samples(true, 1.0, 0).unwrap();
        assert_eq!(da2, db2);
    }

    #[test]
    fn invalid_fractions_rejected() {
        let mut frame = frame_with_missing(42);
        assert!(matches!(
            frame.bootstrap_from_real_samples(true, 0.0, 0),
            Err(FrameError::InvalidSampleFraction { .. })
        ));
        assert!(matches!(
            frame.bootstrap_from_real_samples(true, -0.5, 0),
            Err(FrameError::InvalidSampleFraction { .. })
        ));
        assert!(matches!(
            frame.bootstrap_from_real_samples(false, 1.5, 0),
            Err(FrameError::FractionAboveOneWithoutReplacement { .. })
        ));
        // With replacement the fraction may exceed one.
        assert!(frame.bootstrap_from_real_samples(true, 1.5, 0).is_ok());
    }
}
