//! Exact split search over one feature column.
//!
//! Both entry points filter the candidate rows down to those where target
//! and feature are non-missing, score candidate partitions with incremental
//! impurity updates (variance for numerical targets, squared frequency for
//! categorical targets), and hand back the partitioned sample positions.
//! "No admissible split" is a routine outcome, reported as `Ok(None)` so the
//! tree builder can close the node as a leaf.

use std::collections::BTreeMap;

use crate::column::ColumnKind;
use crate::error::FrameError;
use crate::frame::DataFrame;
use crate::math::{self, RunningMoments, SquaredFrequency};

/// Result of a numerical-feature split.
///
/// Samples with feature value `<= threshold` went left. `fitness` lies in
/// `(-inf, 1]`; 1 means both children are pure.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NumericalSplit {
    /// Impurity reduction relative to the unsplit node (larger is better).
    pub fitness: f64,
    /// Largest feature value sent left.
    pub threshold: f64,
    /// Sample positions with feature `<= threshold`.
    pub left: Vec<usize>,
    /// Sample positions with feature `> threshold`.
    pub right: Vec<usize>,
}

/// Result of a categorical-feature split.
///
/// `left_categories` and `right_categories` are disjoint and together cover
/// exactly the category codes present in the filtered rows; both are sorted
/// ascending by code.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CategoricalSplit {
    /// Impurity reduction relative to the unsplit node (larger is better).
    pub fitness: f64,
    /// Category codes sent left.
    pub left_categories: Vec<usize>,
    /// Category codes kept right.
    pub right_categories: Vec<usize>,
    /// Sample positions whose category went left.
    pub left: Vec<usize>,
    /// Sample positions whose category stayed right.
    pub right: Vec<usize>,
}

impl DataFrame {
    /// Search for the best threshold split of a numerical feature.
    ///
    /// Rows of `sample_ics` where either column is missing are dropped; the
    /// survivors are sorted by feature value (stable). A boundary after
    /// sorted position `k` is admissible when the adjacent feature values
    /// differ and both children would hold at least `min_samples` rows.
    /// Returns `Ok(None)` when fewer than `2 * min_samples` rows survive or
    /// no boundary is admissible.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`FrameError::InvalidMinSamples`] | `min_samples` is zero |
    /// | [`FrameError::WrongColumnKind`] | `feature` is not numerical |
    /// | [`FrameError::FeatureIndexOutOfRange`] | either index is out of range |
    pub fn numerical_feature_split(
        &self,
        target: usize,
        feature: usize,
        min_samples: usize,
        sample_ics: &[usize],
    ) -> Result<Option<NumericalSplit>, FrameError> {
        if min_samples == 0 {
            return Err(FrameError::InvalidMinSamples);
        }
        let feature_col = self.column(feature)?;
        if feature_col.kind() != ColumnKind::Numerical {
            return Err(FrameError::WrongColumnKind {
                index: feature,
                name: feature_col.name().to_string(),
                expected: "numerical",
            });
        }
        let target_is_numerical = self.is_numerical(target)?;

        let (tv, fv, kept) = self.filtered_sorted_pair(target, feature, sample_ics)?;
        let n = fv.len();
        if n < 2 * min_samples {
            return Ok(None);
        }

        let found = if target_is_numerical {
            best_boundary_by_sse(&tv, &fv, min_samples)
        } else {
            best_boundary_by_squared_frequency(&tv, &fv, min_samples)
        };
        let Some((boundary, fitness)) = found else {
            return Ok(None);
        };

        Ok(Some(NumericalSplit {
            fitness,
            threshold: fv[boundary],
            left: kept[..=boundary].to_vec(),
            right: kept[boundary + 1..].to_vec(),
        }))
    }

    /// Search for the best category bipartition of a categorical feature.
    ///
    /// Greedy category transfer: every category starts on the right; each
    /// round tentatively moves each remaining category left, reverts, and
    /// commits the move with the best improvement, stopping when none
    /// improves. Candidates are tried in ascending code order and ties keep
    /// the earlier candidate. Returns `Ok(None)` when fewer than
    /// `2 * min_samples` rows survive filtering or the final partition
    /// leaves either side below `min_samples`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`FrameError::InvalidMinSamples`] | `min_samples` is zero |
    /// | [`FrameError::WrongColumnKind`] | `feature` is not categorical |
    /// | [`FrameError::FeatureIndexOutOfRange`] | either index is out of range |
    pub fn categorical_feature_split(
        &self,
        target: usize,
        feature: usize,
        min_samples: usize,
        sample_ics: &[usize],
    ) -> Result<Option<CategoricalSplit>, FrameError> {
        if min_samples == 0 {
            return Err(FrameError::InvalidMinSamples);
        }
        let feature_col = self.column(feature)?;
        if feature_col.kind() != ColumnKind::Categorical {
            return Err(FrameError::WrongColumnKind {
                index: feature,
                name: feature_col.name().to_string(),
                expected: "categorical",
            });
        }
        let target_is_numerical = self.is_numerical(target)?;

        let (tv, fv, kept) = self.filtered_pair(target, feature, sample_ics)?;
        let n = tv.len();
        if n < 2 * min_samples {
            return Ok(None);
        }

        // Category code -> positions into tv, ascending by code.
        let mut right_map: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (pos, &code) in fv.iter().enumerate() {
            right_map.entry(code as usize).or_default().push(pos);
        }
        let mut left_map: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

        let fitness = if target_is_numerical {
            greedy_transfer_by_sse(&tv, &mut left_map, &mut right_map)
        } else {
            greedy_transfer_by_squared_frequency(&tv, &mut left_map, &mut right_map)
        };

        let n_left: usize = left_map.values().map(Vec::len).sum();
        let n_right = n - n_left;
        if n_left < min_samples || n_right < min_samples {
            return Ok(None);
        }

        Ok(Some(CategoricalSplit {
            fitness,
            left_categories: left_map.keys().copied().collect(),
            right_categories: right_map.keys().copied().collect(),
            left: left_map.values().flatten().map(|&p| kept[p]).collect(),
            right: right_map.values().flatten().map(|&p| kept[p]).collect(),
        }))
    }

    /// Filter `sample_ics` to rows where both columns are non-missing and
    /// sort the survivors by feature value ascending (stable).
    fn filtered_sorted_pair(
        &self,
        target: usize,
        feature: usize,
        sample_ics: &[usize],
    ) -> Result<(Vec<f64>, Vec<f64>, Vec<usize>), FrameError> {
        let (tv, fv, kept) = self.filtered_pair(target, feature, sample_ics)?;
        let (sorted_fv, perm) = math::filter_sort(&fv);
        let sorted_tv = perm.iter().map(|&i| tv[i]).collect();
        let sorted_kept = perm.iter().map(|&i| kept[i]).collect();
        Ok((sorted_tv, sorted_fv, sorted_kept))
    }
}

/// Scan all admissible boundaries of the feature-sorted pair, minimising the
/// summed child SSE of the numerical target.
///
/// Returns the boundary index (last position of the left child) and the
/// fitness `(S_tot - S_best) / S_tot`.
fn best_boundary_by_sse(tv: &[f64], fv: &[f64], min_samples: usize) -> Option<(usize, f64)> {
    let n = tv.len();

    // Prefix SSE: sse_left[k] covers tv[0..=k].
    let mut acc = RunningMoments::new();
    let mut sse_left = Vec::with_capacity(n);
    for &x in tv {
        acc.add(x);
        sse_left.push(acc.sse());
    }
    let sse_tot = sse_left[n - 1];

    let mut best: Option<usize> = None;
    let mut sse_best = sse_tot;
    let mut right = RunningMoments::new();

    // k is the first position of the right child; right accumulates
    // tv[k..] as k descends.
    for k in (min_samples..n).rev() {
        right.add(tv[k]);
        if n - k < min_samples {
            continue;
        }
        if fv[k - 1] == fv[k] {
            continue;
        }
        let cost = sse_left[k - 1] + right.sse();
        if cost < sse_best {
            sse_best = cost;
            best = Some(k - 1);
        }
    }

    best.map(|boundary| (boundary, (sse_tot - sse_best) / sse_tot))
}

/// Scan all admissible boundaries of the feature-sorted pair, maximising the
/// weighted squared-frequency sum of the categorical target.
///
/// A candidate wins when `n_r * sf_l + n_l * sf_r > n_l * n_r * nsf_best`
/// (the scaled form of comparing `sf_l/n_l + sf_r/n_r` against the running
/// best). Fitness is `(n * nsf_best - sf_tot) / (n^2 - sf_tot)`.
fn best_boundary_by_squared_frequency(
    tv: &[f64],
    fv: &[f64],
    min_samples: usize,
) -> Option<(usize, f64)> {
    let n = tv.len();

    let mut acc = SquaredFrequency::new();
    let mut sf_left = Vec::with_capacity(n);
    for &x in tv {
        acc.add(x as usize);
        sf_left.push(acc.sum_sq());
    }
    let sf_tot = sf_left[n - 1];

    let mut best: Option<usize> = None;
    let mut nsf_best = sf_tot as f64 / n as f64;
    let mut right = SquaredFrequency::new();

    for k in (min_samples..n).rev() {
        right.add(tv[k] as usize);
        if n - k < min_samples {
            continue;
        }
        if fv[k - 1] == fv[k] {
            continue;
        }
        let n_left = k as f64;
        let n_right = (n - k) as f64;
        let sf_l = sf_left[k - 1] as f64;
        let sf_r = right.sum_sq() as f64;
        if n_right * sf_l + n_left * sf_r > n_left * n_right * nsf_best {
            nsf_best = sf_l / n_left + sf_r / n_right;
            best = Some(k - 1);
        }
    }

    let n_f = n as f64;
    best.map(|boundary| {
        (
            boundary,
            (n_f * nsf_best - sf_tot as f64) / (n_f * n_f - sf_tot as f64),
        )
    })
}

/// Greedy category transfer minimising summed child SSE of a numerical
/// target. Moves committed categories from `right_map` into `left_map` and
/// returns the fitness of the committed split.
fn greedy_transfer_by_sse(
    tv: &[f64],
    left_map: &mut BTreeMap<usize, Vec<usize>>,
    right_map: &mut BTreeMap<usize, Vec<usize>>,
) -> f64 {
    let mut right = RunningMoments::from_values(tv);
    let mut left = RunningMoments::new();
    let sse_tot = right.sse();
    let mut sse_best = sse_tot;

    while right_map.len() > 1 {
        let mut best_code: Option<usize> = None;

        for (&code, positions) in right_map.iter() {
            // Tentatively move this category left.
            for &p in positions {
                left.add(tv[p]);
                right.remove(tv[p]);
            }
            let cost = left.sse() + right.sse();
            if cost < sse_best {
                sse_best = cost;
                best_code = Some(code);
            }
            // Revert, each decrement undoing its increment.
            for &p in positions {
                right.add(tv[p]);
                left.remove(tv[p]);
            }
        }

        let Some(code) = best_code else { break };
        let positions = right_map
            .remove(&code)
            .expect("committed category came from the right map");
        for &p in &positions {
            left.add(tv[p]);
            right.remove(tv[p]);
        }
        left_map.insert(code, positions);
    }

    (sse_tot - sse_best) / sse_tot
}

/// Greedy category transfer maximising the weighted squared-frequency sum of
/// a categorical target. Same shape as the SSE variant.
fn greedy_transfer_by_squared_frequency(
    tv: &[f64],
    left_map: &mut BTreeMap<usize, Vec<usize>>,
    right_map: &mut BTreeMap<usize, Vec<usize>>,
) -> f64 {
    let n = tv.len();
    let mut right = SquaredFrequency::new();
    for &x in tv {
        right.add(x as usize);
    }
    let mut left = SquaredFrequency::new();
    let sf_tot = right.sum_sq();
    let mut nsf_best = sf_tot as f64 / n as f64;

    while right_map.len() > 1 {
        let mut best_code: Option<usize> = None;

        for (&code, positions) in right_map.iter() {
            for &p in positions {
                left.add(tv[p] as usize);
                right.remove(tv[p] as usize);
            }
            let n_l = left.len() as f64;
            let n_r = right.len() as f64;
            let sf_l = left.sum_sq() as f64;
            let sf_r = right.sum_sq() as f64;
            if n_r * sf_l + n_l * sf_r > n_l * n_r * nsf_best {
                nsf_best = sf_l / n_l + sf_r / n_r;
                best_code = Some(code);
            }
            for &p in positions {
                right.add(tv[p] as usize);
                left.remove(tv[p] as usize);
            }
        }

        let Some(code) = best_code else { break };
        let positions = right_map
            .remove(&code)
            .expect("committed category came from the right map");
        for &p in &positions {
            left.add(tv[p] as usize);
            right.remove(tv[p] as usize);
        }
        left_map.insert(code, positions);
    }

    let n_f = n as f64;
    (n_f * nsf_best - sf_tot as f64) / (n_f * n_f - sf_tot as f64)
}
