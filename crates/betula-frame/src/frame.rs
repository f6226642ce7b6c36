//! The in-memory feature frame: typed columns, contrast shadows, and
//! filtered index views.
//!
//! A frame holds `2F` columns for `F` user features: positions `[0, F)` are
//! the user columns, positions `[F, 2F)` their contrast shadows — copies
//! whose non-missing values were shuffled once at construction so they carry
//! the same marginal distribution but no signal. Split finders consult
//! contrast columns exactly like user columns; the ensemble layer compares
//! the two populations to score feature significance.

use std::collections::HashMap;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::column::{ColumnKind, ColumnSpec, FeatureColumn, is_missing};
use crate::error::FrameError;
use crate::math;

/// Suffix appended to a user column's name to form its contrast's name.
pub const CONTRAST_SUFFIX: &str = "_CONTRAST";

/// Layout of the raw string matrix handed to [`DataFrame::from_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// `matrix[feature][sample]`
    FeaturesAsRows,
    /// `matrix[sample][feature]`
    SamplesAsRows,
}

/// An immutable-by-default feature matrix with paired contrast columns and
/// an owned RNG.
///
/// All sampling and permutation randomness flows through the frame-owned
/// generator, so a fixed seed makes construction, contrast permutation, and
/// bootstrap draws reproducible end to end. Split finding never mutates the
/// frame; only [`DataFrame::permute_contrasts`], the whitelist/blacklist
/// rebuilds, column replacement, and bootstrap draws require `&mut self`.
#[derive(Debug, Clone)]
pub struct DataFrame {
    samples: Vec<String>,
    columns: Vec<FeatureColumn>,
    name_index: HashMap<String, usize>,
    rng: ChaCha8Rng,
}

impl DataFrame {
    /// Build a frame from a raw string matrix.
    ///
    /// The matrix may be row- or column-oriented; cells are addressed by
    /// index math, no transposed copy is made. Each feature is encoded
    /// according to its [`ColumnSpec`], a `_CONTRAST` shadow is appended
    /// for every user column, and the shadows are permuted once using the
    /// seeded generator. `seed: None` draws a seed from the OS, which is
    /// what non-reproducible production runs want.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`FrameError::EmptyDataset`] | `samples` is empty |
    /// | [`FrameError::ZeroFeatures`] | `specs` is empty |
    /// | [`FrameError::ColumnCountMismatch`] | matrix shape disagrees with `specs` |
    /// | [`FrameError::SampleCountMismatch`] | matrix shape disagrees with `samples` |
    /// | [`FrameError::DuplicateFeatureName`] | two columns (contrasts included) share a name |
    /// | [`FrameError::InvalidNumericValue`] | a numerical cell fails to parse |
    #[instrument(skip_all, fields(n_features = specs.len(), n_samples = samples.len()))]
    pub fn from_raw(
        matrix: &[Vec<String>],
        orientation: Orientation,
        specs: &[ColumnSpec],
        samples: Vec<String>,
        seed: Option<u64>,
    ) -> Result<Self, FrameError> {
        let n_features = specs.len();
        let n_samples = samples.len();
        if n_samples == 0 {
            return Err(FrameError::EmptyDataset);
        }
        if n_features == 0 {
            return Err(FrameError::ZeroFeatures);
        }

        match orientation {
            Orientation::FeaturesAsRows => {
                if matrix.len() != n_features {
                    return Err(FrameError::ColumnCountMismatch {
                        expected: n_features,
                        got: matrix.len(),
                    });
                }
                for row in matrix {
                    if row.len() != n_samples {
                        return Err(FrameError::SampleCountMismatch {
                            expected: n_samples,
                            got: row.len(),
                        });
                    }
                }
            }
            Orientation::SamplesAsRows => {
                if matrix.len() != n_samples {
                    return Err(FrameError::SampleCountMismatch {
                        expected: n_samples,
                        got: matrix.len(),
                    });
                }
                for row in matrix {
                    if row.len() != n_features {
                        return Err(FrameError::ColumnCountMismatch {
                            expected: n_features,
                            got: row.len(),
                        });
                    }
                }
            }
        }

        let mut columns = Vec::with_capacity(2 * n_features);
        for (f, spec) in specs.iter().enumerate() {
            let raw: Vec<String> = (0..n_samples)
                .map(|s| match orientation {
                    Orientation::FeaturesAsRows => matrix[f][s].clone(),
                    Orientation::SamplesAsRows => matrix[s][f].clone(),
                })
                .collect();
            let column = match spec.kind {
                ColumnKind::Numerical => FeatureColumn::from_numerical_raw(&spec.name, &raw)?,
                ColumnKind::Categorical => FeatureColumn::from_categorical_raw(&spec.name, &raw),
            };
            columns.push(column);
        }

        // Contrast shadows: same values, same kind, name + suffix.
        for f in 0..n_features {
            let mut shadow = columns[f].clone();
            shadow.set_name(format!("{}{CONTRAST_SUFFIX}", columns[f].name()));
            columns.push(shadow);
        }

        let name_index = Self::build_name_index(&columns)?;

        let rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut frame = Self {
            samples,
            columns,
            name_index,
            rng,
        };
        frame.permute_contrasts();

        info!(
            n_features,
            n_samples,
            seeded = seed.is_some(),
            "feature frame constructed"
        );

        Ok(frame)
    }

    fn build_name_index(
        columns: &[FeatureColumn],
    ) -> Result<HashMap<String, usize>, FrameError> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            if index.insert(column.name().to_string(), i).is_some() {
                return Err(FrameError::DuplicateFeatureName {
                    name: column.name().to_string(),
                });
            }
        }
        Ok(index)
    }

    // --- shape accessors ---

    /// Return the number of user features (contrasts excluded).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.columns.len() / 2
    }

    /// Return the number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Return the total number of columns, contrasts included (`2F`).
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Look up a column by index, contrasts included.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::FeatureIndexOutOfRange`] for `index >= 2F`.
    pub fn column(&self, index: usize) -> Result<&FeatureColumn, FrameError> {
        self.columns
            .get(index)
            .ok_or(FrameError::FeatureIndexOutOfRange {
                index,
                n_columns: self.columns.len(),
            })
    }

    /// Resolve a column name to its index.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownFeatureName`] when no column has the
    /// name.
    pub fn feature_index(&self, name: &str) -> Result<usize, FrameError> {
        self.name_index
            .get(name)
            .copied()
            .ok_or_else(|| FrameError::UnknownFeatureName {
                name: name.to_string(),
            })
    }

    /// Return a column's name.
    pub fn feature_name(&self, index: usize) -> Result<&str, FrameError> {
        Ok(self.column(index)?.name())
    }

    /// Return a sample identifier.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::SampleIndexOutOfRange`] for `index >= N`.
    pub fn sample_name(&self, index: usize) -> Result<&str, FrameError> {
        self.samples
            .get(index)
            .map(String::as_str)
            .ok_or(FrameError::SampleIndexOutOfRange {
                index,
                n_samples: self.samples.len(),
            })
    }

    /// Return `true` when the column is numerical.
    pub fn is_numerical(&self, index: usize) -> Result<bool, FrameError> {
        Ok(self.column(index)?.is_numerical())
    }

    /// Count the non-missing entries of a column.
    pub fn n_real_samples(&self, index: usize) -> Result<usize, FrameError> {
        Ok(self.column(index)?.n_real())
    }

    /// Count the rows where both columns are non-missing.
    pub fn n_real_samples_pair(&self, first: usize, second: usize) -> Result<usize, FrameError> {
        let a = self.column(first)?.values();
        let b = self.column(second)?.values();
        Ok(a.iter()
            .zip(b)
            .filter(|(x, y)| !is_missing(**x) && !is_missing(**y))
            .count())
    }

    /// Return the number of categories of a column (0 for numerical).
    pub fn n_categories(&self, index: usize) -> Result<usize, FrameError> {
        Ok(self.column(index)?.n_categories())
    }

    /// Return the largest category count over the user columns.
    #[must_use]
    pub fn n_max_categories(&self) -> usize {
        self.columns[..self.n_features()]
            .iter()
            .map(FeatureColumn::n_categories)
            .max()
            .unwrap_or(0)
    }

    /// Return a column's category labels ordered by code.
    pub fn categories(&self, index: usize) -> Result<&[String], FrameError> {
        Ok(self.column(index)?.categories())
    }

    // --- data views ---

    /// Return a column's full value vector (codes for categorical columns,
    /// NaN for missing).
    pub fn feature_data(&self, index: usize) -> Result<&[f64], FrameError> {
        Ok(self.column(index)?.values())
    }

    /// Return one value.
    pub fn value(&self, index: usize, sample: usize) -> Result<f64, FrameError> {
        let column = self.column(index)?;
        if sample >= column.len() {
            return Err(FrameError::SampleIndexOutOfRange {
                index: sample,
                n_samples: column.len(),
            });
        }
        Ok(column.value(sample))
    }

    /// Return the values at the given sample positions, missing included.
    pub fn feature_data_subset(
        &self,
        index: usize,
        sample_ics: &[usize],
    ) -> Result<Vec<f64>, FrameError> {
        let column = self.column(index)?;
        sample_ics
            .iter()
            .map(|&s| {
                if s >= column.len() {
                    return Err(FrameError::SampleIndexOutOfRange {
                        index: s,
                        n_samples: column.len(),
                    });
                }
                Ok(column.value(s))
            })
            .collect()
    }

    /// Return the non-missing values at the given sample positions together
    /// with the surviving positions, order preserved.
    pub fn filtered_feature_data(
        &self,
        index: usize,
        sample_ics: &[usize],
    ) -> Result<(Vec<f64>, Vec<usize>), FrameError> {
        let column = self.column(index)?;
        let mut values = Vec::with_capacity(sample_ics.len());
        let mut kept = Vec::with_capacity(sample_ics.len());
        for &s in sample_ics {
            let v = column.value(s);
            if !is_missing(v) {
                values.push(v);
                kept.push(s);
            }
        }
        Ok((values, kept))
    }

    /// Return the rows of `sample_ics` where both columns are non-missing:
    /// `(first values, second values, surviving positions)`, order
    /// preserved.
    pub fn filtered_pair(
        &self,
        first: usize,
        second: usize,
        sample_ics: &[usize],
    ) -> Result<(Vec<f64>, Vec<f64>, Vec<usize>), FrameError> {
        let a = self.column(first)?;
        let b = self.column(second)?;
        let mut av = Vec::with_capacity(sample_ics.len());
        let mut bv = Vec::with_capacity(sample_ics.len());
        let mut kept = Vec::with_capacity(sample_ics.len());
        for &s in sample_ics {
            let x = a.value(s);
            let y = b.value(s);
            if !is_missing(x) && !is_missing(y) {
                av.push(x);
                bv.push(y);
                kept.push(s);
            }
        }
        Ok((av, bv, kept))
    }

    /// Render one value back to raw text.
    pub fn raw_value(&self, index: usize, sample: usize) -> Result<String, FrameError> {
        let column = self.column(index)?;
        if sample >= column.len() {
            return Err(FrameError::SampleIndexOutOfRange {
                index: sample,
                n_samples: column.len(),
            });
        }
        column.raw_value(sample)
    }

    /// Render a whole column back to raw text.
    pub fn raw_values(&self, index: usize) -> Result<Vec<String>, FrameError> {
        (0..self.n_samples())
            .map(|s| self.raw_value(index, s))
            .collect()
    }

    /// Pearson correlation of two columns over the rows where both are
    /// non-missing. NaN when fewer than two such rows exist or a side is
    /// constant.
    pub fn pearson_correlation(&self, first: usize, second: usize) -> Result<f64, FrameError> {
        let all: Vec<usize> = (0..self.n_samples()).collect();
        let (a, b, _) = self.filtered_pair(first, second, &all)?;
        Ok(math::pearson_correlation(&a, &b))
    }

    // --- mutation ---

    /// Keep only the named user columns (and their paired contrasts).
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownFeatureName`] when a name does not
    /// resolve to a user column.
    pub fn whitelist(&mut self, names: &[&str]) -> Result<(), FrameError> {
        let keep = self.user_mask(names, true)?;
        self.whitelist_mask(&keep)
    }

    /// Drop the named user columns (and their paired contrasts).
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownFeatureName`] when a name does not
    /// resolve to a user column.
    pub fn blacklist(&mut self, names: &[&str]) -> Result<(), FrameError> {
        let keep = self.user_mask(names, false)?;
        self.whitelist_mask(&keep)
    }

    fn user_mask(&self, names: &[&str], value: bool) -> Result<Vec<bool>, FrameError> {
        let n_features = self.n_features();
        let mut mask = vec![!value; n_features];
        for name in names {
            let idx = self.feature_index(name)?;
            if idx >= n_features {
                // Contrast columns follow their user column; they are not
                // selectable on their own.
                return Err(FrameError::UnknownFeatureName {
                    name: (*name).to_string(),
                });
            }
            mask[idx] = value;
        }
        Ok(mask)
    }

    /// Keep the user columns flagged in `keep` (length `F`), preserving the
    /// user/contrast pairing, and rebuild the name index.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ColumnCountMismatch`] when `keep` is not of
    /// length `F`.
    pub fn whitelist_mask(&mut self, keep: &[bool]) -> Result<(), FrameError> {
        let n_features = self.n_features();
        if keep.len() != n_features {
            return Err(FrameError::ColumnCountMismatch {
                expected: n_features,
                got: keep.len(),
            });
        }

        let n_kept = keep.iter().filter(|&&k| k).count();
        let mut columns = Vec::with_capacity(2 * n_kept);
        for (i, column) in self.columns[..n_features].iter().enumerate() {
            if keep[i] {
                columns.push(column.clone());
            }
        }
        for (i, column) in self.columns[n_features..].iter().enumerate() {
            if keep[i] {
                columns.push(column.clone());
            }
        }

        debug!(n_before = n_features, n_after = n_kept, "whitelist rebuild");

        self.name_index = Self::build_name_index(&columns)
            .expect("names were unique before the rebuild");
        self.columns = columns;
        Ok(())
    }

    /// Replace a column's values wholesale with numerical data; the column
    /// becomes numerical and its category maps are cleared.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::SampleCountMismatch`] when the length differs
    /// from the frame's sample count.
    pub fn replace_with_numerical(
        &mut self,
        index: usize,
        values: Vec<f64>,
    ) -> Result<(), FrameError> {
        if values.len() != self.n_samples() {
            return Err(FrameError::SampleCountMismatch {
                expected: self.n_samples(),
                got: values.len(),
            });
        }
        let name = self.column(index)?.name().to_string();
        self.columns[index] = FeatureColumn::from_values(name, values);
        Ok(())
    }

    /// Replace a column's values wholesale with raw string data; the column
    /// becomes categorical with a fresh first-seen encoding.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::SampleCountMismatch`] when the length differs
    /// from the frame's sample count.
    pub fn replace_with_categorical(
        &mut self,
        index: usize,
        raw: &[String],
    ) -> Result<(), FrameError> {
        if raw.len() != self.n_samples() {
            return Err(FrameError::SampleCountMismatch {
                expected: self.n_samples(),
                got: raw.len(),
            });
        }
        let name = self.column(index)?.name().to_string();
        self.columns[index] = FeatureColumn::from_categorical_raw(name, raw);
        Ok(())
    }

    /// Shuffle every contrast column's non-missing values in place,
    /// leaving missing entries where they are.
    ///
    /// Draws from the frame RNG, so a fixed construction seed fixes the
    /// permutation.
    #[instrument(skip(self))]
    pub fn permute_contrasts(&mut self) {
        let n_features = self.columns.len() / 2;
        let Self { columns, rng, .. } = self;
        for column in &mut columns[n_features..] {
            let values = column.values_mut();
            let real: Vec<usize> = (0..values.len())
                .filter(|&s| !is_missing(values[s]))
                .collect();
            let mut shuffled: Vec<f64> = real.iter().map(|&s| values[s]).collect();
            shuffled.shuffle(rng);
            for (&s, &v) in real.iter().zip(&shuffled) {
                values[s] = v;
            }
        }
    }

    pub(crate) fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}
