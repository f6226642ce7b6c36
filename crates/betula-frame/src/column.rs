//! Typed feature columns and missing-value encoding.
//!
//! A column stores its observations as `f64` regardless of kind: numerical
//! columns hold raw measurements, categorical columns hold integer codes in
//! `[0, C)` assigned in first-seen order, and absent observations hold the
//! canonical NaN sentinel in both.

use std::collections::HashMap;

use crate::error::FrameError;

/// String form of the missing sentinel, used when a missing value is
/// rendered back to raw text.
pub const MISSING_STR: &str = "NA";

/// Raw spellings recognised as missing at encode time (case-folded).
const MISSING_SPELLINGS: [&str; 7] = ["", "NA", "NAN", "N/A", "NULL", "?", "#N/A"];

/// Return `true` when `value` is the missing sentinel.
///
/// The sentinel is NaN, whose defining property is that it compares unequal
/// to itself.
#[must_use]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Return `true` when a raw cell spells a missing value.
#[must_use]
pub fn is_missing_str(raw: &str) -> bool {
    let folded = raw.to_uppercase();
    MISSING_SPELLINGS.contains(&folded.as_str())
}

/// Whether a column holds raw measurements or category codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ColumnKind {
    /// Real-valued measurements.
    Numerical,
    /// Integer codes with a label map.
    Categorical,
}

/// Name and kind of one feature column, as declared by the loader.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ColumnSpec {
    /// Column name, unique within a frame.
    pub name: String,
    /// Column kind.
    pub kind: ColumnKind,
}

impl ColumnSpec {
    /// Create a spec from a name and kind.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Parse a feature header of the form `<type><delimiter><rest>`.
    ///
    /// Type prefix `N` declares a numerical column; `C` and `B`
    /// (categorical and binary) declare categorical columns. The full
    /// header, prefix included, becomes the column name.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidHeader`] when the prefix is none of
    /// `N`/`C`/`B` or the delimiter is absent.
    pub fn parse_header(header: &str, delimiter: char) -> Result<Self, FrameError> {
        let invalid = || FrameError::InvalidHeader {
            header: header.to_string(),
        };
        let (prefix, _rest) = header.split_once(delimiter).ok_or_else(invalid)?;
        let kind = match prefix {
            "N" => ColumnKind::Numerical,
            "C" | "B" => ColumnKind::Categorical,
            _ => return Err(invalid()),
        };
        Ok(Self::new(header, kind))
    }
}

/// One typed column of the feature frame.
///
/// For categorical columns, `forward` (label → code) and `reverse`
/// (code → label, indexed by code) are mutual inverses of size `C`; both
/// are empty for numerical columns.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FeatureColumn {
    name: String,
    kind: ColumnKind,
    values: Vec<f64>,
    forward: HashMap<String, usize>,
    reverse: Vec<String>,
}

impl FeatureColumn {
    /// Build a numerical column from raw cells.
    ///
    /// Missing spellings encode to the NaN sentinel; everything else must
    /// parse as a number.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidNumericValue`] for a non-missing cell
    /// that does not parse.
    pub fn from_numerical_raw(name: impl Into<String>, raw: &[String]) -> Result<Self, FrameError> {
        let name = name.into();
        let mut values = Vec::with_capacity(raw.len());
        for (sample, cell) in raw.iter().enumerate() {
            if is_missing_str(cell) {
                values.push(f64::NAN);
            } else {
                let parsed: f64 = cell.parse().map_err(|_| FrameError::InvalidNumericValue {
                    column: name.clone(),
                    sample,
                    raw: cell.clone(),
                })?;
                values.push(parsed);
            }
        }
        Ok(Self {
            name,
            kind: ColumnKind::Numerical,
            values,
            forward: HashMap::new(),
            reverse: Vec::new(),
        })
    }

    /// Build a categorical column from raw cells, assigning codes in
    /// first-seen order.
    pub fn from_categorical_raw(name: impl Into<String>, raw: &[String]) -> Self {
        let mut forward: HashMap<String, usize> = HashMap::new();
        let mut reverse: Vec<String> = Vec::new();
        let mut values = Vec::with_capacity(raw.len());
        for cell in raw {
            if is_missing_str(cell) {
                values.push(f64::NAN);
                continue;
            }
            let code = *forward.entry(cell.clone()).or_insert_with(|| {
                reverse.push(cell.clone());
                reverse.len() - 1
            });
            values.push(code as f64);
        }
        Self {
            name: name.into(),
            kind: ColumnKind::Categorical,
            values,
            forward,
            reverse,
        }
    }

    /// Build a numerical column directly from values (NaN marks missing).
    pub fn from_values(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Numerical,
            values,
            forward: HashMap::new(),
            reverse: Vec::new(),
        }
    }

    /// Return the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the column.
    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Return the column kind.
    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Return `true` for numerical columns.
    #[must_use]
    pub fn is_numerical(&self) -> bool {
        self.kind == ColumnKind::Numerical
    }

    /// Return all values (codes for categorical columns, NaN for missing).
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Return one value by sample position.
    #[must_use]
    pub fn value(&self, sample: usize) -> f64 {
        self.values[sample]
    }

    /// Return the number of samples, missing included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` when the column has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Count the non-missing entries.
    #[must_use]
    pub fn n_real(&self) -> usize {
        self.values.iter().filter(|v| !is_missing(**v)).count()
    }

    /// Return the number of distinct categories (0 for numerical columns).
    #[must_use]
    pub fn n_categories(&self) -> usize {
        self.reverse.len()
    }

    /// Return the category labels ordered by code (empty for numerical
    /// columns).
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.reverse
    }

    /// Return the code for a label, if the label was observed.
    #[must_use]
    pub fn code_of(&self, label: &str) -> Option<usize> {
        self.forward.get(label).copied()
    }

    /// Return the label for a code, if the code exists.
    #[must_use]
    pub fn label_of(&self, code: usize) -> Option<&str> {
        self.reverse.get(code).map(String::as_str)
    }

    /// Render one value back to raw text: the formatted number for
    /// numerical columns, the label for categorical codes, [`MISSING_STR`]
    /// for missing entries.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownCategoryCode`] when a categorical value
    /// has no label in the reverse map.
    pub fn raw_value(&self, sample: usize) -> Result<String, FrameError> {
        let value = self.values[sample];
        if is_missing(value) {
            return Ok(MISSING_STR.to_string());
        }
        match self.kind {
            ColumnKind::Numerical => Ok(format!("{value}")),
            ColumnKind::Categorical => {
                let code = value as usize;
                self.label_of(code)
                    .map(str::to_string)
                    .ok_or_else(|| FrameError::UnknownCategoryCode {
                        column: self.name.clone(),
                        code,
                    })
            }
        }
    }

    /// Overwrite the values with the given permutation applied; used by
    /// contrast permutation, which shuffles only non-missing entries.
    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }
}
