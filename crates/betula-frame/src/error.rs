/// Errors from feature-frame operations.
///
/// Every variant is a precondition violation in the sense of the public API
/// contract: the caller passed something the frame cannot act on. "No
/// admissible split" is deliberately *not* represented here — the split
/// finders report it as `Ok(None)` so that tree builders can treat it as a
/// routine leaf decision rather than a failure.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Returned when two feature columns share the same name at construction.
    #[error("duplicate feature name '{name}'")]
    DuplicateFeatureName {
        /// The name that appeared more than once.
        name: String,
    },

    /// Returned when a feature name lookup fails.
    #[error("feature '{name}' does not exist")]
    UnknownFeatureName {
        /// The name that could not be resolved.
        name: String,
    },

    /// Returned when a column index is outside `[0, 2F)`.
    #[error("feature index {index} out of range, frame has {n_columns} columns")]
    FeatureIndexOutOfRange {
        /// The offending column index.
        index: usize,
        /// The total number of columns (user + contrast).
        n_columns: usize,
    },

    /// Returned when a sample index is outside `[0, N)`.
    #[error("sample index {index} out of range, frame has {n_samples} samples")]
    SampleIndexOutOfRange {
        /// The offending sample index.
        index: usize,
        /// The number of samples in the frame.
        n_samples: usize,
    },

    /// Returned when the raw matrix shape disagrees with the column specs.
    #[error("raw matrix has {got} feature columns, specs declare {expected}")]
    ColumnCountMismatch {
        /// The number of columns the specs declare.
        expected: usize,
        /// The number of columns found in the raw matrix.
        got: usize,
    },

    /// Returned when the raw matrix shape disagrees with the sample list,
    /// or a replacement vector has the wrong length.
    #[error("expected {expected} samples, got {got}")]
    SampleCountMismatch {
        /// The number of samples the frame holds.
        expected: usize,
        /// The number of values provided.
        got: usize,
    },

    /// Returned when a frame is constructed with zero samples.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when a frame is constructed with zero feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a non-missing cell of a numerical column fails to
    /// parse as a number.
    #[error("column '{column}', sample {sample}: '{raw}' is not a number")]
    InvalidNumericValue {
        /// Name of the column being encoded.
        column: String,
        /// Zero-based sample index of the offending cell.
        sample: usize,
        /// The raw cell content.
        raw: String,
    },

    /// Returned when a feature header does not follow the
    /// `N`/`C`/`B` + delimiter convention.
    #[error("invalid feature header '{header}'")]
    InvalidHeader {
        /// The header that failed to parse.
        header: String,
    },

    /// Returned when `sample_fraction` is not strictly positive.
    #[error("sample fraction must be > 0, got {fraction}")]
    InvalidSampleFraction {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when sampling without replacement with a fraction above one.
    #[error("sampling without replacement requires fraction <= 1, got {fraction}")]
    FractionAboveOneWithoutReplacement {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when `min_samples` is zero.
    #[error("min_samples must be at least 1")]
    InvalidMinSamples,

    /// Returned when a split finder is given a feature column of the wrong
    /// kind.
    #[error("column {index} ('{name}') is not {expected} as the split requires")]
    WrongColumnKind {
        /// The offending column index.
        index: usize,
        /// The offending column name.
        name: String,
        /// The kind the operation requires ("numerical" or "categorical").
        expected: &'static str,
    },

    /// Returned when a categorical code has no label in the reverse map.
    #[error("column '{column}': unknown category code {code}")]
    UnknownCategoryCode {
        /// Name of the column whose reverse map was consulted.
        column: String,
        /// The code with no label.
        code: usize,
    },
}
