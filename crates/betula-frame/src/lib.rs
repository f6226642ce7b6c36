//! Feature frame and split-search engine for ensemble tree induction.
//!
//! Holds a heterogeneous tabular dataset in memory as typed columns
//! (numerical, or categorical with a bidirectional label map), pairs every
//! user column with a value-permuted `_CONTRAST` shadow for null-baseline
//! significance testing, and provides the two primitives a tree grower
//! needs: bootstrap/out-of-bag sampling over the non-missing rows of a
//! reference column, and exact split search (threshold splits on numerical
//! features, greedy category bipartition on categorical features) with
//! incremental variance and squared-frequency updates.
//!
//! The crate is single-threaded and does no I/O: an external loader builds
//! the frame from raw strings, an external grower drives sampling and split
//! search. Split finding never mutates the frame, so a frame may be shared
//! read-only across concurrent tree builders; the RNG-consuming operations
//! (bootstrap, contrast permutation) and the shape-changing ones take
//! `&mut self` and serialise through the borrow checker.

mod column;
mod error;
mod frame;
mod math;
mod sample;
mod split;

pub use column::{ColumnKind, ColumnSpec, FeatureColumn, MISSING_STR, is_missing, is_missing_str};
pub use error::FrameError;
pub use frame::{CONTRAST_SUFFIX, DataFrame, Orientation};
pub use math::{
    RunningMoments, SquaredFrequency, filter_sort, mean, pearson_correlation, sum_squared_error,
};
pub use sample::BootstrapSample;
pub use split::{CategoricalSplit, NumericalSplit};
