//! Regression tests for betula-frame.
//!
//! These tests pin the analytic behaviour of the split finders and the
//! bootstrap on deterministic synthetic data, and exercise the full
//! loader-to-split flow through the public API: construct a frame from raw
//! strings, draw a bootstrap, split on the in-bag set, and check the
//! partition invariants.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use betula_frame::{ColumnKind, ColumnSpec, DataFrame, Orientation};

// ---------------------------------------------------------------------------
// Helpers: deterministic synthetic frames
// ---------------------------------------------------------------------------

fn strings(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|s| s.to_string()).collect()
}

/// Build a frame from per-column raw data.
fn frame_from(columns: &[(&str, ColumnKind, Vec<String>)], seed: u64) -> DataFrame {
    let matrix: Vec<Vec<String>> = columns.iter().map(|(_, _, c)| c.clone()).collect();
    let specs: Vec<ColumnSpec> = columns
        .iter()
        .map(|(name, kind, _)| ColumnSpec::new(*name, *kind))
        .collect();
    let n = columns[0].2.len();
    let samples: Vec<String> = (0..n).map(|i| format!("s{i}")).collect();
    DataFrame::from_raw(&matrix, Orientation::FeaturesAsRows, &specs, samples, Some(seed)).unwrap()
}

/// 60-sample frame: an informative numerical feature, a three-category
/// group column aligned with the target, a numerical target, and a
/// sprinkling of missing values in the feature columns.
fn make_regression_frame(seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n = 60;
    let groups = ["low", "mid", "high"];

    let mut age = Vec::with_capacity(n);
    let mut group = Vec::with_capacity(n);
    let mut score = Vec::with_capacity(n);
    for i in 0..n {
        let g = i % 3;
        // Every 10th age reading is missing.
        if i % 10 == 9 {
            age.push("NA".to_string());
        } else {
            age.push(format!("{:.3}", g as f64 * 10.0 + rng.r#gen::<f64>()));
        }
        group.push(groups[g].to_string());
        score.push(format!("{:.3}", g as f64 * 100.0 + rng.r#gen::<f64>() * 5.0));
    }

    frame_from(
        &[
            ("N:age", ColumnKind::Numerical, age),
            ("C:group", ColumnKind::Categorical, group),
            ("N:score", ColumnKind::Numerical, score),
        ],
        seed,
    )
}

// ---------------------------------------------------------------------------
// a) analytic split values
// ---------------------------------------------------------------------------

/// Numerical target 1..6 against feature [1,1,2,2,3,3]: S_tot = 17.5, the
/// admissible boundaries both cost 5.5, and the right-to-left sweep settles
/// on threshold 2.
#[test]
fn numerical_split_reference_values() {
    let frame = frame_from(
        &[
            ("N:y", ColumnKind::Numerical, strings(&["1", "2", "3", "4", "5", "6"])),
            ("N:x", ColumnKind::Numerical, strings(&["1", "1", "2", "2", "3", "3"])),
        ],
        42,
    );
    let all: Vec<usize> = (0..6).collect();
    let split = frame
        .numerical_feature_split(0, 1, 1, &all)
        .unwrap()
        .expect("split must exist");

    assert_eq!(split.threshold, 2.0);
    assert_eq!(split.left.len(), 4);
    assert_eq!(split.right.len(), 2);
    let expected = (17.5 - 5.5) / 17.5;
    assert!((split.fitness - expected).abs() < 1e-12);
}

/// Categorical target A/B split by an ordered feature separates perfectly
/// at feature value 3 with fitness 1.
#[test]
fn gini_split_reference_values() {
    let frame = frame_from(
        &[
            ("C:y", ColumnKind::Categorical, strings(&["A", "A", "A", "B", "B", "B"])),
            ("N:x", ColumnKind::Numerical, strings(&["1", "2", "3", "4", "5", "6"])),
        ],
        42,
    );
    let all: Vec<usize> = (0..6).collect();
    let split = frame
        .numerical_feature_split(0, 1, 1, &all)
        .unwrap()
        .expect("split must exist");

    assert_eq!(split.threshold, 3.0);
    assert!(split.fitness > 0.0);
    assert!((split.fitness - 1.0).abs() < 1e-12);
}

/// All feature values equal: no admissible boundary regardless of target.
#[test]
fn degenerate_feature_yields_no_split() {
    let frame = frame_from(
        &[
            ("N:y", ColumnKind::Numerical, strings(&["1", "2", "3", "4"])),
            ("C:z", ColumnKind::Categorical, strings(&["A", "B", "A", "B"])),
            ("N:x", ColumnKind::Numerical, strings(&["5", "5", "5", "5"])),
        ],
        42,
    );
    let all: Vec<usize> = (0..4).collect();
    assert!(frame.numerical_feature_split(0, 2, 1, &all).unwrap().is_none());
    assert!(frame.numerical_feature_split(1, 2, 1, &all).unwrap().is_none());
}

// ---------------------------------------------------------------------------
// b) bootstrap-to-split pipeline
// ---------------------------------------------------------------------------

/// Draw a bootstrap over the non-missing rows of the feature, then split the
/// in-bag set. The partition must cover every in-bag row (with multiplicity)
/// whose target and feature are both non-missing, and respect the threshold.
#[test]
fn bootstrap_then_split_invariants() {
    let mut frame = make_regression_frame(42);
    let target = frame.feature_index("N:score").unwrap();
    let feature = frame.feature_index("N:age").unwrap();

    let draw = frame.bootstrap_from_real_samples(true, 1.0, feature).unwrap();
    assert!(!draw.in_bag.is_empty());

    let split = frame
        .numerical_feature_split(target, feature, 3, &draw.in_bag)
        .unwrap()
        .expect("informative feature must split");

    let fv = frame.feature_data(feature).unwrap();
    let tv = frame.feature_data(target).unwrap();
    let n_usable = draw
        .in_bag
        .iter()
        .filter(|&&s| !fv[s].is_nan() && !tv[s].is_nan())
        .count();
    assert_eq!(split.left.len() + split.right.len(), n_usable);
    assert!(split.left.len() >= 3 && split.right.len() >= 3);
    for &s in &split.left {
        assert!(fv[s] <= split.threshold);
    }
    for &s in &split.right {
        assert!(fv[s] > split.threshold);
    }
    // One threshold can peel off at most one of the three score bands;
    // the analytic ceiling is 0.75.
    assert!(split.fitness > 0.5, "fitness {}", split.fitness);
}

/// The group column is aligned with the score bands, so the greedy transfer
/// must find a strongly improving bipartition of {low, mid, high}.
#[test]
fn categorical_split_on_aligned_groups() {
    let frame = make_regression_frame(42);
    let target = frame.feature_index("N:score").unwrap();
    let feature = frame.feature_index("C:group").unwrap();
    let all: Vec<usize> = (0..frame.n_samples()).collect();

    let split = frame
        .categorical_feature_split(target, feature, 5, &all)
        .unwrap()
        .expect("aligned groups must split");

    let n_categories = frame.n_categories(feature).unwrap();
    let mut covered: Vec<usize> = split
        .left_categories
        .iter()
        .chain(&split.right_categories)
        .copied()
        .collect();
    covered.sort_unstable();
    assert_eq!(covered, (0..n_categories).collect::<Vec<_>>());
    assert!(split.fitness > 0.5, "fitness {}", split.fitness);
}

// ---------------------------------------------------------------------------
// c) contrast columns
// ---------------------------------------------------------------------------

/// Contrast columns are consulted exactly like user columns; on permuted
/// noise the split fitness, when a split exists at all, must be far below
/// the informative column's.
#[test]
fn contrast_scores_below_user_column() {
    let frame = make_regression_frame(42);
    let target = frame.feature_index("N:score").unwrap();
    let feature = frame.feature_index("N:age").unwrap();
    let contrast = frame.feature_index("N:age_CONTRAST").unwrap();
    let all: Vec<usize> = (0..frame.n_samples()).collect();

    let user = frame
        .numerical_feature_split(target, feature, 3, &all)
        .unwrap()
        .expect("informative feature must split");
    if let Some(shadow) = frame
        .numerical_feature_split(target, contrast, 3, &all)
        .unwrap()
    {
        assert!(
            shadow.fitness < user.fitness,
            "contrast fitness {} >= user fitness {}",
            shadow.fitness,
            user.fitness
        );
    }
}

// ---------------------------------------------------------------------------
// d) reproducibility
// ---------------------------------------------------------------------------

/// Two frames built with the same seed must agree byte for byte on contrast
/// permutations and on successive bootstrap draws.
#[test]
fn same_seed_reproduces_contrasts_and_bootstraps() {
    let mut a = make_regression_frame(42);
    let mut b = make_regression_frame(42);

    for i in 0..a.n_columns() {
        assert_eq!(
            a.raw_values(i).unwrap(),
            b.raw_values(i).unwrap(),
            "column {i} differs across same-seed frames"
        );
    }

    for _ in 0..3 {
        let da = a.bootstrap_from_real_samples(true, 0.8, 0).unwrap();
        let db = b.bootstrap_from_real_samples(true, 0.8, 0).unwrap();
        assert_eq!(da, db);
        let da = a.bootstrap_from_real_samples(false, 0.5, 1).unwrap();
        let db = b.bootstrap_from_real_samples(false, 0.5, 1).unwrap();
        assert_eq!(da, db);
    }
}

/// Different seeds should produce different contrast permutations on a
/// column of 60 distinct values.
#[test]
fn different_seed_differs() {
    let a = make_regression_frame(42);
    let b = make_regression_frame(43);
    let i = a.feature_index("N:score_CONTRAST").unwrap();
    assert_ne!(a.raw_values(i).unwrap(), b.raw_values(i).unwrap());
}

// ---------------------------------------------------------------------------
// e) column management flow
// ---------------------------------------------------------------------------

/// Whitelisting down to one feature keeps its contrast paired and the split
/// entry points working on the rebuilt indices.
#[test]
fn whitelist_then_split() {
    let mut frame = make_regression_frame(42);
    frame.whitelist(&["N:age", "N:score"]).unwrap();
    assert_eq!(frame.n_features(), 2);

    let target = frame.feature_index("N:score").unwrap();
    let feature = frame.feature_index("N:age").unwrap();
    assert_eq!(
        frame.feature_index("N:age_CONTRAST").unwrap(),
        feature + frame.n_features()
    );

    let all: Vec<usize> = (0..frame.n_samples()).collect();
    let split = frame
        .numerical_feature_split(target, feature, 3, &all)
        .unwrap()
        .expect("split must survive the rebuild");
    assert!(split.fitness > 0.5);
}
