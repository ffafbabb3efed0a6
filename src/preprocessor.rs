//! Raw source preprocessing: drop `Time`, then a seeded stratified train/test split.

use crate::config::SplitConfig;
use crate::feature_extractor::FeatureExtractor;
use crate::types::dataset::{Dataset, RawTable};
use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;
use tracing::info;

/// Row positions assigned to each partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Per-class test quotas: floor of the proportional share, leftovers to the largest remainders.
fn allocate_test_counts(class_counts: &[usize], n_test: usize) -> Vec<usize> {
    let n: usize = class_counts.iter().sum();
    let mut counts: Vec<usize> = class_counts.iter().map(|&c| c * n_test / n).collect();

    let mut leftover = n_test - counts.iter().sum::<usize>();
    let mut order: Vec<usize> = (0..class_counts.len()).collect();
    // Larger remainder first, then larger class, then lower label
    order.sort_by(|&a, &b| {
        let rem_a = class_counts[a] * n_test % n;
        let rem_b = class_counts[b] * n_test % n;
        rem_b
            .cmp(&rem_a)
            .then(class_counts[b].cmp(&class_counts[a]))
            .then(a.cmp(&b))
    });

    for &class in order.iter().cycle() {
        if leftover == 0 {
            break;
        }
        if counts[class] < class_counts[class] {
            counts[class] += 1;
            leftover -= 1;
        }
    }
    counts
}

/// Split row positions so each partition keeps the label-class ratio.
///
/// Deterministic for a given `seed`; the partitions are disjoint and cover every row.
pub fn stratified_split(labels: &[u8], test_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_size > 0.0 && test_size < 1.0) {
        bail!("test_size must be in (0, 1), got {}", test_size);
    }
    let n = labels.len();
    if n < 2 {
        bail!("At least 2 rows are required to split, got {}", n);
    }

    let mut classes: Vec<u8> = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();

    let members: Vec<Vec<usize>> = classes
        .iter()
        .map(|&c| (0..n).filter(|&i| labels[i] == c).collect())
        .collect();
    if let Some(pos) = members.iter().position(|m| m.len() < 2) {
        bail!(
            "The least populated class in y has only 1 member (class {}), which is too few. \
             The minimum number of groups for any class cannot be less than 2.",
            classes[pos]
        );
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n - n_test;
    if n_test < classes.len() || n_train < classes.len() {
        bail!(
            "Partition sizes train={} test={} cannot hold all {} classes",
            n_train,
            n_test,
            classes.len()
        );
    }

    let class_counts: Vec<usize> = members.iter().map(Vec::len).collect();
    let test_counts = allocate_test_counts(&class_counts, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);

    for (mut rows, &take) in members.into_iter().zip(&test_counts) {
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..take]);
        train.extend_from_slice(&rows[take..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(SplitIndices { train, test })
}

/// Summary of one preprocessing run
#[derive(Debug, Clone)]
pub struct PreprocessSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_class_counts: [usize; 2],
    pub test_class_counts: [usize; 2],
}

/// Reads the raw source, drops `Time`, and writes stratified train/test partitions.
pub struct Preprocessor {
    config: SplitConfig,
    extractor: FeatureExtractor,
}

impl Preprocessor {
    pub fn new(config: SplitConfig) -> Self {
        Self {
            config,
            extractor: FeatureExtractor::for_raw_source(),
        }
    }

    /// Split an in-memory raw table into (train, test).
    pub fn split(&self, table: &RawTable) -> Result<(Dataset, Dataset)> {
        let dataset = self.extractor.extract(table)?;

        info!("Splitting data...");
        let labels = dataset.labels.to_vec();
        let indices = stratified_split(&labels, self.config.test_size, self.config.random_state)?;

        Ok((
            dataset.select_rows(&indices.train),
            dataset.select_rows(&indices.test),
        ))
    }

    pub fn run<P, Q, R>(&self, input: P, train_output: Q, test_output: R) -> Result<PreprocessSummary>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
    {
        let input = input.as_ref();
        info!(path = %input.display(), "Reading data");
        let table = RawTable::read_csv(input)?;

        let (train, test) = self.split(&table)?;

        info!(path = %train_output.as_ref().display(), rows = train.n_rows(), "Saving train data");
        train.write_csv(train_output)?;

        info!(path = %test_output.as_ref().display(), rows = test.n_rows(), "Saving test data");
        test.write_csv(test_output)?;

        let summary = PreprocessSummary {
            train_rows: train.n_rows(),
            test_rows: test.n_rows(),
            train_class_counts: train.class_counts(),
            test_class_counts: test.class_counts(),
        };
        info!(
            train_rows = summary.train_rows,
            test_rows = summary.test_rows,
            train_fraud = summary.train_class_counts[1],
            test_fraud = summary.test_class_counts[1],
            "Preprocessing complete"
        );

        Ok(summary)
    }
}
