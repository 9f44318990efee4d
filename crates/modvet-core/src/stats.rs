// crates/modvet-core/src/stats.rs
// ============================================================================
// Module: Validation Statistics
// Description: Aggregate build, test, and vet outcomes across packages.
// Purpose: Feed the tabulation report with counts, fractions, and spreads.
// Dependencies: crate::model
// ============================================================================

//! ## Overview
//! [`Tabulation::from_packages`] splits packages by download outcome into two
//! [`Accumulator`]s. Helpers summarize the collected series: mean and sample
//! standard deviation, a fixed set of percentiles, and the modules with the
//! most versions. Every ratio treats a zero denominator as zero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::model::Package;

// ============================================================================
// SECTION: Accumulator
// ============================================================================

/// Running totals and per-package series for one group of packages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    /// Packages observed.
    pub seen: u64,
    /// Packages whose download failed.
    pub download_failed: u64,
    /// Packages where every build passed.
    pub build_success: u64,
    /// Packages where every test passed.
    pub test_success: u64,
    /// Packages with no testable targets.
    pub no_test_targets: u64,
    /// Packages with at least one vetted target and no vet failures.
    pub all_vets_passed: u64,
    /// Packages with no formatting failures.
    pub all_fmt_ok: u64,
    /// Buildable target count per package.
    pub build_targets: Vec<f64>,
    /// Testable target count per package.
    pub test_targets: Vec<f64>,
    /// Fraction of buildable targets that built, per package.
    pub build_fractions: Vec<f64>,
    /// Fraction of testable targets that passed, per package.
    pub test_fractions: Vec<f64>,
    /// Fraction of vetted targets that passed vet, per package.
    pub vet_fractions: Vec<f64>,
    /// Failed build count per package (zero when all builds passed).
    pub failed_builds: Vec<f64>,
    /// Failed test count per package whose tests did not all pass.
    pub failed_tests: Vec<f64>,
    /// Failed vet count per package.
    pub failed_vets: Vec<f64>,
    /// Formatting failure count per package.
    pub failed_fmt: Vec<f64>,
    /// Failed test count for packages whose builds all passed but tests did not.
    pub passed_build_failed_tests: Vec<f64>,
    /// Observed versions per module path.
    pub version_counts: BTreeMap<String, u64>,
}

/// Percentile summary of a series. The default is all zeroes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Percentiles {
    /// 50th percentile.
    pub median: f64,
    /// 75th percentile.
    pub p75: f64,
    /// 90th percentile.
    pub p90: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 99th percentile.
    pub p99: f64,
    /// Largest value.
    pub max: f64,
}

/// Number of versions seen for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCount {
    /// Module path.
    pub module: String,
    /// Versions observed.
    pub versions: u64,
}

impl Accumulator {
    /// Folds one package into the totals.
    pub fn observe(&mut self, package: &Package) {
        self.seen += 1;
        *self.version_counts.entry(package.key.module().to_string()).or_default() += 1;
        let record = &package.record;
        if !record.download_succeeded {
            self.download_failed += 1;
            return;
        }

        let buildable = as_f64(record.buildable_targets);
        let testable = as_f64(record.testable_targets);
        let failed_builds = len_f64(&record.failed_builds);
        let failed_tests = len_f64(&record.failed_tests);
        let failed_fmt = len_f64(&record.failed_fmt);
        let passed_vets = len_f64(&record.passed_vets);
        let failed_vets = len_f64(&record.failed_vets);

        if record.testable_targets == 0 {
            self.no_test_targets += 1;
        }
        self.build_targets.push(buildable);
        self.test_targets.push(testable);

        if record.all_builds_pass {
            self.build_success += 1;
            self.build_fractions.push(1.0);
            self.failed_builds.push(0.0);
        } else {
            self.build_fractions.push(ratio(buildable - failed_builds, buildable));
            self.failed_builds.push(failed_builds);
        }

        if record.all_tests_pass {
            self.test_success += 1;
            self.test_fractions.push(1.0);
        } else {
            self.test_fractions.push(ratio(testable - failed_tests, testable));
            self.failed_tests.push(failed_tests);
            if record.all_builds_pass {
                self.passed_build_failed_tests.push(failed_tests);
            }
        }

        self.vet_fractions.push(ratio(passed_vets, passed_vets + failed_vets));
        if !record.passed_vets.is_empty() && record.failed_vets.is_empty() {
            self.all_vets_passed += 1;
        }
        if record.failed_fmt.is_empty() {
            self.all_fmt_ok += 1;
        }
        self.failed_vets.push(failed_vets);
        self.failed_fmt.push(failed_fmt);
    }

    /// Returns the `n` modules with the most versions.
    ///
    /// Ordered by descending count, ties broken by module path.
    #[must_use]
    pub fn most_frequent_modules(&self, n: usize) -> Vec<ModuleCount> {
        let mut counts: Vec<ModuleCount> = self
            .version_counts
            .iter()
            .map(|(module, versions)| ModuleCount {
                module: module.clone(),
                versions: *versions,
            })
            .collect();
        counts.sort_by(|left, right| {
            right.versions.cmp(&left.versions).then_with(|| left.module.cmp(&right.module))
        });
        counts.truncate(n);
        counts
    }
}

// ============================================================================
// SECTION: Tabulation
// ============================================================================

/// Accumulators for successful and failed downloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tabulation {
    /// Packages whose download succeeded. `download_failed` counts the rest.
    pub succeeded: Accumulator,
    /// Packages whose download failed.
    pub failed: Accumulator,
}

impl Tabulation {
    /// Splits packages by download outcome and accumulates each group.
    #[must_use]
    pub fn from_packages(packages: impl IntoIterator<Item = Package>) -> Self {
        let mut tabulation = Self::default();
        for package in packages {
            if package.record.download_succeeded {
                tabulation.succeeded.observe(&package);
            } else {
                tabulation.succeeded.download_failed += 1;
                tabulation.failed.observe(&package);
            }
        }
        tabulation
    }
}

// ============================================================================
// SECTION: Summaries
// ============================================================================

/// Returns the mean and sample standard deviation of `data`.
///
/// With `exclude_zeroes` zero entries are skipped. Empty input yields
/// `(0.0, 0.0)`; a single value has zero deviation.
#[must_use]
pub fn mean_and_stddev(data: &[f64], exclude_zeroes: bool) -> (f64, f64) {
    let values: Vec<f64> =
        data.iter().copied().filter(|value| !exclude_zeroes || *value != 0.0).collect();
    let count = len_f64(&values);
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / count;
    if values.len() == 1 {
        return (mean, 0.0);
    }
    let squares: f64 = values.iter().map(|value| (value - mean) * (value - mean)).sum();
    (mean, (squares / (count - 1.0)).sqrt())
}

/// Returns the median, 75th, 90th, 95th, 99th percentiles and the maximum.
///
/// Uses nearest-rank indexing (`pct * len / 100`) over a sorted copy.
#[must_use]
pub fn percentiles(data: &[f64]) -> Option<Percentiles> {
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let max = *sorted.last()?;
    let at = |pct: usize| sorted[pct * sorted.len() / 100];
    Some(Percentiles {
        median: at(50),
        p75: at(75),
        p90: at(90),
        p95: at(95),
        p99: at(99),
        max,
    })
}

/// Returns `part` as a percentage of `base`, or zero when `base` is zero.
#[must_use]
pub fn percent(part: u64, base: u64) -> f64 {
    ratio(as_f64(part), as_f64(base)) * 100.0
}

/// Divides, treating a zero denominator as a zero result.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 { 0.0 } else { numerator / denominator }
}

/// Converts a count to `f64`.
#[allow(clippy::cast_precision_loss, reason = "Package counts stay far below 2^52.")]
fn as_f64(value: u64) -> f64 {
    value as f64
}

/// Returns a slice length as `f64`.
#[allow(clippy::cast_precision_loss, reason = "Target lists stay far below 2^52.")]
fn len_f64<T>(items: &[T]) -> f64 {
    items.len() as f64
}

// ============================================================================
// SECTION: Tests
// ============================================================================
