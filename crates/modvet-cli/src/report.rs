// crates/modvet-cli/src/report.rs
// ============================================================================
// Module: Tabulation Report
// Description: LaTeX rendering of validation statistics.
// Purpose: Produce the build, test, and version tables for `modvet tabulate`.
// Dependencies: modvet-core
// ============================================================================

//! ## Overview
//! Renders a [`Tabulation`] as four LaTeX `table` environments: build
//! statistics and test statistics for packages that downloaded, then the
//! modules with the most versions for successful and failed downloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use modvet_core::Accumulator;
use modvet_core::Tabulation;
use modvet_core::mean_and_stddev;
use modvet_core::percent;
use modvet_core::percentiles;

/// Number of modules listed in each version table.
const VERSION_TABLE_ROWS: usize = 10;

// ============================================================================
// SECTION: Table Builder
// ============================================================================

/// Line-oriented builder for a two-column LaTeX table.
struct LatexTable {
    /// Rendered lines.
    lines: Vec<String>,
}

impl LatexTable {
    /// Opens a table with a caption and label.
    fn new(caption: &str, label: &str) -> Self {
        Self {
            lines: vec![
                r"\begin{table}[ht]".to_string(),
                format!(r"\caption{{{caption}}}"),
                format!(r"\label{{{label}}}"),
                r"\begin{tabular}{|l|r|}".to_string(),
                r" \hline".to_string(),
            ],
        }
    }

    /// Appends a `label & value` row.
    fn row(&mut self, label: &str, value: impl std::fmt::Display) {
        self.lines.push(format!(r"  {label} & {value} \\"));
    }

    /// Appends a count with its share of `base` as a percentage.
    fn share(&mut self, label: &str, count: u64, base: u64) {
        self.row(label, format!(r"{count} ({:.6}\%)", percent(count, base)));
    }

    /// Appends mean and standard deviation rows.
    fn mean(&mut self, label: &str, data: &[f64], exclude_zeroes: bool) {
        let (mean, stddev) = mean_and_stddev(data, exclude_zeroes);
        self.row(label, format!("{mean:.6}"));
        self.row("stddev", format!("{stddev:.6}"));
    }

    /// Appends a horizontal rule.
    fn rule(&mut self) {
        self.lines.push(r" \hline".to_string());
    }

    /// Closes the table and returns its text.
    fn finish(mut self) -> String {
        self.lines.push(r"\end{tabular}".to_string());
        self.lines.push(r"\end{table}".to_string());
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders the full report.
#[must_use]
pub fn render(tabulation: &Tabulation) -> String {
    [
        build_table(&tabulation.succeeded),
        test_table(&tabulation.succeeded),
        version_table(&tabulation.succeeded, false),
        version_table(&tabulation.failed, true),
    ]
    .join("\n")
}

/// Build target statistics for packages that downloaded.
fn build_table(acc: &Accumulator) -> String {
    let mut table = LatexTable::new("Build target statistics", "table:build");
    table.row("Packages processed", acc.seen);
    table.row("Packages failed to download", acc.download_failed);
    table.share("No build failures", acc.build_success, acc.seen);
    table.share("No vet failures", acc.all_vets_passed, acc.seen);
    table.share("No fmt failures", acc.all_fmt_ok, acc.seen);
    table.share("No test targets", acc.no_test_targets, acc.seen);

    table.rule();
    table.mean("Mean build targets (all modules)", &acc.build_targets, false);
    let spread = percentiles(&acc.build_targets).unwrap_or_default();
    table.row("Median build targets", format!("{:.0}", spread.median));
    table.row(r"75th percentile \# of build targets", format!("{:.0}", spread.p75));
    table.row(r"90th percentile \# of build targets", format!("{:.0}", spread.p90));
    table.row(r"95th percentile \# of build targets", format!("{:.0}", spread.p95));
    table.row(r"99th percentile \# of build targets", format!("{:.0}", spread.p99));
    table.row(r"Max \# of build targets", format!("{:.0}", spread.max));

    table.rule();
    table.mean("Mean build targets (at least one buildable)", &acc.build_targets, true);
    table.rule();
    table.mean("Mean failed build targets (all modules)", &acc.failed_builds, false);
    table.rule();
    table.mean("Mean failed build targets (at least one failed)", &acc.failed_builds, true);
    table.rule();
    table.mean("Mean failed vet targets (all modules)", &acc.failed_vets, false);
    table.rule();
    table.mean("Mean failed vet targets (at least one failed)", &acc.failed_vets, true);
    table.rule();
    table.finish()
}

/// Test target statistics for packages that downloaded.
fn test_table(acc: &Accumulator) -> String {
    let mut table = LatexTable::new("Test target statistics", "table:test");
    table.row("Packages seen", acc.seen);
    table.share("No test failures", acc.test_success, acc.seen);
    table.share(
        "No test failures (with tests)",
        acc.test_success.saturating_sub(acc.no_test_targets),
        acc.seen.saturating_sub(acc.no_test_targets),
    );
    let passed_build_failed_tests =
        u64::try_from(acc.passed_build_failed_tests.len()).unwrap_or(u64::MAX);
    table.share("No build failures, but test failures", passed_build_failed_tests, acc.seen);
    table.share("No tests", acc.no_test_targets, acc.seen);

    table.rule();
    table.mean(
        "Mean failed test targets for passed builds (all)",
        &acc.passed_build_failed_tests,
        false,
    );
    table.rule();
    table.mean(
        "Mean failed test targets for passed builds (at least one fail)",
        &acc.passed_build_failed_tests,
        true,
    );
    table.rule();
    table.mean("Mean failed test targets, all packages", &acc.failed_tests, false);
    table.rule();
    table.mean(
        "Mean failed test targets, packages with at least one test failure",
        &acc.failed_tests,
        true,
    );
    table.rule();
    table.finish()
}

/// Modules with the most versions.
fn version_table(acc: &Accumulator, failed: bool) -> String {
    let (caption, label) = if failed {
        ("Most versions per module that fail to download", "table:failversions")
    } else {
        ("Most versions per module that download", "table:versions")
    };
    let mut table = LatexTable::new(caption, label);
    for entry in acc.most_frequent_modules(VERSION_TABLE_ROWS) {
        table.row(&escape(&entry.module), entry.versions);
    }
    table.rule();
    table.finish()
}

/// Escapes LaTeX special characters that occur in module paths.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '&' | '%' | '#' | '$' | '{' | '}') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

// ============================================================================
// SECTION: Tests
// ============================================================================
