//! Structural checks over a finished [`AggregationResult`].
//!
//! Verifies the properties every result must hold regardless of the data:
//! - **Dense alignment** - each series has one amount per period key.
//! - **Sum invariant** - the total equals the per-index sum of all fields.
//! - **Period order** - keys strictly ascend and share one bucket shape.
//! - **Metadata** - counts agree with the payload.
//!
//! Output is a [`ValidationReport`] that serialises to JSON for
//! `prodyn dynamics --check --json`.

use serde::Serialize;

use super::types::AggregationResult;

/// Absolute tolerance for the sum invariant.
pub const SUM_TOLERANCE: f64 = 1e-6;

/// Severity level for a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single validation check result.
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub id: String,
    pub ok: bool,
    pub severity: Severity,
    pub details: String,
}

impl Check {
    fn pass(id: &str, details: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ok: true,
            severity: Severity::Info,
            details: details.into(),
        }
    }

    fn fail(id: &str, severity: Severity, details: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ok: false,
            severity,
            details: details.into(),
        }
    }
}

/// Full validation report.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub checks: Vec<Check>,
}

impl ValidationReport {
    /// True if every check passed.
    pub fn all_ok(&self) -> bool {
        self.checks.iter().all(|c| c.ok)
    }

    /// Count of checks that failed with a given severity.
    pub fn count_failures(&self, sev: Severity) -> usize {
        self.checks
            .iter()
            .filter(|c| !c.ok && c.severity == sev)
            .count()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::json!({"error": "serialization failed"}))
    }
}

/// Run every check against `result`.
pub fn validate_result(result: &AggregationResult) -> ValidationReport {
    ValidationReport {
        checks: vec![
            check_dense_alignment(result),
            check_sum_invariant(result),
            check_period_order(result),
            check_period_shape(result),
            check_metadata_counts(result),
        ],
    }
}

fn check_dense_alignment(result: &AggregationResult) -> Check {
    let width = result.period_keys.len();
    let ragged: Vec<String> = result
        .fields
        .iter()
        .filter(|f| f.amounts.len() != width)
        .map(|f| format!("field {} has {} amounts", f.field_id, f.amounts.len()))
        .collect();

    if !ragged.is_empty() {
        return Check::fail(
            "dense_alignment",
            Severity::Error,
            format!("expected {width} amounts per series: {}", ragged.join("; ")),
        );
    }
    if result.total.amounts.len() != width {
        return Check::fail(
            "dense_alignment",
            Severity::Error,
            format!(
                "total has {} amounts, expected {width}",
                result.total.amounts.len()
            ),
        );
    }
    Check::pass(
        "dense_alignment",
        format!("{} series aligned to {width} periods", result.fields.len()),
    )
}

fn check_sum_invariant(result: &AggregationResult) -> Check {
    let mut worst: Option<(usize, f64)> = None;
    for (i, total) in result.total.amounts.iter().enumerate() {
        let expected: f64 = result
            .fields
            .iter()
            .filter_map(|f| f.amounts.get(i))
            .sum();
        let delta = (total - expected).abs();
        if delta > SUM_TOLERANCE && worst.is_none_or(|(_, w)| delta > w) {
            worst = Some((i, delta));
        }
    }

    match worst {
        Some((i, delta)) => Check::fail(
            "sum_invariant",
            Severity::Error,
            format!(
                "total differs from the field sum by {delta} at period {}",
                result
                    .period_keys
                    .get(i)
                    .map_or_else(|| format!("#{i}"), |k| k.to_string())
            ),
        ),
        None => Check::pass(
            "sum_invariant",
            format!("{} period totals match", result.total.amounts.len()),
        ),
    }
}

fn check_period_order(result: &AggregationResult) -> Check {
    let unordered = result
        .period_keys
        .windows(2)
        .find(|pair| pair[0] >= pair[1]);
    match unordered {
        Some(pair) => Check::fail(
            "period_order",
            Severity::Error,
            format!("period {} is not before {}", pair[0], pair[1]),
        ),
        None => Check::pass("period_order", "period keys strictly ascend"),
    }
}

fn check_period_shape(result: &AggregationResult) -> Check {
    let bucket = result.metadata.request.bucket_size;
    let foreign: Vec<&str> = result
        .period_keys
        .iter()
        .filter(|k| k.shape() != Some(bucket))
        .map(|k| k.as_str())
        .collect();
    if foreign.is_empty() {
        Check::pass("period_shape", format!("every key is a {bucket} key"))
    } else {
        Check::fail(
            "period_shape",
            Severity::Error,
            format!("keys not shaped as {bucket}: {}", foreign.join(", ")),
        )
    }
}

fn check_metadata_counts(result: &AggregationResult) -> Check {
    let meta = &result.metadata.response;
    if meta.total_fields != result.fields.len() || meta.total_periods != result.period_keys.len()
    {
        return Check::fail(
            "metadata_counts",
            Severity::Warning,
            format!(
                "metadata reports {} fields / {} periods, payload has {} / {}",
                meta.total_fields,
                meta.total_periods,
                result.fields.len(),
                result.period_keys.len()
            ),
        );
    }
    Check::pass("metadata_counts", "metadata counts match payload")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
