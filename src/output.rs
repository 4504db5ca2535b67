//! Plain-text rendering for human (non `--json`) output.

use std::fmt::Write as _;

use crate::dynamics::validate::ValidationReport;
use crate::dynamics::{AggregationResult, BucketSize, DepositComplex, FluidType};
use crate::seed::SeedSummary;

const TOTAL_LABEL: &str = "Total";

/// Fields as rows, periods as columns, totals last.
pub fn render_dynamics(result: &AggregationResult) -> String {
    let req = &result.metadata.request;
    let resp = &result.metadata.response;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} .. {} by {} ({})",
        req.fluid_type.label_ru(),
        req.date_from,
        req.date_to,
        req.bucket_size,
        resp.unit
    );

    if result.is_empty() {
        out.push_str("No production matched the request.\n");
        return out;
    }

    let fmt = |v: f64| format!("{v:.3}");
    let name_width = result
        .fields
        .iter()
        .map(|f| f.field_name.chars().count())
        .chain(std::iter::once(TOTAL_LABEL.len()))
        .max()
        .unwrap_or(0);
    // One width per column so that header and cells line up.
    let col_widths: Vec<usize> = result
        .period_keys
        .iter()
        .enumerate()
        .map(|(i, key)| {
            result
                .fields
                .iter()
                .filter_map(|f| f.amounts.get(i))
                .chain(result.total.amounts.get(i))
                .map(|v| fmt(*v).len())
                .chain(std::iter::once(key.as_str().len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut header = pad_right("Field", name_width);
    for (key, width) in result.period_keys.iter().zip(&col_widths) {
        let _ = write!(header, "  {:>width$}", key.as_str(), width = *width);
    }
    out.push_str(header.trim_end());
    out.push('\n');

    let mut row = |label: &str, amounts: &[f64]| {
        let mut line = pad_right(label, name_width);
        for (v, width) in amounts.iter().zip(&col_widths) {
            let _ = write!(line, "  {:>width$}", fmt(*v), width = *width);
        }
        out.push_str(&line);
        out.push('\n');
    };
    for field in &result.fields {
        row(&field.field_name, &field.amounts);
    }
    row(TOTAL_LABEL, &result.total.amounts);

    let _ = writeln!(
        out,
        "{} fields, {} periods",
        resp.total_fields, resp.total_periods
    );
    out
}

// Width in chars, not bytes: field names are usually Cyrillic.
fn pad_right(s: &str, width: usize) -> String {
    let len = s.chars().count();
    let mut padded = s.to_string();
    padded.extend(std::iter::repeat_n(' ', width.saturating_sub(len)));
    padded
}

pub fn render_enums() -> String {
    let mut out = String::new();
    out.push_str("Fluid types:\n");
    for v in FluidType::ALL {
        let _ = writeln!(out, "  {:<12} {}", v.as_str(), v.label_ru());
    }
    out.push_str("Deposit complexes:\n");
    for v in DepositComplex::ALL {
        let _ = writeln!(out, "  {:<12} {}", v.as_str(), v.label_ru());
    }
    out.push_str("Bucket sizes:\n");
    for v in BucketSize::ALL {
        let _ = writeln!(out, "  {:<12} {}", v.as_str(), v.label_ru());
    }
    out
}

pub fn render_seed_summary(summary: &SeedSummary, db: &std::path::Path) -> String {
    format!(
        "Seeded {}: {} fields, {} development objects, {} wells, {} facts\n",
        db.display(),
        summary.fields,
        summary.development_objects,
        summary.wells,
        summary.facts
    )
}

pub fn render_report(report: &ValidationReport) -> String {
    let mut out = String::new();
    for check in &report.checks {
        let mark = if check.ok { "ok" } else { "FAIL" };
        let _ = writeln!(out, "[{mark:>4}] {}: {}", check.id, check.details);
    }
    out
}
