//! Sparse-to-dense pivot of accumulated sums, plus the cross-field total.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use super::aggregate::Accumulated;
use super::bucketing::PeriodKey;
use super::types::{Amount, FieldSeries, TotalSeries};

/// Period-aligned series for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pivot {
    /// Sorted union of every period that appeared for any field.
    pub period_keys: Vec<PeriodKey>,
    /// One row per field, `field_id` ascending.
    pub fields: Vec<FieldSeries>,
    pub total: TotalSeries,
}

/// Align every field to the sorted period list, zero-filling gaps, and derive
/// the total from the aligned rows.
pub fn assemble(acc: Accumulated) -> Pivot {
    let Accumulated {
        sums, field_names, ..
    } = acc;

    let period_keys: Vec<PeriodKey> = sums
        .keys()
        .map(|(_, key)| key.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let period_index: FxHashMap<&PeriodKey, usize> = period_keys
        .iter()
        .enumerate()
        .map(|(i, key)| (key, i))
        .collect();

    let mut field_ids: Vec<i64> = field_names.keys().copied().collect();
    field_ids.sort_unstable();
    let row_index: FxHashMap<i64, usize> = field_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();

    let width = period_keys.len();
    let mut rows: Vec<Vec<Amount>> = vec![vec![Amount::ZERO; width]; field_ids.len()];
    for ((field_id, key), amount) in &sums {
        if let (Some(&row), Some(&col)) = (row_index.get(field_id), period_index.get(key)) {
            rows[row][col] = *amount;
        }
    }

    let totals = column_totals(&rows, width);

    let mut field_names = field_names;
    let fields = field_ids
        .iter()
        .zip(&rows)
        .map(|(id, row)| FieldSeries {
            field_id: *id,
            field_name: field_names.remove(id).unwrap_or_default(),
            amounts: row.iter().map(|a| a.to_f64()).collect(),
        })
        .collect();

    Pivot {
        period_keys,
        fields,
        total: TotalSeries {
            amounts: totals.iter().map(|a| a.to_f64()).collect(),
        },
    }
}

/// Per-index sum over already aligned rows.
pub fn column_totals(rows: &[Vec<Amount>], width: usize) -> Vec<Amount> {
    let mut totals = vec![Amount::ZERO; width];
    for row in rows {
        for (total, amount) in totals.iter_mut().zip(row) {
            *total += *amount;
        }
    }
    totals
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::bucketing::period_key;
    use crate::dynamics::types::BucketSize;
    use chrono::NaiveDate;

    fn month(y: i32, m: u32) -> PeriodKey {
        period_key(NaiveDate::from_ymd_opt(y, m, 1).unwrap(), BucketSize::Month)
    }

    fn amount(v: f64) -> Amount {
        Amount::from_f64(v).unwrap()
    }

    fn accumulated(entries: &[(i64, &str, PeriodKey, f64)]) -> Accumulated {
        let mut acc = Accumulated::default();
        for (field_id, name, key, value) in entries {
            *acc.sums.entry((*field_id, key.clone())).or_default() += amount(*value);
            acc.field_names.entry(*field_id).or_insert_with(|| name.to_string());
        }
        acc
    }

    #[test]
    fn empty_input_gives_empty_pivot() {
        let pivot = assemble(Accumulated::default());
        assert!(pivot.period_keys.is_empty());
        assert!(pivot.fields.is_empty());
        assert!(pivot.total.amounts.is_empty());
    }

    #[test]
    fn gaps_are_zero_filled() {
        let pivot = assemble(accumulated(&[
            (2, "B", month(2021, 3), 4.0),
            (1, "A", month(2021, 1), 1.0),
            (1, "A", month(2021, 3), 2.0),
        ]));
        assert_eq!(pivot.period_keys, vec![month(2021, 1), month(2021, 3)]);
        assert_eq!(pivot.fields.len(), 2);
        assert_eq!(pivot.fields[0].field_id, 1);
        assert_eq!(pivot.fields[0].amounts, vec![1.0, 2.0]);
        assert_eq!(pivot.fields[1].field_id, 2);
        assert_eq!(pivot.fields[1].field_name, "B");
        assert_eq!(pivot.fields[1].amounts, vec![0.0, 4.0]);
        assert_eq!(pivot.total.amounts, vec![1.0, 6.0]);
    }

    #[test]
    fn every_row_has_period_width() {
        let pivot = assemble(accumulated(&[
            (1, "A", month(2020, 12), 1.0),
            (2, "B", month(2021, 1), 1.0),
            (3, "C", month(2021, 2), 1.0),
        ]));
        assert_eq!(pivot.period_keys.len(), 3);
        for field in &pivot.fields {
            assert_eq!(field.amounts.len(), 3);
        }
        assert_eq!(pivot.total.amounts, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn periods_span_years_in_order() {
        let pivot = assemble(accumulated(&[
            (1, "A", month(2022, 1), 1.0),
            (1, "A", month(2021, 12), 1.0),
            (1, "A", month(2021, 2), 1.0),
        ]));
        let keys: Vec<&str> = pivot.period_keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["2021-02", "2021-12", "2022-01"]);
    }

    #[test]
    fn column_totals_sum_each_index() {
        let rows = vec![
            vec![amount(1.5), amount(0.0)],
            vec![amount(2.25), amount(3.0)],
        ];
        let totals = column_totals(&rows, 2);
        assert_eq!(totals, vec![amount(3.75), amount(3.0)]);
        assert!(column_totals(&[], 0).is_empty());
    }
}
