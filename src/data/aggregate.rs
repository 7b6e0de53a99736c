use std::collections::{BTreeMap, HashSet};

use super::filter::FilteredView;
use super::model::{Dimension, IdKey, Measure, YearMonth};

/// Sum of a measure over the view; 0 for an empty view.
pub fn total(view: &FilteredView<'_>, measure: Measure) -> f64 {
    view.iter().fold(0.0, |acc, rec| acc + measure.value(rec))
}

/// Number of distinct identifier values in the view.
pub fn distinct_count(view: &FilteredView<'_>, key: IdKey) -> usize {
    view.iter()
        .map(|rec| key.value(rec))
        .collect::<HashSet<&str>>()
        .len()
}

/// Sum of `measure` per value of `dimension`.
///
/// Only values present in the view appear; the map is keyed (and therefore
/// ordered) by dimension label.
pub fn group_sum(
    view: &FilteredView<'_>,
    dimension: Dimension,
    measure: Measure,
) -> BTreeMap<String, f64> {
    let mut groups: BTreeMap<String, f64> = BTreeMap::new();
    for rec in view.iter() {
        let label = dimension.value(rec);
        match groups.get_mut(label) {
            Some(sum) => *sum += measure.value(rec),
            None => {
                groups.insert(label.to_string(), measure.value(rec));
            }
        }
    }
    groups
}

/// Sum of `measure` per calendar month of the order date, ascending.
///
/// Months without records are omitted rather than reported as zero.
pub fn monthly_series(view: &FilteredView<'_>, measure: Measure) -> Vec<(YearMonth, f64)> {
    let mut months: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for rec in view.iter() {
        *months.entry(YearMonth::of(rec.order_date)).or_insert(0.0) += measure.value(rec);
    }
    months.into_iter().collect()
}
