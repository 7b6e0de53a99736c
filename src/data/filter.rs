use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::model::{Dataset, Dimension, Record};

// ---------------------------------------------------------------------------
// Date selection as delivered by the date control
// ---------------------------------------------------------------------------

/// Raw date-range selection. While the user is still picking, only one
/// endpoint may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Inclusive bounds, or `None` when the selection is partial or inverted.
    /// `None` leaves the date dimension unfiltered.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => Some((start, end)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// FilterCriteria – one interaction's complete selection
// ---------------------------------------------------------------------------

/// Date range plus the accepted values of every dimension.
///
/// Built fresh per interaction; the `with_*` methods return a new value
/// instead of mutating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    date_range: DateRange,
    selections: BTreeMap<Dimension, BTreeSet<String>>,
}

impl FilterCriteria {
    /// Criteria with the given date range and nothing selected in any
    /// dimension.
    pub fn new(date_range: DateRange) -> Self {
        FilterCriteria {
            date_range,
            selections: Dimension::ALL
                .into_iter()
                .map(|d| (d, BTreeSet::new()))
                .collect(),
        }
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_selection<I, S>(mut self, dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .insert(dimension, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    /// Accepted values of a dimension.
    pub fn selected(&self, dimension: Dimension) -> &BTreeSet<String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        self.selections.get(&dimension).unwrap_or(&EMPTY)
    }
}

/// Initialise criteria with everything selected: the full date bounds and all
/// observed values of every dimension.
pub fn init_criteria(dataset: &Dataset) -> FilterCriteria {
    let date_range = dataset
        .date_bounds
        .map(|(lo, hi)| DateRange::new(lo, hi))
        .unwrap_or_default();

    Dimension::ALL
        .into_iter()
        .fold(FilterCriteria::new(date_range), |criteria, dim| {
            criteria.with_selection(dim, dataset.options(dim).iter().cloned())
        })
}

// ---------------------------------------------------------------------------
// FilterRequest – partially specified criteria from config or flags
// ---------------------------------------------------------------------------

/// Criteria as written in a JSON file or given on the command line. Omitted
/// dimensions default to all observed values.
///
/// ```json
/// { "start": "2016-01-01", "end": "2016-12-31", "region": ["West", "East"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterRequest {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub region: Option<Vec<String>>,
    pub segment: Option<Vec<String>>,
    pub ship_mode: Option<Vec<String>>,
    pub category: Option<Vec<String>>,
}

impl FilterRequest {
    fn selection(&self, dimension: Dimension) -> Option<&Vec<String>> {
        match dimension {
            Dimension::Region => self.region.as_ref(),
            Dimension::Segment => self.segment.as_ref(),
            Dimension::ShipMode => self.ship_mode.as_ref(),
            Dimension::Category => self.category.as_ref(),
        }
    }

    /// Overlay `other` on top of `self`: every field `other` sets wins.
    pub fn merge(self, other: FilterRequest) -> FilterRequest {
        FilterRequest {
            start: other.start.or(self.start),
            end: other.end.or(self.end),
            region: other.region.or(self.region),
            segment: other.segment.or(self.segment),
            ship_mode: other.ship_mode.or(self.ship_mode),
            category: other.category.or(self.category),
        }
    }

    /// Fill in defaults from the dataset and build the criteria.
    pub fn resolve(&self, dataset: &Dataset) -> FilterCriteria {
        let date_range = DateRange {
            start: self.start,
            end: self.end,
        };
        Dimension::ALL
            .into_iter()
            .fold(FilterCriteria::new(date_range), |criteria, dim| {
                match self.selection(dim) {
                    Some(values) => criteria.with_selection(dim, values.iter().cloned()),
                    None => criteria.with_selection(dim, dataset.options(dim).iter().cloned()),
                }
            })
    }
}

// ---------------------------------------------------------------------------
// FilteredView – records passing every predicate
// ---------------------------------------------------------------------------

/// Order-preserving selection of records from a borrowed dataset.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// Wrap precomputed indices; they must be ascending and in bounds.
    pub(crate) fn from_indices(dataset: &'a Dataset, indices: Vec<usize>) -> Self {
        FilteredView { dataset, indices }
    }

    /// The unfiltered view of a dataset.
    pub fn all(dataset: &'a Dataset) -> Self {
        FilteredView {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Positions of the retained records in the dataset.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let records = &self.dataset.records;
        self.indices.iter().map(move |&i| &records[i])
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Filter engine
// ---------------------------------------------------------------------------

/// Return the view of records that pass all active filters.
///
/// A record passes when:
/// * its order date lies in the inclusive date range, or the range is
///   partial/inverted (date dimension then unfiltered)
/// * for every dimension, its value is in the selected set; an empty set
///   rejects every record
pub fn apply<'a>(dataset: &'a Dataset, criteria: &FilterCriteria) -> FilteredView<'a> {
    let bounds = criteria.date_range().bounds();

    // Dimensions whose selection covers every observed value cannot reject
    // anything, so they are skipped.
    let active: Vec<(Dimension, &BTreeSet<String>)> = Dimension::ALL
        .into_iter()
        .map(|dim| (dim, criteria.selected(dim)))
        .filter(|(dim, selected)| {
            let observed = dataset.options(*dim);
            selected.is_empty() || !observed.iter().all(|v| selected.contains(v))
        })
        .collect();

    let indices: Vec<usize> = dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            if let Some((start, end)) = bounds {
                if rec.order_date < start || rec.order_date > end {
                    return false;
                }
            }
            active
                .iter()
                .all(|(dim, selected)| selected.contains(dim.value(rec)))
        })
        .map(|(i, _)| i)
        .collect();

    log::debug!(
        "filter kept {} of {} records (date filter {})",
        indices.len(),
        dataset.len(),
        if bounds.is_some() { "on" } else { "off" }
    );

    FilteredView::from_indices(dataset, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{date, record, west_east_dataset};

    fn regions(view: &FilteredView<'_>) -> Vec<String> {
        view.iter().map(|r| r.region.clone()).collect()
    }

    #[test]
    fn default_criteria_keep_everything() {
        let ds = west_east_dataset();
        let view = apply(&ds, &init_criteria(&ds));
        assert_eq!(view.indices(), &[0, 1, 2]);
    }

    #[test]
    fn region_filter_keeps_matching_records_in_order() {
        let ds = west_east_dataset();
        let criteria = init_criteria(&ds).with_selection(Dimension::Region, ["West"]);
        let view = apply(&ds, &criteria);
        assert_eq!(view.len(), 2);
        assert_eq!(view.indices(), &[0, 2]);
        assert_eq!(regions(&view), vec!["West", "West"]);
    }

    #[test]
    fn empty_selection_yields_empty_view() {
        let ds = west_east_dataset();
        let criteria =
            init_criteria(&ds).with_selection(Dimension::Segment, Vec::<String>::new());
        assert!(apply(&ds, &criteria).is_empty());
    }

    #[test]
    fn unknown_value_selection_rejects_everything() {
        let ds = west_east_dataset();
        let criteria = init_criteria(&ds).with_selection(Dimension::Category, ["Technology"]);
        assert!(apply(&ds, &criteria).is_empty());
    }

    #[test]
    fn date_range_is_inclusive() {
        let ds = west_east_dataset();
        let criteria = init_criteria(&ds)
            .with_date_range(DateRange::new(date(2023, 2, 10), date(2023, 2, 20)));
        assert_eq!(apply(&ds, &criteria).indices(), &[1, 2]);
    }

    #[test]
    fn partial_date_range_leaves_dates_unfiltered() {
        let ds = west_east_dataset();
        let partial = DateRange {
            start: Some(date(2023, 2, 1)),
            end: None,
        };
        let criteria = init_criteria(&ds)
            .with_date_range(partial)
            .with_selection(Dimension::Region, ["West"]);
        assert_eq!(apply(&ds, &criteria).indices(), &[0, 2]);
    }

    #[test]
    fn inverted_date_range_leaves_dates_unfiltered() {
        let ds = west_east_dataset();
        let criteria = init_criteria(&ds)
            .with_date_range(DateRange::new(date(2023, 3, 1), date(2023, 1, 1)));
        assert_eq!(apply(&ds, &criteria).len(), 3);
    }

    #[test]
    fn range_before_data_yields_empty_view() {
        let ds = west_east_dataset();
        let criteria = init_criteria(&ds)
            .with_date_range(DateRange::new(date(2020, 1, 1), date(2020, 12, 31)));
        assert!(apply(&ds, &criteria).is_empty());
    }

    #[test]
    fn every_retained_record_satisfies_all_predicates() {
        let mut records = Vec::new();
        for (i, region) in ["West", "East", "South", "Central"].iter().enumerate() {
            for day in 1..=28 {
                let mut rec = record(&format!("O-{i}-{day}"), date(2023, 3, day), region, day as f64);
                rec.segment = if day % 2 == 0 { "Consumer" } else { "Corporate" }.to_string();
                records.push(rec);
            }
        }
        let ds = Dataset::from_records(records);
        let (start, end) = (date(2023, 3, 5), date(2023, 3, 20));
        let criteria = init_criteria(&ds)
            .with_date_range(DateRange::new(start, end))
            .with_selection(Dimension::Region, ["West", "South"])
            .with_selection(Dimension::Segment, ["Corporate"]);

        let view = apply(&ds, &criteria);
        assert!(!view.is_empty());
        for rec in view.iter() {
            assert!(rec.order_date >= start && rec.order_date <= end);
            assert!(rec.region == "West" || rec.region == "South");
            assert_eq!(rec.segment, "Corporate");
        }
        let expected = ds
            .records
            .iter()
            .filter(|r| {
                r.order_date >= start
                    && r.order_date <= end
                    && (r.region == "West" || r.region == "South")
                    && r.segment == "Corporate"
            })
            .count();
        assert_eq!(view.len(), expected);
        assert!(view.indices().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn applying_twice_is_identical() {
        let ds = west_east_dataset();
        let criteria = init_criteria(&ds).with_selection(Dimension::Region, ["East"]);
        assert_eq!(apply(&ds, &criteria).indices(), apply(&ds, &criteria).indices());
    }

    #[test]
    fn request_resolves_omitted_dimensions_to_all_values() {
        let ds = west_east_dataset();
        let request = FilterRequest {
            region: Some(vec!["East".to_string()]),
            ..Default::default()
        };
        let criteria = request.resolve(&ds);
        assert_eq!(criteria.date_range().bounds(), None);
        assert_eq!(criteria.selected(Dimension::Segment), ds.options(Dimension::Segment));
        assert_eq!(apply(&ds, &criteria).indices(), &[1]);
    }

    #[test]
    fn merge_prefers_the_overlay() {
        let base = FilterRequest {
            start: Some(date(2023, 1, 1)),
            region: Some(vec!["West".to_string()]),
            ..Default::default()
        };
        let overlay = FilterRequest {
            region: Some(vec!["East".to_string()]),
            ..Default::default()
        };
        let merged = base.merge(overlay);
        assert_eq!(merged.start, Some(date(2023, 1, 1)));
        assert_eq!(merged.region, Some(vec!["East".to_string()]));
    }

    #[test]
    fn request_parses_from_json() {
        let request: FilterRequest =
            serde_json::from_str(r#"{"start": "2023-01-01", "ship_mode": ["First Class"]}"#)
                .unwrap();
        assert_eq!(request.start, Some(date(2023, 1, 1)));
        assert_eq!(request.ship_mode, Some(vec!["First Class".to_string()]));
        assert!(serde_json::from_str::<FilterRequest>(r#"{"country": []}"#).is_err());
    }
}
