use std::sync::Arc;

use crate::data::filter::{apply, init_criteria, DateRange, FilterCriteria, FilteredView};
use crate::data::model::{Dataset, Dimension};
use crate::report::DashboardSummary;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One dashboard session: the shared dataset plus the current selection.
///
/// Every change builds a new [`FilterCriteria`] and refilters the full
/// dataset; nothing is updated incrementally.
#[derive(Debug, Clone)]
pub struct Session {
    /// Loaded once, read-only for the session.
    dataset: Arc<Dataset>,

    /// Current filter selection.
    criteria: FilterCriteria,

    /// Indices of records passing the current filters (cached).
    visible_indices: Vec<usize>,
}

impl Session {
    /// Start a session with everything selected.
    pub fn new(dataset: Arc<Dataset>) -> Self {
        let criteria = init_criteria(&dataset);
        let visible_indices = (0..dataset.len()).collect();
        log::debug!("session started over {} records", dataset.len());
        Session {
            dataset,
            criteria,
            visible_indices,
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// The records passing the current filters.
    pub fn view(&self) -> FilteredView<'_> {
        FilteredView::from_indices(&self.dataset, self.visible_indices.clone())
    }

    /// Aggregate the current view into dashboard outputs.
    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary::compute(&self.view())
    }

    /// Replace the whole selection.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refilter();
    }

    /// Recompute `visible_indices` after a filter change.
    fn refilter(&mut self) {
        self.visible_indices = apply(&self.dataset, &self.criteria).indices().to_vec();
    }

    /// Change the date selection. Partial selections leave dates unfiltered.
    pub fn set_date_range(&mut self, range: DateRange) {
        let criteria = self.criteria.clone().with_date_range(range);
        self.set_criteria(criteria);
    }

    /// Toggle a single value in a dimension's selection.
    pub fn toggle_filter_value(&mut self, dimension: Dimension, value: &str) {
        let mut selected = self.criteria.selected(dimension).clone();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        let criteria = self.criteria.clone().with_selection(dimension, selected);
        self.set_criteria(criteria);
    }

    /// Select all observed values in a dimension.
    pub fn select_all(&mut self, dimension: Dimension) {
        let all = self.dataset.options(dimension).clone();
        let criteria = self.criteria.clone().with_selection(dimension, all);
        self.set_criteria(criteria);
    }

    /// Deselect all values in a dimension.
    pub fn select_none(&mut self, dimension: Dimension) {
        let criteria = self
            .criteria
            .clone()
            .with_selection(dimension, Vec::<String>::new());
        self.set_criteria(criteria);
    }
}
