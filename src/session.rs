use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::data::error::Result;
use crate::data::filter::{self, FilterSpec};
use crate::data::loader::{self, LoadOutcome, LoadReport};
use crate::data::model::{Table, View};

// ---------------------------------------------------------------------------
// Explorer – a loaded table plus memoized filter results
// ---------------------------------------------------------------------------

/// Query state for one caller, independent of rendering.
///
/// The base table sits behind an `Arc` so several explorers can share it.
/// Filter results are memoized by the full `FilterSpec` value and only
/// dropped when a new table is loaded.
pub struct Explorer {
    table: Arc<Table>,
    report: LoadReport,
    /// Row indices passing each filter spec seen so far.
    cache: HashMap<FilterSpec, Vec<usize>>,
}

impl Explorer {
    pub fn new(outcome: LoadOutcome) -> Self {
        Self {
            table: Arc::new(outcome.table),
            report: outcome.report,
            cache: HashMap::new(),
        }
    }

    /// Start another explorer over an already-loaded table.
    pub fn shared(table: Arc<Table>) -> Self {
        Self {
            table,
            report: LoadReport::default(),
            cache: HashMap::new(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        loader::load_file(path).map(Self::new)
    }

    /// Swap in a freshly loaded table and drop every memoized view.
    pub fn reload(&mut self, outcome: LoadOutcome) {
        self.table = Arc::new(outcome.table);
        self.report = outcome.report;
        self.cache.clear();
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn table_handle(&self) -> Arc<Table> {
        Arc::clone(&self.table)
    }

    /// Load diagnostics; empty for explorers built with [`Explorer::shared`].
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn cached_views(&self) -> usize {
        self.cache.len()
    }

    /// Apply `spec`, reusing the memoized result when the same spec was seen before.
    pub fn view(&mut self, spec: &FilterSpec) -> Result<View<'_>> {
        if let Some(indices) = self.cache.get(spec) {
            debug!("Filter cache hit ({} rows)", indices.len());
            return Ok(View::from_indices(&self.table, indices.clone()));
        }
        let indices = filter::apply(&self.table, spec)?.indices().to_vec();
        self.cache.insert(spec.clone(), indices.clone());
        Ok(View::from_indices(&self.table, indices))
    }
}
