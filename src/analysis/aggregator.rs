//! Response record aggregation.
//!
//! Records are folded one at a time into running per-cell sums, so memory
//! stays bounded by a single record plus the accumulator. Every record must
//! share the row and column label sets of the first one; cells are matched
//! by reference id and label, never by position.

use crate::error::{Result, SurveyError};
use crate::models::{AggregateTable, RatingTable};
use crate::report::parse_table;
use crate::storage::{RecordStore, StoredRecord};
use indicatif::ProgressBar;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Running sum and count of one cell.
#[derive(Debug, Clone, Copy, Default)]
struct CellSum {
    sum: f64,
    count: usize,
}

/// Row and column label sets every record must match.
#[derive(Debug, Clone)]
struct Shape {
    rows: BTreeSet<u64>,
    columns: BTreeSet<String>,
}

impl Shape {
    fn of(table: &RatingTable) -> Self {
        Self {
            rows: table.rows.keys().copied().collect(),
            columns: table.columns.clone(),
        }
    }

    /// Describe how `table` differs from this shape, if it does.
    fn mismatch(&self, table: &RatingTable) -> Option<String> {
        if table.columns != self.columns {
            let missing: Vec<_> = self.columns.difference(&table.columns).collect();
            let extra: Vec<_> = table.columns.difference(&self.columns).collect();
            return Some(format!(
                "columns differ (missing {:?}, unexpected {:?})",
                missing, extra
            ));
        }

        let rows: BTreeSet<u64> = table.rows.keys().copied().collect();
        if rows != self.rows {
            let missing: Vec<_> = self.rows.difference(&rows).collect();
            let extra: Vec<_> = rows.difference(&self.rows).collect();
            return Some(format!(
                "reference ids differ (missing {:?}, unexpected {:?})",
                missing, extra
            ));
        }

        None
    }
}

/// Streaming element-wise mean over response records.
#[derive(Debug, Default)]
pub struct Aggregator {
    shape: Option<Shape>,
    cells: BTreeMap<u64, BTreeMap<String, CellSum>>,
    records: usize,
}

impl Aggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records added so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Fold one record into the running sums.
    ///
    /// Fails without changing the sums if the record's shape differs from
    /// the records added before it. Missing cells count toward neither the
    /// sum nor the count of their cell.
    pub fn add(&mut self, name: &str, table: &RatingTable) -> Result<()> {
        let shape = self.shape.get_or_insert_with(|| Shape::of(table));
        if let Some(detail) = shape.mismatch(table) {
            return Err(SurveyError::AggregationShapeMismatch {
                record: name.to_string(),
                detail,
            });
        }

        for (reference, row) in &table.rows {
            let sums = self.cells.entry(*reference).or_default();
            for (label, value) in row {
                let cell = sums.entry(label.clone()).or_default();
                cell.sum += value;
                cell.count += 1;
            }
        }

        self.records += 1;
        debug!("Aggregated record {} ({} so far)", name, self.records);
        Ok(())
    }

    /// Divide the sums out. Returns `None` when no record was added.
    pub fn finish(self) -> Option<AggregateTable> {
        let shape = self.shape?;

        let rows = shape
            .rows
            .iter()
            .map(|reference| {
                let means = self
                    .cells
                    .get(reference)
                    .into_iter()
                    .flatten()
                    .filter(|(_, cell)| cell.count > 0)
                    .map(|(label, cell)| (label.clone(), cell.sum / cell.count as f64))
                    .collect();
                (*reference, means)
            })
            .collect();

        Some(AggregateTable {
            means: RatingTable {
                columns: shape.columns,
                rows,
            },
            records: self.records,
        })
    }
}

/// Fold a stream of named records into one mean table.
///
/// The stream is consumed lazily; the first error stops aggregation.
pub fn aggregate<I>(records: I) -> Result<Option<AggregateTable>>
where
    I: IntoIterator<Item = Result<(String, RatingTable)>>,
{
    let mut aggregator = Aggregator::new();
    for record in records {
        let (name, table) = record?;
        aggregator.add(&name, &table)?;
    }
    info!("Aggregated {} records", aggregator.records());
    Ok(aggregator.finish())
}

/// List the records in `store`, dropping zero-size ones.
pub fn collect<S: RecordStore>(store: &S) -> Result<Vec<StoredRecord>> {
    let records = store
        .list_records()?
        .into_iter()
        .filter(|record| {
            if record.size == 0 {
                warn!("Skipping empty record {}", record.name);
                false
            } else {
                true
            }
        })
        .collect();

    Ok(records)
}

/// Read, parse and fold every listed record.
///
/// Records whose content is blank are skipped like zero-size ones.
pub fn aggregate_store<S: RecordStore>(
    store: &S,
    records: &[StoredRecord],
    progress: &ProgressBar,
) -> Result<Option<AggregateTable>> {
    let tables = records.iter().filter_map(|record| {
        progress.set_message(record.name.clone());
        let loaded = load_record(store, record).transpose();
        progress.inc(1);
        loaded
    });

    let result = aggregate(tables);
    progress.finish_and_clear();
    result
}

/// Read and parse one record; `None` if its content is blank.
fn load_record<S: RecordStore>(
    store: &S,
    record: &StoredRecord,
) -> Result<Option<(String, RatingTable)>> {
    let content = store.read_record(record)?;

    if content.trim().is_empty() {
        warn!("Skipping blank record {}", record.name);
        return Ok(None);
    }

    let table = parse_table(&record.name, &content)?;
    Ok(Some((record.name.clone(), table)))
}
