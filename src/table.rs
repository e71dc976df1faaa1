use std::collections::HashSet;

use tracing::{debug, warn};

use crate::catalog::FilteredCatalog;
use crate::domain::{ColumnPolicy, RegionSelection};
use crate::error::GeneModelError;
use crate::record::{EXCLUDED_FIELDS, GeneModelRecord, REGION_FIELD};

pub type Row = Vec<Option<String>>;

#[derive(Debug, Clone)]
pub struct GeneModelTable {
    columns: Vec<String>,
    rows: Vec<Row>,
    region_column: usize,
}

impl GeneModelTable {
    pub fn build(
        filtered: &FilteredCatalog,
        policy: ColumnPolicy,
    ) -> Result<Self, GeneModelError> {
        if filtered.is_empty() {
            return Err(GeneModelError::EmptyFilterResult {
                organism: filtered.organism.to_string(),
                category: filtered.biotype.to_string(),
            });
        }

        let columns = derive_columns(&filtered.records, policy);
        let region_column = columns
            .iter()
            .position(|column| column == REGION_FIELD)
            .ok_or(GeneModelError::MissingRegionColumn)?;

        if policy == ColumnPolicy::FirstRecord {
            let known: HashSet<&str> = columns.iter().map(String::as_str).collect();
            let dropped = filtered
                .records
                .iter()
                .flat_map(GeneModelRecord::field_names)
                .filter(|name| !known.contains(name) && !EXCLUDED_FIELDS.contains(name))
                .collect::<HashSet<_>>();
            if !dropped.is_empty() {
                let mut dropped: Vec<_> = dropped.into_iter().collect();
                dropped.sort_unstable();
                warn!(
                    fields = %dropped.join(","),
                    "fields missing from the first record are not stored"
                );
            }
        }

        let rows: Vec<Row> = filtered
            .records
            .iter()
            .map(|record| columns.iter().map(|column| record.text(column)).collect())
            .collect();

        debug!(columns = columns.len(), rows = rows.len(), %policy, "built gene model table");
        Ok(Self {
            columns,
            rows,
            region_column,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows_in_region(&self, region: &str) -> Vec<&Row> {
        self.scan(|value| value == Some(region))
    }

    /// Rows whose `seq_region_name` is not one of `known`, in insertion order.
    ///
    /// Rows without a region name belong here too, so the named regions and this bucket
    /// partition the table.
    pub fn rows_outside(&self, known: &HashSet<&str>) -> Vec<&Row> {
        self.scan(|value| value.is_none_or(|region| !known.contains(region)))
    }

    pub fn query(&self, selection: &RegionSelection, known: &HashSet<&str>) -> Vec<&Row> {
        match selection {
            RegionSelection::Named(region) => self.rows_in_region(region),
            RegionSelection::CatchAll => self.rows_outside(known),
        }
    }

    fn scan<P>(&self, predicate: P) -> Vec<&Row>
    where
        P: Fn(Option<&str>) -> bool,
    {
        self.rows
            .iter()
            .filter(|row| predicate(row[self.region_column].as_deref()))
            .collect()
    }
}

fn derive_columns(records: &[GeneModelRecord], policy: ColumnPolicy) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    let sources = match policy {
        ColumnPolicy::FirstRecord => &records[..1],
        ColumnPolicy::Union => records,
    };
    for name in sources.iter().flat_map(GeneModelRecord::field_names) {
        if EXCLUDED_FIELDS.contains(&name) || !seen.insert(name) {
            continue;
        }
        columns.push(name.to_string());
    }
    columns
}
