use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::catalog::{BulkCatalogCache, CatalogOrigin, CategoryFilter};
use crate::domain::{Biotype, ColumnPolicy, Karyotype, OrganismId};
use crate::ensembl::{AssemblyInfo, EnsemblClient, SpeciesInfo, gene_biotypes, sort_species};
use crate::error::GeneModelError;
use crate::export::ExportWriter;
use crate::session::{ExportSession, RegionMenu, SessionSummary};
use crate::store::ArtifactStore;
use crate::table::GeneModelTable;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone)]
pub struct PreparedExport {
    pub organism: OrganismId,
    pub biotype: Biotype,
    pub origin: CatalogOrigin,
    pub total_records: usize,
    pub table: GeneModelTable,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub organism: String,
    pub biotype: String,
    pub source: String,
    pub total_records: usize,
    pub filtered_records: usize,
    pub columns: Vec<String>,
    pub exports: Vec<crate::export::ExportedFile>,
    pub empty_regions: Vec<String>,
}

impl ExportResult {
    fn new(prepared: &PreparedExport, summary: SessionSummary) -> Self {
        Self {
            organism: prepared.organism.to_string(),
            biotype: prepared.biotype.to_string(),
            source: prepared.origin.as_str().to_string(),
            total_records: prepared.total_records,
            filtered_records: prepared.table.row_count(),
            columns: prepared.table.columns().to_vec(),
            exports: summary.exports,
            empty_regions: summary.empty_regions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub column_policy: ColumnPolicy,
    pub export_dir: camino::Utf8PathBuf,
    pub delimiter: u8,
}

pub struct App<C: EnsemblClient, S: ArtifactStore> {
    client: C,
    store: S,
}

impl<C: EnsemblClient, S: ArtifactStore> App<C, S> {
    pub fn new(client: C, store: S) -> Self {
        Self { client, store }
    }

    pub fn species(&self, sink: &dyn ProgressSink) -> Result<Vec<SpeciesInfo>, GeneModelError> {
        sink.event(ProgressEvent {
            message: "phase=Resolve; listing species".to_string(),
            elapsed: None,
        });
        Ok(sort_species(self.client.list_species()?))
    }

    pub fn assembly(
        &self,
        organism: &OrganismId,
        sink: &dyn ProgressSink,
    ) -> Result<AssemblyInfo, GeneModelError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; assembly of {organism}"),
            elapsed: None,
        });
        self.client.assembly(organism)
    }

    pub fn biotypes(
        &self,
        organism: &OrganismId,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<String>, GeneModelError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; gene biotypes of {organism}"),
            elapsed: None,
        });
        Ok(gene_biotypes(&self.client.biotypes(organism)?))
    }

    pub fn karyotype(
        &self,
        organism: &OrganismId,
        explicit: Option<Karyotype>,
        sink: &dyn ProgressSink,
    ) -> Result<Karyotype, GeneModelError> {
        match explicit {
            Some(karyotype) => Ok(karyotype),
            None => Karyotype::new(self.assembly(organism, sink)?.karyotype),
        }
    }

    pub fn prepare(
        &self,
        organism: &OrganismId,
        biotype: &Biotype,
        policy: ColumnPolicy,
        sink: &dyn ProgressSink,
    ) -> Result<PreparedExport, GeneModelError> {
        let start = Instant::now();
        sink.event(ProgressEvent {
            message: format!(
                "phase=Fetch; gene models for {organism} ({})",
                self.store.bulk_location(organism)
            ),
            elapsed: None,
        });
        let bulk = BulkCatalogCache::new(&self.client, &self.store).fetch(organism)?;
        let origin_message = match bulk.origin {
            CatalogOrigin::Cache => "loaded from the cached file",
            CatalogOrigin::Remote => "downloaded and cached",
        };
        sink.event(ProgressEvent {
            message: format!(
                "phase=Fetch; {} gene models in the unfiltered list, {origin_message}",
                bulk.len()
            ),
            elapsed: Some(start.elapsed()),
        });

        let filtered = CategoryFilter::new(&self.store).apply(&bulk, biotype)?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Filter; {} gene models of type {biotype}",
                filtered.len()
            ),
            elapsed: Some(start.elapsed()),
        });

        let table = GeneModelTable::build(&filtered, policy)?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Build; table with {} columns and {} rows",
                table.columns().len(),
                table.row_count()
            ),
            elapsed: Some(start.elapsed()),
        });

        Ok(PreparedExport {
            organism: organism.clone(),
            biotype: biotype.clone(),
            origin: bulk.origin,
            total_records: bulk.len(),
            table,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn export<R: BufRead, W: Write>(
        &self,
        organism: &OrganismId,
        biotype: &Biotype,
        karyotype: Karyotype,
        options: &ExportOptions,
        input: &mut R,
        output: &mut W,
        sink: &dyn ProgressSink,
    ) -> Result<ExportResult, GeneModelError> {
        let prepared = self.prepare(organism, biotype, options.column_policy, sink)?;
        let writer = ExportWriter::new(
            options.export_dir.clone(),
            organism.clone(),
            biotype.clone(),
            options.delimiter,
        );
        let session = ExportSession::new(&prepared.table, RegionMenu::new(karyotype), writer);
        let summary = session.run(input, output)?;
        Ok(ExportResult::new(&prepared, summary))
    }
}
