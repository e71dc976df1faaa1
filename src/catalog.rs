use tracing::{debug, info};

use crate::domain::{Biotype, OrganismId};
use crate::ensembl::EnsemblClient;
use crate::error::GeneModelError;
use crate::record::{GeneModelRecord, parse_records};
use crate::store::ArtifactStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    Cache,
    Remote,
}

impl CatalogOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogOrigin::Cache => "cache",
            CatalogOrigin::Remote => "download",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BulkCatalog {
    pub organism: OrganismId,
    pub records: Vec<GeneModelRecord>,
    pub origin: CatalogOrigin,
}

impl BulkCatalog {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FilteredCatalog {
    pub organism: OrganismId,
    pub biotype: Biotype,
    pub records: Vec<GeneModelRecord>,
}

impl FilteredCatalog {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct BulkCatalogCache<'a, C: EnsemblClient, S: ArtifactStore> {
    client: &'a C,
    store: &'a S,
}

impl<'a, C: EnsemblClient, S: ArtifactStore> BulkCatalogCache<'a, C, S> {
    pub fn new(client: &'a C, store: &'a S) -> Self {
        Self { client, store }
    }

    pub fn fetch(&self, organism: &OrganismId) -> Result<BulkCatalog, GeneModelError> {
        let location = self.store.bulk_location(organism);
        if let Some(bytes) = self.store.load_bulk(organism)? {
            let records = parse_records(&bytes, &location)?;
            info!(organism = %organism, records = records.len(), "bulk catalog loaded from cache");
            return Ok(BulkCatalog {
                organism: organism.clone(),
                records,
                origin: CatalogOrigin::Cache,
            });
        }

        debug!(organism = %organism, "bulk catalog not cached; downloading");
        let bytes = self.client.fetch_gene_models(organism)?;
        let records = parse_records(&bytes, &format!("/lookup/genome/{organism}"))?;
        self.store.save_bulk(organism, &bytes)?;
        info!(
            organism = %organism,
            records = records.len(),
            path = %location,
            "bulk catalog downloaded"
        );
        Ok(BulkCatalog {
            organism: organism.clone(),
            records,
            origin: CatalogOrigin::Remote,
        })
    }
}

pub fn filter_by_biotype(bulk: &BulkCatalog, biotype: &Biotype) -> FilteredCatalog {
    let records = bulk
        .records
        .iter()
        .filter(|record| record.biotype() == Some(biotype.as_str()))
        .cloned()
        .collect();
    FilteredCatalog {
        organism: bulk.organism.clone(),
        biotype: biotype.clone(),
        records,
    }
}

pub struct CategoryFilter<'a, S: ArtifactStore> {
    store: &'a S,
}

impl<'a, S: ArtifactStore> CategoryFilter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn apply(
        &self,
        bulk: &BulkCatalog,
        biotype: &Biotype,
    ) -> Result<FilteredCatalog, GeneModelError> {
        let filtered = filter_by_biotype(bulk, biotype);
        self.store
            .save_filtered(&filtered.organism, biotype, &filtered.records)?;
        info!(
            organism = %filtered.organism,
            biotype = %biotype,
            kept = filtered.len(),
            total = bulk.len(),
            "filtered gene models"
        );
        Ok(filtered)
    }
}
