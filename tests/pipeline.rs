use std::io::Cursor;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use gene_model_export::app::{App, ExportOptions, ProgressEvent, ProgressSink};
use gene_model_export::catalog::{BulkCatalogCache, CatalogOrigin};
use gene_model_export::domain::{Biotype, ColumnPolicy, Karyotype, OrganismId};
use gene_model_export::ensembl::{AssemblyInfo, BiotypeInfo, EnsemblClient, SpeciesInfo};
use gene_model_export::error::GeneModelError;
use gene_model_export::store::{ArtifactStore, FsArtifactStore};

const WHEAT_GENES: &str = r#"[
    {"id": "TraesCS1A02G000100", "biotype": "protein_coding", "seq_region_name": "1A", "start": 40098, "end": 70338, "strand": 1, "coord_system": {"name": "chromosome", "version": "IWGSC"}, "description": null},
    {"id": "TraesCS1A02G000200", "biotype": "tRNA", "seq_region_name": "1A", "start": 80000, "end": 80072, "strand": -1, "coord_system": {"name": "chromosome"}, "description": "tRNA-Leu"},
    {"id": "TraesCS1A02G000300", "biotype": "protein_coding", "seq_region_name": "1A", "start": 90000, "end": 95000, "strand": 1, "coord_system": {"name": "chromosome"}, "description": "kinase"},
    {"id": "TraesCS3D02G999900", "biotype": "protein_coding", "seq_region_name": "3D", "start": 100, "end": 900, "strand": -1, "coord_system": {"name": "chromosome"}, "description": null},
    {"id": "TraesCSU02G000100", "biotype": "ncRNA", "seq_region_name": "Un", "start": 5, "end": 60, "strand": 1, "coord_system": {"name": "scaffold"}}
]"#;

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Default)]
struct MockEnsembl {
    payload: Option<&'static str>,
    calls: Mutex<usize>,
}

impl MockEnsembl {
    fn serving(payload: &'static str) -> Self {
        Self {
            payload: Some(payload),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl EnsemblClient for MockEnsembl {
    fn list_species(&self) -> Result<Vec<SpeciesInfo>, GeneModelError> {
        Ok(Vec::new())
    }

    fn assembly(&self, _organism: &OrganismId) -> Result<AssemblyInfo, GeneModelError> {
        Ok(AssemblyInfo {
            assembly_name: "IWGSC".to_string(),
            karyotype: vec!["1A".to_string(), "1B".to_string(), "2A".to_string()],
            assembly_date: None,
        })
    }

    fn biotypes(&self, _organism: &OrganismId) -> Result<Vec<BiotypeInfo>, GeneModelError> {
        Ok(Vec::new())
    }

    fn fetch_gene_models(&self, organism: &OrganismId) -> Result<Vec<u8>, GeneModelError> {
        *self.calls.lock().unwrap() += 1;
        match self.payload {
            Some(payload) => Ok(payload.as_bytes().to_vec()),
            None => Err(GeneModelError::EnsemblStatus {
                status: 503,
                message: format!("lookup/genome/{organism} unavailable"),
            }),
        }
    }
}

struct Workspace {
    _temp: tempfile::TempDir,
    cache: Utf8PathBuf,
    exports: Utf8PathBuf,
}

fn workspace() -> Workspace {
    let temp = tempfile::tempdir().unwrap();
    let cache = Utf8PathBuf::from_path_buf(temp.path().join("cache")).unwrap();
    let exports = Utf8PathBuf::from_path_buf(temp.path().join("exports")).unwrap();
    Workspace {
        _temp: temp,
        cache,
        exports,
    }
}

fn wheat() -> OrganismId {
    "triticum_aestivum".parse().unwrap()
}

fn protein_coding() -> Biotype {
    "protein_coding".parse().unwrap()
}

fn options(ws: &Workspace) -> ExportOptions {
    ExportOptions {
        column_policy: ColumnPolicy::FirstRecord,
        export_dir: ws.exports.clone(),
        delimiter: b',',
    }
}

#[test]
fn bulk_fetch_is_cached_after_first_download() {
    let ws = workspace();
    let client = MockEnsembl::serving(WHEAT_GENES);
    let store = FsArtifactStore::new(ws.cache.clone());
    let cache = BulkCatalogCache::new(&client, &store);

    let first = cache.fetch(&wheat()).unwrap();
    let second = cache.fetch(&wheat()).unwrap();

    assert_eq!(client.calls(), 1);
    assert_eq!(first.origin, CatalogOrigin::Remote);
    assert_eq!(second.origin, CatalogOrigin::Cache);
    assert_eq!(first.records, second.records);
    assert_eq!(
        std::fs::read_to_string(store.bulk_path(&wheat())).unwrap(),
        WHEAT_GENES
    );
}

#[test]
fn retrieval_failure_leaves_no_artifact() {
    let ws = workspace();
    let client = MockEnsembl::default();
    let store = FsArtifactStore::new(ws.cache.clone());

    let err = BulkCatalogCache::new(&client, &store)
        .fetch(&wheat())
        .unwrap_err();

    assert!(err.is_retrieval_failure());
    assert!(store.load_bulk(&wheat()).unwrap().is_none());
}

#[test]
fn malformed_download_is_not_cached() {
    let ws = workspace();
    let client = MockEnsembl::serving(r#"{"error": "species not found"}"#);
    let store = FsArtifactStore::new(ws.cache.clone());

    let err = BulkCatalogCache::new(&client, &store)
        .fetch(&wheat())
        .unwrap_err();

    assert_matches!(err, GeneModelError::MalformedData { .. });
    assert!(store.load_bulk(&wheat()).unwrap().is_none());
}

#[test]
fn malformed_cache_is_fatal_without_refetch() {
    let ws = workspace();
    let client = MockEnsembl::serving(WHEAT_GENES);
    let store = FsArtifactStore::new(ws.cache.clone());
    store.save_bulk(&wheat(), b"[{\"id\": ").unwrap();

    let err = BulkCatalogCache::new(&client, &store)
        .fetch(&wheat())
        .unwrap_err();

    assert_matches!(err, GeneModelError::MalformedData { .. });
    assert_eq!(client.calls(), 0);
}

#[test]
fn wheat_scenario_exports_per_region() {
    let ws = workspace();
    let app = App::new(
        MockEnsembl::serving(WHEAT_GENES),
        FsArtifactStore::new(ws.cache.clone()),
    );
    let karyotype: Karyotype = "1A,1B,2A".parse().unwrap();
    let mut input = Cursor::new("1\n2\n4\nq\n");
    let mut output = Vec::new();

    let result = app
        .export(
            &wheat(),
            &protein_coding(),
            karyotype,
            &options(&ws),
            &mut input,
            &mut output,
            &NoopSink,
        )
        .unwrap();

    assert_eq!(result.total_records, 5);
    assert_eq!(result.filtered_records, 3);
    assert_eq!(
        result.columns,
        ["id", "seq_region_name", "start", "end", "strand", "description"]
    );
    assert_eq!(result.empty_regions, ["1B"]);
    assert_eq!(result.exports.len(), 2);

    let chr1a = ws
        .exports
        .join("triticum_aestivum_protein_coding_chr_1A.txt");
    let content = std::fs::read_to_string(&chr1a).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "id,seq_region_name,start,end,strand,description");
    assert_eq!(lines[1], "TraesCS1A02G000100,1A,40098,70338,1,");
    assert_eq!(lines[2], "TraesCS1A02G000300,1A,90000,95000,1,kinase");

    assert!(
        !ws.exports
            .join("triticum_aestivum_protein_coding_chr_1B.txt")
            .exists()
    );

    let other = std::fs::read_to_string(
        ws.exports
            .join("triticum_aestivum_protein_coding_chr_other_scaffolds.txt"),
    )
    .unwrap();
    assert_eq!(other.lines().count(), 2);
    assert!(other.contains("TraesCS3D02G999900,3D"));

    let console = String::from_utf8(output).unwrap();
    assert!(console.contains("No genes of this type found in this region."));
}

#[test]
fn rerun_uses_cache_and_rewrites_identical_filtered_file() {
    let ws = workspace();
    let store = FsArtifactStore::new(ws.cache.clone());
    let filtered_path = store.filtered_path(&wheat(), &protein_coding());
    let app = App::new(MockEnsembl::serving(WHEAT_GENES), store);

    let first = app
        .prepare(&wheat(), &protein_coding(), ColumnPolicy::FirstRecord, &NoopSink)
        .unwrap();
    let first_filtered = std::fs::read(&filtered_path).unwrap();

    let second = app
        .prepare(&wheat(), &protein_coding(), ColumnPolicy::FirstRecord, &NoopSink)
        .unwrap();
    let second_filtered = std::fs::read(&filtered_path).unwrap();

    assert_eq!(first.origin, CatalogOrigin::Remote);
    assert_eq!(second.origin, CatalogOrigin::Cache);
    assert_eq!(first_filtered, second_filtered);
    assert_eq!(first.table.rows(), second.table.rows());

    let filtered: Vec<serde_json::Value> = serde_json::from_slice(&second_filtered).unwrap();
    assert_eq!(filtered.len(), 3);
}

#[test]
fn second_run_performs_no_remote_fetch() {
    let ws = workspace();
    let seeded = FsArtifactStore::new(ws.cache.clone());
    seeded.save_bulk(&wheat(), WHEAT_GENES.as_bytes()).unwrap();

    let client = MockEnsembl::default();
    let store = FsArtifactStore::new(ws.cache.clone());
    let bulk = BulkCatalogCache::new(&client, &store).fetch(&wheat()).unwrap();

    assert_eq!(bulk.len(), 5);
    assert_eq!(client.calls(), 0);
}

#[test]
fn unknown_biotype_stops_before_session() {
    let ws = workspace();
    let app = App::new(
        MockEnsembl::serving(WHEAT_GENES),
        FsArtifactStore::new(ws.cache.clone()),
    );
    let biotype: Biotype = "pseudogene".parse().unwrap();
    let mut input = Cursor::new("1\nq\n");
    let mut output = Vec::new();

    let err = app
        .export(
            &wheat(),
            &biotype,
            Karyotype::default(),
            &options(&ws),
            &mut input,
            &mut output,
            &NoopSink,
        )
        .unwrap_err();

    assert_matches!(err, GeneModelError::EmptyFilterResult { .. });
    assert!(output.is_empty());
    assert!(!ws.exports.exists());
}

#[test]
fn karyotype_falls_back_to_assembly() {
    let ws = workspace();
    let app = App::new(
        MockEnsembl::serving(WHEAT_GENES),
        FsArtifactStore::new(ws.cache.clone()),
    );

    let karyotype = app.karyotype(&wheat(), None, &NoopSink).unwrap();
    assert_eq!(karyotype.regions(), ["1A", "1B", "2A"]);

    let explicit: Karyotype = "7D".parse().unwrap();
    let karyotype = app
        .karyotype(&wheat(), Some(explicit.clone()), &NoopSink)
        .unwrap();
    assert_eq!(karyotype, explicit);
}
