use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;
use tracing::debug;

use crate::domain::{Biotype, OrganismId};
use crate::error::GeneModelError;
use crate::record::GeneModelRecord;

pub trait ArtifactStore {
    fn load_bulk(&self, organism: &OrganismId) -> Result<Option<Vec<u8>>, GeneModelError>;
    fn save_bulk(&self, organism: &OrganismId, payload: &[u8]) -> Result<(), GeneModelError>;
    fn save_filtered(
        &self,
        organism: &OrganismId,
        biotype: &Biotype,
        records: &[GeneModelRecord],
    ) -> Result<(), GeneModelError>;
    fn bulk_location(&self, organism: &OrganismId) -> String;
}

#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    cache_root: Utf8PathBuf,
}

impl FsArtifactStore {
    pub fn new(cache_root: Utf8PathBuf) -> Self {
        Self { cache_root }
    }

    pub fn bulk_path(&self, organism: &OrganismId) -> Utf8PathBuf {
        self.cache_root.join(format!("{organism}_ALL.json"))
    }

    pub fn filtered_path(&self, organism: &OrganismId, biotype: &Biotype) -> Utf8PathBuf {
        self.cache_root.join(format!("{organism}_{biotype}.json"))
    }

    pub fn ensure_cache_root(&self) -> Result<(), GeneModelError> {
        fs::create_dir_all(self.cache_root.as_std_path())
            .map_err(|err| GeneModelError::Filesystem(err.to_string()))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn load_bulk(&self, organism: &OrganismId) -> Result<Option<Vec<u8>>, GeneModelError> {
        let path = self.bulk_path(organism);
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let bytes = fs::read(path.as_std_path())
            .map_err(|err| GeneModelError::Filesystem(format!("read {path}: {err}")))?;
        debug!(path = %path, bytes = bytes.len(), "loaded bulk artifact");
        Ok(Some(bytes))
    }

    fn save_bulk(&self, organism: &OrganismId, payload: &[u8]) -> Result<(), GeneModelError> {
        let path = self.bulk_path(organism);
        write_bytes_atomic(&path, payload)?;
        debug!(path = %path, bytes = payload.len(), "wrote bulk artifact");
        Ok(())
    }

    fn save_filtered(
        &self,
        organism: &OrganismId,
        biotype: &Biotype,
        records: &[GeneModelRecord],
    ) -> Result<(), GeneModelError> {
        let path = self.filtered_path(organism, biotype);
        let content = serde_json::to_vec(records)
            .map_err(|err| GeneModelError::Filesystem(err.to_string()))?;
        write_bytes_atomic(&path, &content)?;
        debug!(path = %path, records = records.len(), "wrote filtered artifact");
        Ok(())
    }

    fn bulk_location(&self, organism: &OrganismId) -> String {
        self.bulk_path(organism).to_string()
    }
}

/// Writes through a temp file in the destination directory so readers never see a partial file.
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), GeneModelError> {
    let parent = path
        .parent()
        .ok_or_else(|| GeneModelError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| GeneModelError::Filesystem(err.to_string()))?;
    let temp = Builder::new()
        .prefix("gmexport-file")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| GeneModelError::Filesystem(err.to_string()))?;
    fs::write(temp.path(), content).map_err(|err| GeneModelError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| GeneModelError::Filesystem(err.to_string()))?;
    Ok(())
}
