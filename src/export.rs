use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::info;

use crate::domain::{Biotype, OrganismId, RegionSelection, file_safe};
use crate::error::GeneModelError;
use crate::store::write_bytes_atomic;
use crate::table::Row;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    pub region: String,
    pub path: String,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct ExportWriter {
    export_dir: Utf8PathBuf,
    organism: OrganismId,
    biotype: Biotype,
    delimiter: u8,
}

impl ExportWriter {
    pub fn new(
        export_dir: Utf8PathBuf,
        organism: OrganismId,
        biotype: Biotype,
        delimiter: u8,
    ) -> Self {
        Self {
            export_dir,
            organism,
            biotype,
            delimiter,
        }
    }

    pub fn path_for(&self, selection: &RegionSelection) -> Utf8PathBuf {
        let region = file_safe(selection.label());
        let name = [
            self.organism.as_str(),
            self.biotype.as_str(),
            "chr",
            region.as_str(),
        ]
        .join("_");
        self.export_dir.join(format!("{name}.txt"))
    }

    pub fn write(
        &self,
        selection: &RegionSelection,
        columns: &[String],
        rows: &[&Row],
    ) -> Result<ExportedFile, GeneModelError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());
        writer
            .write_record(columns)
            .map_err(|err| GeneModelError::Filesystem(err.to_string()))?;
        for row in rows {
            writer
                .write_record(row.iter().map(|value| value.as_deref().unwrap_or("")))
                .map_err(|err| GeneModelError::Filesystem(err.to_string()))?;
        }
        let content = writer
            .into_inner()
            .map_err(|err| GeneModelError::Filesystem(err.to_string()))?;

        let path = self.path_for(selection);
        write_bytes_atomic(&path, &content)?;
        info!(region = %selection, rows = rows.len(), path = %path, "exported gene models");

        Ok(ExportedFile {
            region: selection.label().to_string(),
            path: path.to_string(),
            rows: rows.len(),
        })
    }
}
