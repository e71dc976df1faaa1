use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GeneModelError {
    #[error("invalid organism identifier: {0}")]
    InvalidOrganism(String),

    #[error("invalid biotype: {0}")]
    InvalidCategory(String),

    #[error("invalid region name: {0}")]
    InvalidRegion(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("Ensembl request failed: {0}")]
    EnsemblHttp(String),

    #[error("Ensembl returned status {status}: {message}")]
    EnsemblStatus { status: u16, message: String },

    #[error("Ensembl returned an empty body for {0}")]
    EmptyResponse(String),

    #[error("malformed gene model data in {source_name}: {message}")]
    #[diagnostic(help("delete the cached file to force a fresh download"))]
    MalformedData {
        source_name: String,
        message: String,
    },

    #[error("no gene models of biotype {category} found for {organism}")]
    #[diagnostic(help("list the available gene biotypes with `gmexport biotypes <organism>`"))]
    EmptyFilterResult { organism: String, category: String },

    #[error("gene models have no seq_region_name column to query by")]
    MissingRegionColumn,

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("prompt failed: {0}")]
    Prompt(String),
}

impl GeneModelError {
    pub fn is_retrieval_failure(&self) -> bool {
        matches!(
            self,
            GeneModelError::EnsemblHttp(_)
                | GeneModelError::EnsemblStatus { .. }
                | GeneModelError::EmptyResponse(_)
        )
    }
}
