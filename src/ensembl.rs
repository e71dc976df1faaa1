use std::time::{Duration, Instant};

use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::OrganismId;
use crate::error::GeneModelError;

pub const DEFAULT_SERVER: &str = "https://rest.ensembl.org";
pub const DEFAULT_DIVISION: &str = "EnsemblPlants";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesInfo {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default)]
    pub assembly: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpeciesResponse {
    species: Vec<SpeciesInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyInfo {
    pub assembly_name: String,
    #[serde(default)]
    pub karyotype: Vec<String>,
    #[serde(default)]
    pub assembly_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiotypeInfo {
    pub biotype: String,
    #[serde(default)]
    pub objects: Vec<String>,
}

pub trait EnsemblClient: Send + Sync {
    fn list_species(&self) -> Result<Vec<SpeciesInfo>, GeneModelError>;
    fn assembly(&self, organism: &OrganismId) -> Result<AssemblyInfo, GeneModelError>;
    fn biotypes(&self, organism: &OrganismId) -> Result<Vec<BiotypeInfo>, GeneModelError>;
    /// Raw body of `/lookup/genome/<organism>`, returned unparsed so it can be cached verbatim.
    fn fetch_gene_models(&self, organism: &OrganismId) -> Result<Vec<u8>, GeneModelError>;
}

#[derive(Clone)]
pub struct EnsemblHttpClient {
    client: Client,
    server: String,
    division: String,
}

impl EnsemblHttpClient {
    pub fn new(
        server: &str,
        division: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, GeneModelError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gmexport/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GeneModelError::EnsemblHttp(err.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| GeneModelError::EnsemblHttp(err.to_string()))?;
        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
            division: division.to_string(),
        })
    }

    pub fn species_url(&self) -> String {
        format!("{}/info/species?division={}", self.server, self.division)
    }

    pub fn assembly_url(&self, organism: &OrganismId) -> String {
        format!("{}/info/assembly/{}", self.server, organism.as_str())
    }

    pub fn biotypes_url(&self, organism: &OrganismId) -> String {
        format!("{}/info/biotypes/{}", self.server, organism.as_str())
    }

    pub fn gene_models_url(&self, organism: &OrganismId) -> String {
        format!("{}/lookup/genome/{}", self.server, organism.as_str())
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, GeneModelError> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| GeneModelError::EnsemblHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let bytes = response
            .bytes()
            .map_err(|err| GeneModelError::EnsemblHttp(err.to_string()))?;
        debug!(
            url,
            bytes = bytes.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "ensembl.response"
        );
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(GeneModelError::EmptyResponse(url.to_string()));
        }
        Ok(bytes.to_vec())
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GeneModelError> {
        let bytes = self.get(url)?;
        serde_json::from_slice(&bytes).map_err(|err| GeneModelError::MalformedData {
            source_name: url.to_string(),
            message: err.to_string(),
        })
    }

    fn handle_status(response: Response) -> Result<Response, GeneModelError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Ensembl request failed".to_string());
        Err(GeneModelError::EnsemblStatus { status, message })
    }
}

impl EnsemblClient for EnsemblHttpClient {
    fn list_species(&self) -> Result<Vec<SpeciesInfo>, GeneModelError> {
        let response: SpeciesResponse = self.get_json(&self.species_url())?;
        Ok(response.species)
    }

    fn assembly(&self, organism: &OrganismId) -> Result<AssemblyInfo, GeneModelError> {
        self.get_json(&self.assembly_url(organism))
    }

    fn biotypes(&self, organism: &OrganismId) -> Result<Vec<BiotypeInfo>, GeneModelError> {
        self.get_json(&self.biotypes_url(organism))
    }

    fn fetch_gene_models(&self, organism: &OrganismId) -> Result<Vec<u8>, GeneModelError> {
        self.get(&self.gene_models_url(organism))
    }
}

pub fn gene_biotypes(infos: &[BiotypeInfo]) -> Vec<String> {
    let mut names: Vec<String> = infos
        .iter()
        .filter(|info| info.objects.iter().any(|object| object == "gene"))
        .map(|info| info.biotype.clone())
        .collect();
    names.sort_by_key(|name| name.to_lowercase());
    names.dedup();
    names
}

pub fn sort_species(mut species: Vec<SpeciesInfo>) -> Vec<SpeciesInfo> {
    species.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    species
}
