use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::GeneModelError;

pub const CATCH_ALL_LABEL: &str = "other_scaffolds";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganismId(String);

impl OrganismId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn organism_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap())
}

impl FromStr for OrganismId {
    type Err = GeneModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        if !organism_regex().is_match(&normalized) {
            return Err(GeneModelError::InvalidOrganism(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Biotype(String);

impl Biotype {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Biotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Biotype {
    type Err = GeneModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && !trimmed
                .chars()
                .any(|ch| ch.is_whitespace() || matches!(ch, '/' | '\\'));
        if !is_valid {
            return Err(GeneModelError::InvalidCategory(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Karyotype {
    regions: Vec<String>,
}

impl Karyotype {
    pub fn new<I, S>(regions: I) -> Result<Self, GeneModelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut file_labels =
            HashMap::from([(CATCH_ALL_LABEL.to_string(), CATCH_ALL_LABEL.to_string())]);
        let mut ordered = Vec::new();
        for region in regions {
            let region = region.into().trim().to_string();
            if region.is_empty() || region == CATCH_ALL_LABEL {
                return Err(GeneModelError::InvalidRegion(region));
            }
            if !seen.insert(region.clone()) {
                continue;
            }
            // Each region owns its export file.
            if let Some(other) = file_labels.insert(file_safe(&region), region.clone()) {
                return Err(GeneModelError::InvalidRegion(format!(
                    "{region} (same export file as {other})"
                )));
            }
            ordered.push(region);
        }
        Ok(Self { regions: ordered })
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn region_set(&self) -> HashSet<&str> {
        self.regions.iter().map(String::as_str).collect()
    }
}

impl FromStr for Karyotype {
    type Err = GeneModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value.split(',').map(str::trim).filter(|part| !part.is_empty()))
    }
}

pub fn file_safe(label: &str) -> String {
    label
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegionSelection {
    Named(String),
    CatchAll,
}

impl RegionSelection {
    pub fn label(&self) -> &str {
        match self {
            RegionSelection::Named(name) => name,
            RegionSelection::CatchAll => CATCH_ALL_LABEL,
        }
    }
}

impl fmt::Display for RegionSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnPolicy {
    /// Columns are the keys of the first record; fields only later records carry are dropped.
    #[default]
    FirstRecord,
    Union,
}

impl fmt::Display for ColumnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnPolicy::FirstRecord => write!(f, "first-record"),
            ColumnPolicy::Union => write!(f, "union"),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_organism_normalizes_case() {
        let id: OrganismId = " Triticum_Aestivum ".parse().unwrap();
        assert_eq!(id.as_str(), "triticum_aestivum");
    }

    #[test]
    fn parse_organism_rejects_paths() {
        let err = "../etc".parse::<OrganismId>().unwrap_err();
        assert_matches!(err, GeneModelError::InvalidOrganism(_));
    }

    #[test]
    fn biotype_is_case_sensitive() {
        let biotype: Biotype = "protein_coding".parse().unwrap();
        assert_ne!(biotype, "Protein_coding".parse::<Biotype>().unwrap());
    }

    #[test]
    fn karyotype_dedups_and_keeps_order() {
        let karyotype: Karyotype = "1A, 1B,1A,2A".parse().unwrap();
        assert_eq!(karyotype.regions(), ["1A", "1B", "2A"]);
    }

    #[test]
    fn karyotype_rejects_catch_all_label() {
        let err = Karyotype::new(["1A", CATCH_ALL_LABEL]).unwrap_err();
        assert_matches!(err, GeneModelError::InvalidRegion(_));
    }

    #[test]
    fn karyotype_rejects_regions_sharing_a_file_name() {
        let err = Karyotype::new(["A/1", "A_1"]).unwrap_err();
        assert_matches!(err, GeneModelError::InvalidRegion(message) if message.contains("A/1"));

        let err = Karyotype::new(["other:scaffolds"]).unwrap_err();
        assert_matches!(err, GeneModelError::InvalidRegion(_));

        let karyotype = Karyotype::new(["A/1", "A:2", "A/1"]).unwrap();
        assert_eq!(karyotype.regions(), ["A/1", "A:2"]);
    }
}
