use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GeneModelError;

pub const BIOTYPE_FIELD: &str = "biotype";
pub const REGION_FIELD: &str = "seq_region_name";

pub const EXCLUDED_FIELDS: [&str; 3] = [BIOTYPE_FIELD, "coord_system", "seq_region_synonyms"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct GeneModelRecord {
    biotype: Option<String>,
    seq_region_name: Option<String>,
    fields: Map<String, Value>,
}

impl GeneModelRecord {
    pub fn biotype(&self) -> Option<&str> {
        self.biotype.as_deref()
    }

    pub fn seq_region_name(&self) -> Option<&str> {
        self.seq_region_name.as_deref()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(value_to_text)
    }
}

impl From<Map<String, Value>> for GeneModelRecord {
    fn from(fields: Map<String, Value>) -> Self {
        let biotype = fields.get(BIOTYPE_FIELD).and_then(value_to_text);
        let seq_region_name = fields.get(REGION_FIELD).and_then(value_to_text);
        Self {
            biotype,
            seq_region_name,
            fields,
        }
    }
}

impl From<GeneModelRecord> for Map<String, Value> {
    fn from(record: GeneModelRecord) -> Self {
        record.fields
    }
}

pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        nested => Some(nested.to_string()),
    }
}

pub fn parse_records(bytes: &[u8], source_name: &str) -> Result<Vec<GeneModelRecord>, GeneModelError> {
    serde_json::from_slice(bytes).map_err(|err| GeneModelError::MalformedData {
        source_name: source_name.to_string(),
        message: err.to_string(),
    })
}
