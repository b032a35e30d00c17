//! Advisory validation of extracted records.
//!
//! A record that fits its schema comes back coerced and restricted to the
//! schema's fields. A record that does not fit comes back exactly as it went
//! in; partial extractions are still worth showing to the user.
//!
//! [`conforms`] only answers whether a record fits, leaving it untouched.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSchema {
    Medicine,
    Report,
}

/// A string field that also accepts numbers and booleans, rendered as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
struct Text(String);

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Scalar {
            Str(String),
            Num(serde_json::Number),
            Bool(bool),
        }

        Ok(Text(match Scalar::deserialize(deserializer)? {
            Scalar::Str(s) => s,
            Scalar::Num(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MedicineFields {
    drug_name: Text,
    strength: Text,
    indications: Text,
    prescription_drug: Text,
}

#[derive(Debug, Serialize, Deserialize)]
struct Abnormality {
    test: Text,
    value: Text,
    status: Text,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReportFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    patient_name: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    report_date: Option<Text>,
    patient_summary: Text,
    abnormalities: Vec<Abnormality>,
    recommendations: Vec<Text>,
}

/// Validate `record` against `schema`, or hand it back untouched.
pub fn normalize(record: Record, schema: RecordSchema) -> Record {
    let validated = match schema {
        RecordSchema::Medicine => coerce::<MedicineFields>(&record),
        RecordSchema::Report => coerce::<ReportFields>(&record),
    };

    match validated {
        Ok(normalized) => normalized,
        Err(e) => {
            tracing::debug!(schema = ?schema, error = %e, "Record kept as extracted");
            record
        }
    }
}

/// Whether `record` fits `schema`. Never alters the record.
pub fn conforms(record: &Record, schema: RecordSchema) -> bool {
    let validated = match schema {
        RecordSchema::Medicine => coerce::<MedicineFields>(record),
        RecordSchema::Report => coerce::<ReportFields>(record),
    };
    validated.is_ok()
}

fn coerce<T>(record: &Record) -> serde_json::Result<Record>
where
    T: DeserializeOwned + Serialize,
{
    let typed: T = serde_json::from_value(Value::Object(record.clone()))?;
    match serde_json::to_value(typed)? {
        Value::Object(map) => Ok(map),
        // structs always serialize to objects
        _ => Ok(record.clone()),
    }
}
