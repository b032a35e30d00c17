use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::DrugLookup;
use crate::config::DrugLookupConfig;
use crate::error::{AppError, Result};
use crate::models::Record;

pub const NOT_FOUND: &str = "Drug not found in FDA database";
const UNKNOWN: &str = "Unknown";
const NO_WARNINGS: &str = "No specific warnings found.";

#[derive(Debug, Deserialize)]
struct LabelResponse {
    #[serde(default)]
    results: Vec<DrugLabel>,
}

#[derive(Debug, Default, Deserialize)]
struct DrugLabel {
    #[serde(default)]
    openfda: OpenFdaSection,
    #[serde(default)]
    purpose: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    dosage_and_administration: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenFdaSection {
    #[serde(default)]
    generic_name: Vec<String>,
}

/// Client for the openFDA drug label endpoint.
#[derive(Clone, Debug)]
pub struct OpenFdaClient {
    client: Client,
    base_url: Url,
    field_limit: usize,
}

impl OpenFdaClient {
    pub fn new(config: &DrugLookupConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            field_limit: config.field_limit,
        })
    }

    /// `Ok(None)` when the label search has no match.
    async fn fetch_label(&self, drug_name: &str) -> Result<Option<DrugLabel>> {
        let search = format!("openfda.brand_name:\"{drug_name}\"");
        let response = self
            .client
            .get(self.base_url.clone())
            .query(&[("search", search.as_str()), ("limit", "1")])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            tracing::debug!(drug_name, status = %response.status(), "No drug label");
            return Ok(None);
        }

        let body: LabelResponse = response.json().await?;
        Ok(body.results.into_iter().next())
    }

    fn summarize(&self, label: DrugLabel) -> Record {
        let mut record = Record::new();
        record.insert(
            "generic_name".to_string(),
            json!(first_or(label.openfda.generic_name, UNKNOWN)),
        );
        record.insert("purpose".to_string(), json!(first_or(label.purpose, UNKNOWN)));
        record.insert(
            "warnings".to_string(),
            json!(truncate_chars(&first_or(label.warnings, NO_WARNINGS), self.field_limit)),
        );
        record.insert(
            "dosage_instructions".to_string(),
            json!(truncate_chars(
                &first_or(label.dosage_and_administration, UNKNOWN),
                self.field_limit
            )),
        );
        record
    }
}

#[async_trait]
impl DrugLookup for OpenFdaClient {
    async fn lookup(&self, drug_name: &str) -> Record {
        match self.fetch_label(drug_name).await {
            Ok(Some(label)) => self.summarize(label),
            Ok(None) => error_record(NOT_FOUND.to_string()),
            Err(e) => {
                tracing::warn!(drug_name, error = %e, "Drug lookup failed");
                error_record(format!("FDA API Connection Failed: {e}"))
            }
        }
    }
}

fn error_record(reason: String) -> Record {
    let mut record = Record::new();
    record.insert("error".to_string(), json!(reason));
    record
}

fn first_or(values: Vec<String>, default: &str) -> String {
    values
        .into_iter()
        .next()
        .unwrap_or_else(|| default.to_string())
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
