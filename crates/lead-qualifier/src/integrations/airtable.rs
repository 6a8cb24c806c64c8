use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::http::{build_client, classify_error, describe_failure, FailureKind, IntegrationError};
use crate::config::AirtableConfig;
use crate::workflows::import::parse_date;
use crate::workflows::intake::{
    LeadId, LeadRecord, LeadStatus, LeadStore, LeadUpdate, QualificationResult, StoreError,
};

mod field {
    pub const NAME: &str = "Lead Name";
    pub const EMAIL: &str = "Email Address";
    pub const PHONE: &str = "Phone Number";
    pub const ACCIDENT_DATE: &str = "Accident Date";
    pub const CAPTURE_DATE: &str = "Capture Date";
    pub const JURISDICTION: &str = "Jurisdiction";
    pub const COUNTY: &str = "County";
    pub const ACCIDENT_LOCATION: &str = "Accident Location";
    pub const CASE_TYPE: &str = "Case Type";
    pub const SUMMARY: &str = "Lead Information Summary";
    pub const STATUS: &str = "Processing Status";
    pub const LAST_ERROR: &str = "Last Error";
    pub const RESULT: &str = "Qualification Result";
    pub const TIER: &str = "Qualification Tier";
    pub const SCORE: &str = "Qualification Score";
    pub const NOTES: &str = "Qualification Notes";
    pub const CASE_ID: &str = "Case ID";
    pub const SIDE_EFFECTS: &str = "Side Effects Applied";
}

const PENDING_FORMULA: &str = "OR({Processing Status} = '', {Processing Status} = 'NEW', \
{Processing Status} = 'IN_PROGRESS', {Processing Status} = 'SCORED')";

/// Lead store backed by an Airtable table, oldest capture first.
pub struct AirtableLeadStore {
    client: Client,
    config: AirtableConfig,
    default_jurisdiction: String,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<AirtableRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Deserialize)]
struct AirtableRecord {
    id: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl AirtableLeadStore {
    pub fn new(
        config: AirtableConfig,
        default_jurisdiction: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IntegrationError> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
            default_jurisdiction: default_jurisdiction.into(),
        })
    }

    fn table_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.base_id,
            self.config.table_id
        )
    }

    fn record_url(&self, id: &LeadId) -> String {
        format!("{}/{}", self.table_url(), id.as_str())
    }

    fn to_lead(&self, record: AirtableRecord) -> Option<LeadRecord> {
        let fields = &record.fields;
        let status = match text(fields, field::STATUS) {
            None => LeadStatus::New,
            Some(label) => match LeadStatus::from_label(&label) {
                Some(status) => status,
                None => {
                    tracing::warn!(lead_id = %record.id, status = %label, "unknown processing status, skipping");
                    return None;
                }
            },
        };

        let qualification = text(fields, field::RESULT).and_then(|raw| {
            serde_json::from_str::<QualificationResult>(&raw)
                .map_err(|error| {
                    tracing::warn!(lead_id = %record.id, error = %error, "stored qualification result unreadable");
                })
                .ok()
        });

        Some(LeadRecord {
            id: LeadId(record.id.clone()),
            name: text(fields, field::NAME).unwrap_or_else(|| "Unknown".to_string()),
            email: text(fields, field::EMAIL),
            phone: text(fields, field::PHONE),
            injury_date: text(fields, field::ACCIDENT_DATE)
                .as_deref()
                .and_then(parse_date),
            jurisdiction: text(fields, field::JURISDICTION)
                .unwrap_or_else(|| self.default_jurisdiction.clone()),
            county: text(fields, field::COUNTY),
            accident_location: text(fields, field::ACCIDENT_LOCATION),
            case_type: text(fields, field::CASE_TYPE).unwrap_or_default(),
            description: text(fields, field::SUMMARY).unwrap_or_default(),
            status,
            last_error: text(fields, field::LAST_ERROR),
            qualification,
        })
    }
}

impl LeadStore for AirtableLeadStore {
    fn fetch_pending(&self) -> Result<Vec<LeadRecord>, StoreError> {
        let mut leads = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query = vec![
                ("filterByFormula", PENDING_FORMULA.to_string()),
                ("sort[0][field]", field::CAPTURE_DATE.to_string()),
                ("sort[0][direction]", "asc".to_string()),
            ];
            if let Some(offset) = offset.take() {
                query.push(("offset", offset));
            }

            let response = self
                .client
                .get(self.table_url())
                .bearer_auth(&self.config.api_key)
                .query(&query)
                .send()
                .map_err(|error| store_error(classify_error(&error), error.to_string()))?;

            if !response.status().is_success() {
                let (kind, detail) = describe_failure(response);
                return Err(store_error(kind, detail));
            }

            let page: ListResponse = response
                .json()
                .map_err(|error| StoreError::Unavailable(format!("unreadable listing: {error}")))?;

            leads.extend(page.records.into_iter().filter_map(|record| self.to_lead(record)));

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        tracing::debug!(count = leads.len(), "fetched pending leads from Airtable");
        Ok(leads)
    }

    fn update(&self, id: &LeadId, update: LeadUpdate) -> Result<(), StoreError> {
        let payload = json!({
            "fields": update_fields(&update),
            "typecast": true,
        });

        let response = self
            .client
            .patch(self.record_url(id))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .map_err(|error| store_error(classify_error(&error), error.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            _ => {
                let (kind, detail) = describe_failure(response);
                Err(store_error(kind, detail))
            }
        }
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<LeadRecord>, StoreError> {
        let response = self
            .client
            .get(self.record_url(id))
            .bearer_auth(&self.config.api_key)
            .send()
            .map_err(|error| store_error(classify_error(&error), error.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let record: AirtableRecord = response
                    .json()
                    .map_err(|error| StoreError::Unavailable(format!("unreadable record: {error}")))?;
                Ok(self.to_lead(record))
            }
            _ => {
                let (kind, detail) = describe_failure(response);
                Err(store_error(kind, detail))
            }
        }
    }
}

/// Only fields present in the update are written.
fn update_fields(update: &LeadUpdate) -> Map<String, Value> {
    let mut map = Map::new();
    if let Some(status) = update.status {
        map.insert(field::STATUS.to_string(), json!(status.label()));
    }
    if let Some(last_error) = &update.last_error {
        map.insert(field::LAST_ERROR.to_string(), json!(last_error));
    }
    if let Some(result) = &update.qualification {
        let encoded = serde_json::to_string(result).unwrap_or_default();
        map.insert(field::RESULT.to_string(), json!(encoded));
        map.insert(field::TIER.to_string(), json!(result.tier.label()));
        map.insert(field::SCORE.to_string(), json!(result.score));
        map.insert(field::NOTES.to_string(), json!(result.reason));
        map.insert(field::CASE_ID.to_string(), json!(result.case_id));
        map.insert(field::SIDE_EFFECTS.to_string(), json!(result.side_effects_applied));
    }
    map
}

fn text(fields: &Map<String, Value>, name: &str) -> Option<String> {
    let value = match fields.get(name)? {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

fn store_error(kind: FailureKind, detail: String) -> StoreError {
    match kind {
        FailureKind::Transient => StoreError::Unavailable(detail),
        FailureKind::Permanent => StoreError::Rejected(detail),
    }
}
