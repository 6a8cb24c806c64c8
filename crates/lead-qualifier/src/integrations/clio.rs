use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{build_client, classify_error, describe_failure, FailureKind, IntegrationError};
use crate::config::ClioConfig;
use crate::workflows::intake::{CaseError, CaseManagement, LeadRecord};

/// Opens a matter in Clio for an accepted lead, reusing an existing contact when the name
/// matches exactly.
pub struct ClioCaseManager {
    client: Client,
    config: ClioConfig,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct Created {
    id: u64,
}

#[derive(Deserialize)]
struct ContactSummary {
    id: u64,
    #[serde(default)]
    name: String,
}

impl ClioCaseManager {
    pub fn new(config: ClioConfig, timeout: Duration) -> Result<Self, IntegrationError> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn find_contact(&self, name: &str) -> Result<Option<u64>, CaseError> {
        let response = self
            .client
            .get(self.url("contacts.json"))
            .bearer_auth(&self.config.access_token)
            .query(&[("query", name), ("type", "Person"), ("fields", "id,name")])
            .send()
            .map_err(|error| case_error(classify_error(&error), error.to_string()))?;

        if !response.status().is_success() {
            let (kind, detail) = describe_failure(response);
            return Err(case_error(kind, detail));
        }

        let contacts: Envelope<Vec<ContactSummary>> = response
            .json()
            .map_err(|error| CaseError::Unavailable(format!("unreadable contact search: {error}")))?;

        Ok(contacts
            .data
            .into_iter()
            .find(|contact| contact.name.trim().eq_ignore_ascii_case(name.trim()))
            .map(|contact| contact.id))
    }

    fn create_contact(&self, record: &LeadRecord) -> Result<u64, CaseError> {
        let mut parts = record.name.split_whitespace();
        let first_name = parts.next().unwrap_or("Unknown");
        let last_name = parts.collect::<Vec<_>>().join(" ");

        let mut data = json!({
            "type": "Person",
            "first_name": first_name,
            "last_name": last_name,
        });
        if let Some(phone) = &record.phone {
            data["phone_numbers"] = json!([{ "name": "Mobile", "number": phone, "default_number": true }]);
        }
        if let Some(email) = &record.email {
            data["email_addresses"] = json!([{ "name": "Work", "address": email, "default_email": true }]);
        }

        self.post("contacts.json", data)
    }

    fn post(&self, endpoint: &str, data: Value) -> Result<u64, CaseError> {
        let response = self
            .client
            .post(self.url(endpoint))
            .bearer_auth(&self.config.access_token)
            .json(&json!({ "data": data }))
            .send()
            .map_err(|error| case_error(classify_error(&error), error.to_string()))?;

        if !response.status().is_success() {
            let (kind, detail) = describe_failure(response);
            return Err(case_error(kind, detail));
        }

        let created: Envelope<Created> = response
            .json()
            .map_err(|error| CaseError::Unavailable(format!("unreadable {endpoint} response: {error}")))?;
        Ok(created.data.id)
    }
}

impl CaseManagement for ClioCaseManager {
    fn create_case(&self, record: &LeadRecord) -> Result<String, CaseError> {
        let contact_id = match self.find_contact(&record.name)? {
            Some(id) => id,
            None => self.create_contact(record)?,
        };

        let location = record
            .accident_location
            .as_deref()
            .or(record.county.as_deref())
            .unwrap_or(record.jurisdiction.as_str());
        let mut data = json!({
            "description": format!("{} - {}", record.case_type, location),
            "client": { "id": contact_id },
            "status": "Open",
        });
        if let Some(attorney_id) = self.config.responsible_attorney_id {
            data["responsible_attorney"] = json!({ "id": attorney_id });
        }
        if let Some(group) = &self.config.matter_group_id {
            data["group"] = match group.parse::<u64>() {
                Ok(id) => json!({ "id": id }),
                Err(_) => json!({ "id": group }),
            };
        }

        let matter_id = self.post("matters.json", data)?;
        tracing::info!(lead_id = %record.id, contact_id, matter_id, "Clio matter created");
        Ok(matter_id.to_string())
    }
}

fn case_error(kind: FailureKind, detail: String) -> CaseError {
    match kind {
        FailureKind::Transient => CaseError::Unavailable(detail),
        FailureKind::Permanent => CaseError::Rejected(detail),
    }
}
